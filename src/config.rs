//! Writer inputs: observation arrays, QC arrays and write configuration
//!
//! Global attribute overrides can be supplied in code or loaded from a JSON
//! object file (`{"title": "...", "id": "ru29-20130801"}`) and `key=value`
//! command-line pairs.

use crate::attributes::{AttrValue, AttributeMap};
use crate::errors::{GliderError, Result};
use chrono::{DateTime, Utc};
use ndarray::ArrayD;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Default deflate level for dimensioned variables. Level 1 gives most of the
/// size reduction at the lowest cost.
pub const DEFAULT_DEFLATE_LEVEL: i32 = 1;

/// Borrowed view of one input array, tagged by element type.
#[derive(Debug, Clone, Copy)]
pub enum Column<'a> {
    F64(&'a ArrayD<f64>),
    I16(&'a ArrayD<i16>),
    I8(&'a ArrayD<i8>),
}

impl<'a> Column<'a> {
    pub fn shape(&self) -> &'a [usize] {
        match *self {
            Column::F64(a) => a.shape(),
            Column::I16(a) => a.shape(),
            Column::I8(a) => a.shape(),
        }
    }
}

/// Every data array the format requires.
///
/// Time-class arrays (`segment_id` .. `temperature`) share the length of
/// `time`; time_uv-class arrays (`lat_uv`, `lon_uv`, `u`, `v`) share the length
/// of `time_uv`. With more than one trajectory, arrays are (records, trajectories).
#[derive(Debug, Clone)]
pub struct Observations {
    pub time: Vec<DateTime<Utc>>,
    pub time_uv: Vec<DateTime<Utc>>,
    pub trajectory: Vec<i16>,
    pub segment_id: ArrayD<i16>,
    pub profile_id: ArrayD<i16>,
    pub depth: ArrayD<f64>,
    pub lat: ArrayD<f64>,
    pub lon: ArrayD<f64>,
    pub pressure: ArrayD<f64>,
    pub conductivity: ArrayD<f64>,
    pub density: ArrayD<f64>,
    pub salinity: ArrayD<f64>,
    pub temperature: ArrayD<f64>,
    pub lat_uv: ArrayD<f64>,
    pub lon_uv: ArrayD<f64>,
    pub u: ArrayD<f64>,
    pub v: ArrayD<f64>,
}

impl Observations {
    /// Input array backing a schema variable. `time`, `time_uv` and
    /// `trajectory` are not arrays of this kind and return `None`.
    pub fn column(&self, name: &str) -> Option<Column<'_>> {
        let column = match name {
            "segment_id" => Column::I16(&self.segment_id),
            "profile_id" => Column::I16(&self.profile_id),
            "depth" => Column::F64(&self.depth),
            "lat" => Column::F64(&self.lat),
            "lon" => Column::F64(&self.lon),
            "pressure" => Column::F64(&self.pressure),
            "conductivity" => Column::F64(&self.conductivity),
            "density" => Column::F64(&self.density),
            "salinity" => Column::F64(&self.salinity),
            "temperature" => Column::F64(&self.temperature),
            "lat_uv" => Column::F64(&self.lat_uv),
            "lon_uv" => Column::F64(&self.lon_uv),
            "u" => Column::F64(&self.u),
            "v" => Column::F64(&self.v),
            _ => return None,
        };
        Some(column)
    }
}

/// Optional QC flag arrays. A `None` field is written as all-fill.
#[derive(Debug, Clone, Default)]
pub struct QcArrays {
    pub time_qc: Option<ArrayD<i8>>,
    pub depth_qc: Option<ArrayD<i8>>,
    pub lat_qc: Option<ArrayD<i8>>,
    pub lon_qc: Option<ArrayD<i8>>,
    pub pressure_qc: Option<ArrayD<i8>>,
    pub conductivity_qc: Option<ArrayD<i8>>,
    pub density_qc: Option<ArrayD<i8>>,
    pub salinity_qc: Option<ArrayD<i8>>,
    pub temperature_qc: Option<ArrayD<i8>>,
    pub u_qc: Option<ArrayD<i8>>,
    pub v_qc: Option<ArrayD<i8>>,
}

impl QcArrays {
    /// Supplied QC array for a QC variable name.
    pub fn get(&self, name: &str) -> Option<&ArrayD<i8>> {
        let slot = match name {
            "time_qc" => &self.time_qc,
            "depth_qc" => &self.depth_qc,
            "lat_qc" => &self.lat_qc,
            "lon_qc" => &self.lon_qc,
            "pressure_qc" => &self.pressure_qc,
            "conductivity_qc" => &self.conductivity_qc,
            "density_qc" => &self.density_qc,
            "salinity_qc" => &self.salinity_qc,
            "temperature_qc" => &self.temperature_qc,
            "u_qc" => &self.u_qc,
            "v_qc" => &self.v_qc,
            _ => return None,
        };
        slot.as_ref()
    }
}

/// Everything about a write that is not observation data.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// Global attributes that replace defaults with the same key.
    pub global_overrides: AttributeMap,
    /// Attributes merged over the `platform` variable defaults.
    pub platform_overrides: AttributeMap,
    /// Attributes merged over the `instrument_ctd` variable defaults.
    pub instrument_overrides: AttributeMap,
    pub qc: QcArrays,
    pub deflate_level: i32,
    /// Timestamp used for `date_created`/`date_issued`/`date_modified` and
    /// `history`. `None` means the time of the write.
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            global_overrides: AttributeMap::new(),
            platform_overrides: AttributeMap::new(),
            instrument_overrides: AttributeMap::new(),
            qc: QcArrays::default(),
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            created_at: None,
        }
    }
}

impl WriteConfig {
    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.global_overrides.insert(key, value);
        self
    }

    pub fn with_qc(mut self, qc: QcArrays) -> Self {
        self.qc = qc;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_deflate_level(mut self, level: i32) -> Result<Self> {
        if !(0..=9).contains(&level) {
            return Err(GliderError::InvalidConfig(format!(
                "deflate level must be within 0..=9, got {}",
                level
            )));
        }
        self.deflate_level = level;
        Ok(self)
    }
}

/// Load global attribute overrides from a JSON object file.
pub fn load_attribute_overrides(path: &Path) -> Result<AttributeMap> {
    let text = fs::read_to_string(path)?;
    let value: JsonValue = serde_json::from_str(&text)?;
    let object = value.as_object().ok_or_else(|| {
        GliderError::InvalidConfig(format!(
            "{} must contain a JSON object of attributes",
            path.display()
        ))
    })?;

    let mut overrides = AttributeMap::new();
    for (key, value) in object {
        overrides.insert(key.as_str(), AttrValue::from_json(key, value)?);
    }
    Ok(overrides)
}

/// Parse a `key=value` override. Values are kept as text.
pub fn parse_attribute_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err("Invalid format: Expected '<attribute>=<value>'.".to_string()),
    }
}
