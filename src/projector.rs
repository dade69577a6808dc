//! Display-oriented line geometry from stored coordinate series
//!
//! Projection is lossy on purpose: long series are thinned with a fixed
//! stride and sentinel longitudes are dropped. No shape-aware
//! simplification is attempted.

use crate::attributes::{AttrValue, AttributeMap};
use crate::errors::Result;
use crate::reader::ContainerReader;
use tracing::debug;

/// Series longer than this are thinned.
pub const STRIDE_THRESHOLD: usize = 1000;
/// Stride applied to series longer than [`STRIDE_THRESHOLD`].
pub const DISPLAY_STRIDE: usize = 200;
/// Longitudes at or beyond this magnitude are treated as missing.
pub const SENTINEL_MAGNITUDE: f64 = 1000.0;

/// Stride used for a series of `n` records.
pub fn stride_for(n: usize) -> usize {
    if n > STRIDE_THRESHOLD {
        DISPLAY_STRIDE
    } else {
        1
    }
}

/// True when a longitude marks a missing position.
pub fn is_masked(lon: f64, fill: f64) -> bool {
    lon.is_nan() || lon == fill || lon.abs() >= SENTINEL_MAGNITUDE
}

/// Pair longitudes with latitudes, dropping pairs whose longitude is masked.
///
/// Relative order is preserved. Latitude is never inspected.
pub fn mask_coordinates(lon: &[f64], lat: &[f64], fill: f64) -> Vec<[f64; 2]> {
    lon.iter()
        .zip(lat)
        .filter(|(x, _)| !is_masked(**x, fill))
        .map(|(x, y)| [*x, *y])
        .collect()
}

/// Identifier attached to a projected line.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureId {
    Text(String),
    Number(i64),
}

impl FeatureId {
    pub fn from_attribute(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Text(s) => Some(FeatureId::Text(s.clone())),
            AttrValue::Byte(_) | AttrValue::Short(_) | AttrValue::Int(_) | AttrValue::Long(_) => {
                value.as_f64().map(|v| FeatureId::Number(v as i64))
            }
            _ => None,
        }
    }
}

/// One projected trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryLine {
    pub id: Option<FeatureId>,
    pub coordinates: Vec<[f64; 2]>,
    pub properties: AttributeMap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    SingleLine(TrajectoryLine),
    MultiLine(Vec<TrajectoryLine>),
}

impl Geometry {
    /// All lines, one per trajectory column.
    pub fn lines(&self) -> &[TrajectoryLine] {
        match self {
            Geometry::SingleLine(line) => std::slice::from_ref(line),
            Geometry::MultiLine(lines) => lines,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Geometry::MultiLine(_))
    }
}

/// Projects an open container into line geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryProjector {
    stride: Option<usize>,
}

impl TrajectoryProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed stride instead of one chosen from the series length.
    pub fn with_stride(stride: usize) -> Self {
        Self {
            stride: Some(stride),
        }
    }

    pub fn project(&self, reader: &ContainerReader) -> Result<Geometry> {
        let records = reader.shape("lon")?.first().copied().unwrap_or(0);
        let stride = self.stride.unwrap_or_else(|| stride_for(records));

        let series = reader.coordinate_series(stride)?;
        let properties = reader.properties(stride)?;

        debug!(records, stride, columns = series.columns.len(), "projecting trajectory");

        let mut lines = series.columns.iter().map(|column| TrajectoryLine {
            id: None,
            coordinates: mask_coordinates(&column.lon, &column.lat, series.lon_fill),
            properties: properties.clone(),
        });

        if !series.is_multi_trajectory {
            let mut line = lines.next().unwrap_or_else(|| TrajectoryLine {
                id: None,
                coordinates: Vec::new(),
                properties: properties.clone(),
            });
            line.id = properties.get("id").and_then(FeatureId::from_attribute);
            return Ok(Geometry::SingleLine(line));
        }

        let trajectory_ids = if reader.has_variable("trajectory") {
            Some(reader.values_f64("trajectory")?)
        } else {
            None
        };

        let lines = lines
            .enumerate()
            .map(|(i, mut line)| {
                let id = trajectory_ids
                    .as_ref()
                    .and_then(|ids| ids.iter().nth(i).copied())
                    .filter(|v| v.is_finite())
                    .map_or(i as i64, |v| v as i64);
                line.id = Some(FeatureId::Number(id));
                line
            })
            .collect();

        Ok(Geometry::MultiLine(lines))
    }
}

