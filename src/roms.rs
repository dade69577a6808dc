//! ROMS simulated float output
//!
//! Simulation files carry `lon`, `lat`, `depth`, `rho`, `temp`, `salt` as
//! (ocean_time, float) arrays and a CF `ocean_time` axis. Converting one
//! produces a multi-trajectory container with one trajectory per float;
//! fields the simulation does not model are written as missing.

use crate::attributes::AttributeMap;
use crate::config::{Observations, WriteConfig};
use crate::errors::{GliderError, Result};
use crate::reader::ContainerReader;
use crate::schema::{FILL_F64, FILL_I16};
use crate::units::TimeUnits;
use crate::writer::ContainerWriter;
use chrono::{DateTime, Utc};
use ndarray::{ArrayD, IxDyn};
use std::path::Path;
use tracing::info;

/// Fields read from one simulation file.
#[derive(Debug, Clone)]
pub struct RomsSimulation {
    pub time: Vec<DateTime<Utc>>,
    pub lon: ArrayD<f64>,
    pub lat: ArrayD<f64>,
    pub depth: ArrayD<f64>,
    pub density: ArrayD<f64>,
    pub temperature: ArrayD<f64>,
    pub salinity: ArrayD<f64>,
}

impl RomsSimulation {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let reader = ContainerReader::open(path)?;

        let time_name = reader.time_variable().to_string();
        let time_attrs = reader.variable_attributes(&time_name)?;
        let units = time_attrs
            .get_str("units")
            .ok_or_else(|| GliderError::UnitsParse {
                units: String::new(),
                message: format!("'{}' has no units attribute", time_name),
            })?;
        let units = TimeUnits::parse(units, time_attrs.get_str("calendar"))?;
        let time = reader
            .values_f64(&time_name)?
            .iter()
            .map(|offset| units.to_datetime(*offset))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time,
            lon: masked_values(&reader, "lon")?,
            lat: masked_values(&reader, "lat")?,
            depth: masked_values(&reader, "depth")?,
            density: masked_values(&reader, "rho")?,
            temperature: masked_values(&reader, "temp")?,
            salinity: masked_values(&reader, "salt")?,
        })
    }

    /// Number of simulated floats.
    pub fn trajectory_count(&self) -> usize {
        match self.lon.shape() {
            [_, floats] => *floats,
            _ => 1,
        }
    }

    /// Map onto container observations. The current-estimate record is a
    /// single all-missing estimate at the first time step.
    pub fn into_observations(self) -> Result<Observations> {
        let first = *self.time.first().ok_or_else(|| {
            GliderError::InvalidInput("simulation has no time steps".to_string())
        })?;

        let shape = self.lon.shape().to_vec();
        let floats = self.trajectory_count();
        let uv_shape: Vec<usize> = if shape.len() == 2 {
            vec![1, floats]
        } else {
            vec![1]
        };
        let trajectory = (0..floats)
            .map(|i| {
                i16::try_from(i).map_err(|_| {
                    GliderError::InvalidInput(format!("too many floats for a trajectory id: {}", floats))
                })
            })
            .collect::<Result<Vec<i16>>>()?;

        let missing = || ArrayD::from_elem(IxDyn(&shape), f64::NAN);
        let missing_ids = || ArrayD::from_elem(IxDyn(&shape), FILL_I16);
        let missing_uv = || ArrayD::from_elem(IxDyn(&uv_shape), f64::NAN);

        Ok(Observations {
            time: self.time,
            time_uv: vec![first],
            trajectory,
            segment_id: missing_ids(),
            profile_id: missing_ids(),
            depth: self.depth,
            lat: self.lat,
            lon: self.lon,
            pressure: missing(),
            conductivity: missing(),
            density: self.density,
            salinity: self.salinity,
            temperature: self.temperature,
            lat_uv: missing_uv(),
            lon_uv: missing_uv(),
            u: missing_uv(),
            v: missing_uv(),
        })
    }
}

/// Values of `name` with the source's own `_FillValue` replaced by the
/// container fill.
fn masked_values(reader: &ContainerReader, name: &str) -> Result<ArrayD<f64>> {
    let mut values = reader.values_f64(name)?;
    if let Some(fill) = reader.fill_value(name)? {
        if fill != FILL_F64 {
            values.mapv_inplace(|v| if v == fill { FILL_F64 } else { v });
        }
    }
    Ok(values)
}

/// Global attributes cleared on converted output. Caller overrides still win.
fn conversion_overrides() -> AttributeMap {
    [("processing_level", ""), ("source", "")].into_iter().collect()
}

/// Convert one simulation file into a container at `output`.
pub fn convert(input: &Path, output: &Path, mut config: WriteConfig) -> Result<()> {
    let simulation = RomsSimulation::read(input)?;
    let floats = simulation.trajectory_count();
    let steps = simulation.time.len();
    let observations = simulation.into_observations()?;

    config.global_overrides = conversion_overrides().merged(&config.global_overrides);
    ContainerWriter::new(config).write(output, &observations)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        floats,
        steps,
        "converted simulation output"
    );
    Ok(())
}
