//! Read access to glider trajectory containers and compatible model output
//!
//! The reader only ever opens files read-only. Derived values such as time
//! coverage are returned as layered views over the stored attributes; stored
//! values always win.

use crate::attributes::{AttrValue, AttributeMap};
use crate::errors::{GliderError, Result};
use crate::schema::FILL_F64;
use crate::units::{format_coverage, TimeUnits};
use chrono::{DateTime, Utc};
use ndarray::{ArrayD, Axis, IxDyn};
use netcdf::{Attribute, File, Variable};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Time variable names, in order of preference. Model output uses
/// `ocean_time`; glider containers use `time`.
pub const TIME_CANDIDATES: [&str; 2] = ["ocean_time", "time"];

/// Dimension information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Strided longitude/latitude samples of one trajectory column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateColumn {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

/// Strided coordinates for every trajectory column of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSeries {
    pub columns: Vec<CoordinateColumn>,
    /// `_FillValue` of `lon`, or the default f64 fill when absent.
    pub lon_fill: f64,
    /// True when `lon` is (time, trajectory).
    pub is_multi_trajectory: bool,
}

/// First and last strided time samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCoverage {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeCoverage {
    pub fn start_text(&self) -> String {
        format_coverage(&self.start)
    }

    pub fn end_text(&self) -> String {
        format_coverage(&self.end)
    }
}

/// An open container
pub struct ContainerReader {
    path: PathBuf,
    file: File,
    time_name: &'static str,
}

impl ContainerReader {
    /// Open `path` and resolve the canonical time and coordinate variables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)?;

        let time_name = TIME_CANDIDATES
            .iter()
            .copied()
            .find(|name| file.variable(name).is_some())
            .ok_or_else(|| GliderError::missing(TIME_CANDIDATES.join("|")))?;

        for required in ["lon", "lat"] {
            if file.variable(required).is_none() {
                return Err(GliderError::missing(required));
            }
        }

        info!(path = %path.display(), time = time_name, "opened container");
        Ok(Self {
            path,
            file,
            time_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the resolved time variable.
    pub fn time_variable(&self) -> &str {
        self.time_name
    }

    /// Global attributes in lexicographic order.
    pub fn attributes(&self) -> Result<AttributeMap> {
        collect_attributes(self.file.attributes(), "global")
    }

    /// Attributes of one variable in lexicographic order.
    pub fn variable_attributes(&self, name: &str) -> Result<AttributeMap> {
        let var = self.variable(name)?;
        collect_attributes(var.attributes(), name)
    }

    pub fn dimensions(&self) -> Vec<DimensionInfo> {
        self.file
            .dimensions()
            .map(|dim| DimensionInfo {
                name: dim.name(),
                length: dim.len(),
                is_unlimited: dim.is_unlimited(),
            })
            .collect()
    }

    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.file.dimension(name).map(|dim| dim.len())
    }

    /// Names of all variables, in file order.
    pub fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|var| var.name()).collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    /// Dimensions of a variable, in axis order.
    pub fn variable_dimensions(&self, name: &str) -> Result<Vec<DimensionInfo>> {
        let var = self.variable(name)?;
        Ok(var
            .dimensions()
            .iter()
            .map(|dim| DimensionInfo {
                name: dim.name(),
                length: dim.len(),
                is_unlimited: dim.is_unlimited(),
            })
            .collect())
    }

    /// Stored element type, lowercased (`double`, `short`, `byte`, ...).
    pub fn variable_type(&self, name: &str) -> Result<String> {
        let var = self.variable(name)?;
        Ok(format!("{:?}", var.vartype()).to_lowercase())
    }

    pub fn shape(&self, name: &str) -> Result<Vec<usize>> {
        let var = self.variable(name)?;
        Ok(var.dimensions().iter().map(|dim| dim.len()).collect())
    }

    /// Values of a numeric variable converted to f64.
    pub fn values_f64(&self, name: &str) -> Result<ArrayD<f64>> {
        let var = self.variable(name)?;
        let shape = variable_shape(&var);
        let values = var.get_values::<f64, _>(..)?;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }

    pub fn values_i16(&self, name: &str) -> Result<ArrayD<i16>> {
        let var = self.variable(name)?;
        let shape = variable_shape(&var);
        let values = var.get_values::<i16, _>(..)?;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }

    pub fn values_i8(&self, name: &str) -> Result<ArrayD<i8>> {
        let var = self.variable(name)?;
        let shape = variable_shape(&var);
        let values = var.get_values::<i8, _>(..)?;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }

    /// The variable's `_FillValue` widened to f64, if it declares one.
    pub fn fill_value(&self, name: &str) -> Result<Option<f64>> {
        let var = self.variable(name)?;
        match var.attribute("_FillValue") {
            Some(attr) => Ok(AttrValue::from_netcdf(attr.value()?).and_then(|v| v.as_f64())),
            None => Ok(None),
        }
    }

    /// Every `stride`-th lon/lat pair of each trajectory column.
    pub fn coordinate_series(&self, stride: usize) -> Result<CoordinateSeries> {
        check_stride(stride)?;

        let lon = self.values_f64("lon")?;
        let lat = self.values_f64("lat")?;
        if lon.shape() != lat.shape() {
            let actual = lat.shape().first().copied().unwrap_or(0);
            let expected = lon.shape().first().copied().unwrap_or(0);
            return Err(GliderError::shape("lat", expected, actual));
        }

        let lon_fill = self.fill_value("lon")?.unwrap_or(FILL_F64);
        let strided = |values: ndarray::ArrayViewD<'_, f64>| -> Vec<f64> {
            values.iter().step_by(stride).copied().collect()
        };

        let (columns, is_multi_trajectory) = match lon.ndim() {
            0 | 1 => (
                vec![CoordinateColumn {
                    lon: strided(lon.view()),
                    lat: strided(lat.view()),
                }],
                false,
            ),
            2 => {
                let columns = (0..lon.shape()[1])
                    .map(|i| CoordinateColumn {
                        lon: strided(lon.index_axis(Axis(1), i)),
                        lat: strided(lat.index_axis(Axis(1), i)),
                    })
                    .collect();
                (columns, true)
            }
            rank => {
                return Err(GliderError::InvalidInput(format!(
                    "'lon' has rank {}, expected 1 or 2",
                    rank
                )))
            }
        };

        debug!(
            stride,
            columns = columns.len(),
            multi = is_multi_trajectory,
            "read coordinate series"
        );
        Ok(CoordinateSeries {
            columns,
            lon_fill,
            is_multi_trajectory,
        })
    }

    /// Coverage from the first and last strided time samples, or `None` when
    /// the time series is empty.
    pub fn time_coverage(&self, stride: usize) -> Result<Option<TimeCoverage>> {
        check_stride(stride)?;

        let values = self.values_f64(self.time_name)?;
        let mut samples = values.iter().step_by(stride).copied();
        let first = match samples.next() {
            Some(first) => first,
            None => return Ok(None),
        };
        let last = samples.last().unwrap_or(first);

        let attrs = self.variable_attributes(self.time_name)?;
        let units = attrs.get_str("units").ok_or_else(|| GliderError::UnitsParse {
            units: String::new(),
            message: format!("'{}' has no units attribute", self.time_name),
        })?;
        let units = TimeUnits::parse(units, attrs.get_str("calendar"))?;

        Ok(Some(TimeCoverage {
            start: units.to_datetime(first)?,
            end: units.to_datetime(last)?,
        }))
    }

    /// Global attributes with `time_coverage_start`/`time_coverage_end`
    /// derived from the time axis when the file does not declare them.
    pub fn properties(&self, stride: usize) -> Result<AttributeMap> {
        let mut properties = self.attributes()?;
        let complete = properties.contains_key("time_coverage_start")
            && properties.contains_key("time_coverage_end");

        if !complete {
            if let Some(coverage) = self.time_coverage(stride)? {
                properties.insert_if_absent("time_coverage_start", coverage.start_text());
                properties.insert_if_absent("time_coverage_end", coverage.end_text());
            }
        }
        Ok(properties)
    }

    fn variable(&self, name: &str) -> Result<Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| GliderError::missing(name))
    }
}

fn variable_shape(var: &Variable<'_>) -> Vec<usize> {
    var.dimensions().iter().map(|dim| dim.len()).collect()
}

fn check_stride(stride: usize) -> Result<()> {
    if stride == 0 {
        return Err(GliderError::InvalidInput(
            "stride must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn collect_attributes<'a>(
    attributes: impl Iterator<Item = Attribute<'a>>,
    owner: &str,
) -> Result<AttributeMap> {
    let mut map = AttributeMap::new();
    for attr in attributes {
        match AttrValue::from_netcdf(attr.value()?) {
            Some(value) => {
                map.insert(attr.name(), value);
            }
            None => warn!(owner, attribute = attr.name(), "skipping attribute of unsupported type"),
        }
    }
    Ok(map)
}
