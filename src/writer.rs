//! Container writer
//!
//! Builds a complete glider trajectory file in one call: validates input
//! shapes, creates dimensions and variables in schema order, attaches
//! attributes in lexicographic order, writes data and derives the global
//! bounding-box attributes. Output goes to a hidden sibling file that is only
//! renamed onto the destination once it has been closed, so a failed write
//! never leaves a partial container behind.

use crate::attributes::{AttrValue, AttributeMap};
use crate::config::{Column, Observations, WriteConfig};
use crate::errors::{GliderError, Result};
use crate::schema::{
    instrument_attributes, platform_attributes, ElementType, FillValue, Layout, SchemaRegistry,
    VarClass, VariableDescriptor, DIM_TIME, DIM_TIME_UV, DIM_TRAJECTORY, FILL_F64, FILL_I8,
    FORMAT_VERSION,
};
use crate::units::{epoch_seconds, format_coverage};
use chrono::Utc;
use ndarray::ArrayD;
use netcdf::{AttributeValue, FileMut, VariableMut};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Writes `put_values` for a record-major slice under either layout.
macro_rules! put_records {
    ($var:expr, $values:expr, $records:expr, $columns:expr) => {
        match $columns {
            None => $var.put_values($values, 0..$records),
            Some(columns) => $var.put_values($values, (0..$records, 0..columns)),
        }
    };
}

/// Lengths of the three dimensions, derived from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionSizes {
    pub records: usize,
    pub trajectories: usize,
    pub current_records: usize,
}

impl DimensionSizes {
    fn governing(self, class: VarClass) -> usize {
        match class.record_dimension() {
            Some(DIM_TIME) => self.records,
            Some(DIM_TIME_UV) => self.current_records,
            Some(DIM_TRAJECTORY) => self.trajectories,
            _ => 0,
        }
    }
}

/// Writer for glider trajectory containers
pub struct ContainerWriter {
    config: WriteConfig,
}

impl ContainerWriter {
    /// Create a new writer
    pub fn new(config: WriteConfig) -> Self {
        Self { config }
    }

    /// Write `observations` to `destination`.
    ///
    /// Shapes are validated before the destination directory is touched. Any
    /// failure after that removes the partial file and leaves an existing
    /// destination as it was.
    pub fn write(&self, destination: &Path, observations: &Observations) -> Result<()> {
        let layout = Layout::from_trajectory_count(observations.trajectory.len())?;
        let sizes = validate_shapes(observations, &self.config, layout)?;

        let partial = PartialFile::for_destination(destination)?;
        self.populate(partial.path(), observations, layout, sizes)?;
        partial.commit(destination)?;

        info!(
            path = %destination.display(),
            records = sizes.records,
            trajectories = sizes.trajectories,
            current_records = sizes.current_records,
            "committed glider container"
        );
        Ok(())
    }

    fn populate(
        &self,
        path: &Path,
        observations: &Observations,
        layout: Layout,
        sizes: DimensionSizes,
    ) -> Result<()> {
        let mut file = netcdf::create(path)?;

        file.add_unlimited_dimension(DIM_TIME)?;
        file.add_dimension(DIM_TRAJECTORY, sizes.trajectories)?;
        file.add_dimension(DIM_TIME_UV, sizes.current_records)?;

        for descriptor in SchemaRegistry::global().variables() {
            self.write_variable(&mut file, descriptor, observations, layout, sizes)?;
        }

        let globals = self.global_attributes(observations);
        for (key, value) in &globals {
            file.add_attribute(key, AttributeValue::from(value))?;
        }

        Ok(())
    }

    fn write_variable(
        &self,
        file: &mut FileMut,
        descriptor: &VariableDescriptor,
        observations: &Observations,
        layout: Layout,
        sizes: DimensionSizes,
    ) -> Result<()> {
        let dims = descriptor.class.dims(layout);
        let records = sizes.governing(descriptor.class);
        let columns = match (descriptor.class, layout) {
            (VarClass::Observation | VarClass::CurrentEstimate, Layout::Multi(n)) => Some(n),
            _ => None,
        };
        let attributes = self.variable_attributes(descriptor);

        debug!(variable = descriptor.name, dims = ?dims, "defining variable");

        match descriptor.element_type {
            ElementType::F64 => {
                let mut var = file.add_variable::<f64>(descriptor.name, &dims)?;
                self.configure(&mut var, descriptor, &attributes, dims.is_empty())?;
                let values = match descriptor.name {
                    "time" => observations.time.iter().map(epoch_seconds).collect(),
                    "time_uv" => observations.time_uv.iter().map(epoch_seconds).collect(),
                    name => match observations.column(name) {
                        Some(Column::F64(array)) => flatten(array),
                        _ => return Err(GliderError::missing(name)),
                    },
                };
                if records > 0 {
                    put_records!(var, &values, records, columns)?;
                }
            }
            ElementType::I16 => {
                let mut var = file.add_variable::<i16>(descriptor.name, &dims)?;
                self.configure(&mut var, descriptor, &attributes, dims.is_empty())?;
                let values = match descriptor.name {
                    "trajectory" => observations.trajectory.clone(),
                    name => match observations.column(name) {
                        Some(Column::I16(array)) => flatten(array),
                        _ => return Err(GliderError::missing(name)),
                    },
                };
                if records > 0 {
                    put_records!(var, &values, records, columns)?;
                }
            }
            ElementType::I8 => {
                let mut var = file.add_variable::<i8>(descriptor.name, &dims)?;
                self.configure(&mut var, descriptor, &attributes, dims.is_empty())?;
                if descriptor.is_qc() && records > 0 {
                    let values = match self.config.qc.get(descriptor.name) {
                        Some(array) => flatten(array),
                        None => {
                            debug!(variable = descriptor.name, "no QC input, writing fill");
                            vec![FILL_I8; records * columns.unwrap_or(1)]
                        }
                    };
                    put_records!(var, &values, records, columns)?;
                }
            }
        }

        Ok(())
    }

    fn configure(
        &self,
        var: &mut VariableMut<'_>,
        descriptor: &VariableDescriptor,
        attributes: &AttributeMap,
        scalar: bool,
    ) -> Result<()> {
        if !scalar && self.config.deflate_level > 0 {
            var.set_compression(self.config.deflate_level, true)?;
        }

        match descriptor.fill {
            Some(FillValue::F64(fill)) => var.set_fill_value(fill)?,
            Some(FillValue::I16(fill)) => var.set_fill_value(fill)?,
            Some(FillValue::I8(fill)) => var.set_fill_value(fill)?,
            None => {}
        }

        for (key, value) in attributes {
            var.put_attribute(key, AttributeValue::from(value))?;
        }
        Ok(())
    }

    fn variable_attributes(&self, descriptor: &VariableDescriptor) -> AttributeMap {
        match descriptor.name {
            "platform" => platform_attributes().merged(&self.config.platform_overrides),
            "instrument_ctd" => instrument_attributes().merged(&self.config.instrument_overrides),
            _ => descriptor.attributes.clone(),
        }
    }

    /// Default global attributes, bounding box from the written data, then
    /// caller overrides on top.
    pub fn global_attributes(&self, observations: &Observations) -> AttributeMap {
        let created = self.config.created_at.unwrap_or_else(Utc::now);
        let stamp = created.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let mut attrs = default_global_attributes(&stamp);

        let (lat_min, lat_max) = extrema(&observations.lat);
        let (lon_min, lon_max) = extrema(&observations.lon);
        let (depth_min, depth_max) = extrema(&observations.depth);
        attrs.insert("geospatial_lat_min", lat_min);
        attrs.insert("geospatial_lat_max", lat_max);
        attrs.insert("geospatial_lon_min", lon_min);
        attrs.insert("geospatial_lon_max", lon_max);
        attrs.insert("geospatial_vertical_min", depth_min);
        attrs.insert("geospatial_vertical_max", depth_max);

        if let (Some(first), Some(last)) = (observations.time.first(), observations.time.last()) {
            attrs.insert("time_coverage_start", format_coverage(first));
            attrs.insert("time_coverage_end", format_coverage(last));
        }

        attrs.merge(&self.config.global_overrides);
        attrs
    }
}

/// Write a container with `config`. See [`ContainerWriter::write`].
pub fn write_container(destination: &Path, observations: &Observations, config: WriteConfig) -> Result<()> {
    ContainerWriter::new(config).write(destination, observations)
}

/// Check every input array against its governing dimension.
///
/// Returns the dimension sizes on success, or the first mismatch in schema
/// order.
pub fn validate_shapes(
    observations: &Observations,
    config: &WriteConfig,
    layout: Layout,
) -> Result<DimensionSizes> {
    let sizes = DimensionSizes {
        records: observations.time.len(),
        trajectories: layout.trajectory_count(),
        current_records: observations.time_uv.len(),
    };

    if sizes.current_records == 0 {
        return Err(GliderError::shape(DIM_TIME_UV, 1, 0));
    }

    for descriptor in SchemaRegistry::global().variables() {
        let shape = if descriptor.is_qc() {
            match config.qc.get(descriptor.name) {
                Some(array) => array.shape(),
                None => continue,
            }
        } else {
            match observations.column(descriptor.name) {
                Some(column) => column.shape(),
                None => continue,
            }
        };

        let expected = sizes.governing(descriptor.class);
        match descriptor.class {
            VarClass::Observation | VarClass::CurrentEstimate => {
                check_shape(descriptor.name, shape, expected, layout)?
            }
            _ => check_shape(descriptor.name, shape, expected, Layout::Single)?,
        }
    }

    Ok(sizes)
}

fn check_shape(name: &str, shape: &[usize], records: usize, layout: Layout) -> Result<()> {
    let leading = shape.first().copied().unwrap_or(0);
    if leading != records {
        return Err(GliderError::shape(name, records, leading));
    }

    match (layout, shape.len()) {
        (Layout::Single, 1) => Ok(()),
        (Layout::Single, 2) if shape[1] == 1 => Ok(()),
        (Layout::Single, 2) => Err(GliderError::shape(name, 1, shape[1])),
        (Layout::Multi(n), 2) if shape[1] == n => Ok(()),
        (Layout::Multi(n), 2) => Err(GliderError::shape(name, n, shape[1])),
        (Layout::Multi(n), 1) => Err(GliderError::shape(name, n, 1)),
        (_, rank) => Err(GliderError::InvalidInput(format!(
            "'{}' has rank {}, expected 1 or 2",
            name, rank
        ))),
    }
}

/// Record-major copy of an input array.
fn flatten<T: Copy>(array: &ArrayD<T>) -> Vec<T> {
    array.iter().copied().collect()
}

/// Minimum and maximum of the finite, non-fill values; NaN when there are none.
pub fn extrema(array: &ArrayD<f64>) -> (f64, f64) {
    array
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v != FILL_F64)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((f64::NAN, f64::NAN))
}

fn default_global_attributes(stamp: &str) -> AttributeMap {
    let entries: Vec<(&str, AttrValue)> = vec![
        ("Conventions", "CF-1.6".into()),
        ("Metadata_Conventions", "Unidata Dataset Discovery v1.0".into()),
        ("acknowledgment", "This deployment partially supported by ...".into()),
        ("cdm_data_type", "Trajectory".into()),
        ("comment", "This file is intended to be used as a template only.  Data is not to be used for scientific purposes.".into()),
        ("contributor_name", "Scott Glenn, Oscar Schofield, John Kerfoot".into()),
        ("contributor_role", "Principal Investigator, Principal Investigator, Data Manager".into()),
        ("creator_email", "kerfoot@marine.rutgers.edu".into()),
        ("creator_name", "John Kerfoot".into()),
        ("creator_url", "http://marine.rutgers.edu/cool/auvs".into()),
        ("date_created", stamp.into()),
        ("date_issued", stamp.into()),
        ("date_modified", stamp.into()),
        ("featureType", "trajectory".into()),
        ("format_version", FORMAT_VERSION.into()),
        ("geospatial_lat_resolution", "point".into()),
        ("geospatial_lat_units", "degrees_north".into()),
        ("geospatial_lon_resolution", "point".into()),
        ("geospatial_lon_units", "degrees_east".into()),
        ("geospatial_vertical_positive", "down".into()),
        ("geospatial_vertical_resolution", "point".into()),
        ("geospatial_vertical_units", "meters".into()),
        ("history", format!("Created on {}", stamp).into()),
        ("id", "".into()),
        ("institution", "Institute of Marine & Coastal Sciences, Rutgers University".into()),
        ("keywords", "Oceans > Ocean Pressure > Water Pressure, Oceans > Ocean Temperature > Water Temperature, Oceans > Salinity/Density > Conductivity, Oceans > Salinity/Density > Density, Oceans > Salinity/Density > Salinity".into()),
        ("keywords_vocabulary", "GCMD Science Keywords".into()),
        ("license", "This data may be redistributed and used without restriction.".into()),
        ("metadata_link", "".into()),
        ("naming_authority", "edu.rutgers.marine".into()),
        ("processing_level", "Written to file by glider_nc ContainerWriter".into()),
        ("project", "Deployment not project based".into()),
        ("publisher_email", "kerfoot@marine.rutgers.edu".into()),
        ("publisher_name", "John Kerfoot".into()),
        ("publisher_url", "http://marine.rutgers.edu/cool/auvs".into()),
        ("references", "".into()),
        ("sea_name", "".into()),
        ("source", "Observational data from a profiling glider".into()),
        ("standard_name_vocabulary", "CF-v25".into()),
        ("summary", "The Rutgers University Coastal Ocean Observation Lab has deployed autonomous underwater gliders around the world since 1990. Gliders are small, free-swimming, unmanned vehicles that use changes in buoyancy to move vertically and horizontally through the water column in a saw-tooth pattern. They are deployed for days to several months and gather detailed information about the physical, chemical and biological processes of the world's oceans. The Slocum glider was designed and built by Teledyne Webb Research Corporation, Falmouth, MA, USA.".into()),
        ("time_coverage_end", "".into()),
        ("time_coverage_resolution", "point".into()),
        ("time_coverage_start", "".into()),
        ("title", "Glider Dataset".into()),
    ];
    entries.into_iter().collect()
}

/// Hidden sibling file that becomes the destination on commit and is
/// removed if dropped uncommitted.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn for_destination(destination: &Path) -> Result<Self> {
        let name = destination.file_name().ok_or_else(|| {
            GliderError::InvalidInput(format!(
                "destination '{}' has no file name",
                destination.display()
            ))
        })?;
        let path = destination.with_file_name(format!(".{}.partial", name.to_string_lossy()));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(Self {
            path,
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, destination: &Path) -> Result<()> {
        fs::rename(&self.path, destination)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove partial file");
            }
        }
    }
}
