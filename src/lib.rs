//! glider_nc: IOOS glider trajectory NetCDF files
//!
//! A Rust library for writing, reading and projecting glider trajectory
//! containers following the IOOS glider NetCDF template (v0.0). It provides
//! a schema-driven writer that enforces the format's structural invariants,
//! a reader with typed accessors and attribute introspection, and a
//! projector that turns stored coordinates into display-oriented line
//! geometry.
//!
//! ## Key Features
//!
//! - **Schema-driven writing**: dimensions, variables and attributes in a fixed,
//!   deterministic order, written whole or not at all
//! - **Typed reading**: `ndarray` accessors, attribute tables and derived time coverage
//! - **Trajectory projection**: stride downsampling and sentinel masking into line geometry
//! - **GeoJSON**: Feature / FeatureCollection output with optional callback wrapping
//! - **Validation**: declared ranges, QC domains and bounding-box attributes
//! - **ROMS conversion**: simulated float output to trajectory containers, batched in parallel
//!
//! ## Module Organization
//!
//! - [`schema`]: the fixed dimension and variable table
//! - [`writer`]: container creation
//! - [`reader`]: container access
//! - [`projector`]: line geometry
//! - [`geojson`]: GeoJSON text boundary
//! - [`validation`]: post-hoc checks
//! - [`roms`]: simulation output conversion
//! - [`parallel`]: batch conversion
//! - [`metadata`]: human-readable summaries
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glider_nc::prelude::*;
//!
//! # fn main() -> glider_nc::Result<()> {
//! let reader = ContainerReader::open("ru29-20130801.nc")?;
//! let geometry = TrajectoryProjector::new().project(&reader)?;
//! for line in geometry.lines() {
//!     println!("{:?}: {} points", line.id, line.coordinates.len());
//! }
//!
//! let text = geojson("ru29-20130801.nc", &GeoJsonOptions::new().with_callback("render"))?;
//! assert!(text.starts_with("render("));
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod config;
pub mod errors;
pub mod geojson;
pub mod metadata;
pub mod parallel;
pub mod projector;
pub mod reader;
pub mod roms;
pub mod schema;
pub mod units;
pub mod validation;
pub mod writer;

pub use errors::{GliderError, Result};

/// Common imports
pub mod prelude {
    pub use crate::attributes::{AttrValue, AttributeMap};
    pub use crate::config::{Observations, QcArrays, WriteConfig};
    pub use crate::errors::{GliderError, Result};
    pub use crate::geojson::{geojson, geojson_line, GeoJsonOptions};
    pub use crate::projector::{
        mask_coordinates, stride_for, FeatureId, Geometry, TrajectoryLine, TrajectoryProjector,
    };
    pub use crate::reader::{ContainerReader, CoordinateSeries, TimeCoverage};
    pub use crate::schema::{Layout, SchemaRegistry, FILL_F64, FILL_I16, FILL_I8};
    pub use crate::validation::{validate, ValidationIssue, ValidationReport};
    pub use crate::writer::{write_container, ContainerWriter};
}
