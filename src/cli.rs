//! Defines command-line interface options using `clap` for the glider-nc application.

use glider_nc::config::{parse_attribute_pair, DEFAULT_DEFLATE_LEVEL};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A CLI tool for glider trajectory NetCDF files
#[derive(Parser, Debug)]
#[command(
    version,
    name = "glider-nc",
    about = "Write, inspect and project IOOS glider trajectory NetCDF files"
)]
pub struct Args {
    /// Log filter used when RUST_LOG is not set (e.g. "info", "glider_nc=debug")
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List dimensions, key global attributes and variables
    Inspect {
        /// Path to the NetCDF file
        file: PathBuf,
    },

    /// Describe a specific variable (data type, shape, and attributes)
    Describe {
        /// Path to the NetCDF file
        file: PathBuf,
        /// Variable name
        variable: String,
    },

    /// Print the trajectory as GeoJSON
    Geojson {
        /// Path to the NetCDF file
        file: PathBuf,
        /// Wrap the document as <callback>(...)
        #[arg(long)]
        callback: Option<String>,
        /// Indent the output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Check declared ranges, QC codes and bounding-box attributes
    Validate {
        /// Path to the NetCDF file
        file: PathBuf,
    },

    /// Convert ROMS simulation output into glider trajectory files
    Convert {
        /// Simulation files to convert
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory receiving <stem>_trajectory.nc files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// JSON object of global attribute overrides
        #[arg(long)]
        attributes: Option<PathBuf>,

        /// Global attribute override, formatted as <attribute>=<value>
        #[arg(long = "attr", value_parser = parse_attribute_pair)]
        attrs: Vec<(String, String)>,

        /// Number of threads to use. Defaults to number of CPU cores.
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Deflate level (0-9) for dimensioned variables
        #[arg(long, default_value_t = DEFAULT_DEFLATE_LEVEL)]
        deflate: i32,
    },
}
