//! Entry point for the glider-nc application.
//! Handles CLI parsing, logging setup, and dispatches inspect, describe,
//! geojson, validate and convert operations.

use clap::Parser;
use glider_nc::config::{load_attribute_overrides, WriteConfig};
use glider_nc::geojson::{geojson, GeoJsonOptions};
use glider_nc::metadata::{describe_variable, print_summary};
use glider_nc::parallel::{convert_batch, get_parallel_info, ConversionJob, ParallelConfig};
use glider_nc::reader::ContainerReader;
use glider_nc::validation::validate;
use std::fs;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::{Args, Command};

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::Inspect { file } => {
            let reader = ContainerReader::open(&file)?;
            print_summary(&reader)?;
        }

        Command::Describe { file, variable } => {
            let reader = ContainerReader::open(&file)?;
            describe_variable(&reader, &variable)?;
        }

        Command::Geojson {
            file,
            callback,
            pretty,
        } => {
            let options = GeoJsonOptions { callback, pretty };
            println!("{}", geojson(&file, &options)?);
        }

        Command::Validate { file } => {
            let reader = ContainerReader::open(&file)?;
            let report = validate(&reader)?;
            if report.is_valid() {
                println!("✅ {} is valid", file.display());
            } else {
                println!("❌ {} has {} issue(s):", file.display(), report.issues.len());
                for issue in &report.issues {
                    println!("   - {}", issue);
                }
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Convert {
            inputs,
            output_dir,
            attributes,
            attrs,
            threads,
            deflate,
        } => {
            let mut config = WriteConfig::default().with_deflate_level(deflate)?;
            if let Some(path) = attributes {
                config.global_overrides = load_attribute_overrides(&path)?;
            }
            for (key, value) in attrs {
                config.global_overrides.insert(key, value);
            }

            fs::create_dir_all(&output_dir)?;
            let jobs = inputs
                .into_iter()
                .map(|input| ConversionJob::into_dir(input, &output_dir))
                .collect::<Result<Vec<_>, _>>()?;

            let parallel = ParallelConfig::new(threads);
            info!(?parallel, "converting {} file(s)", jobs.len());
            if tracing::enabled!(tracing::Level::DEBUG) {
                get_parallel_info().print_info();
            }

            let report = convert_batch(&jobs, &config, &parallel)?;
            for output in &report.converted {
                println!("✅ Saved {}", output.display());
            }
            for (output, error) in &report.failed {
                println!("❌ {}: {}", output.display(), error);
            }
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
