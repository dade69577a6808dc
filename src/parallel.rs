//! Parallel batch conversion
//!
//! Each conversion is independent and single-threaded; parallelism only
//! comes from running several of them on a Rayon pool. Two jobs may never
//! share a destination.

use crate::config::WriteConfig;
use crate::errors::{GliderError, Result};
use crate::roms;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Create a configuration that uses a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Build a dedicated pool. `None` threads means one per CPU core.
    pub fn build_pool(&self) -> Result<ThreadPool> {
        let threads = self.num_threads.unwrap_or_else(num_cpus::get);
        if threads == 0 {
            return Err(GliderError::ThreadPool(
                "thread count must be at least 1".to_string(),
            ));
        }
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("glider-convert-{}", i))
            .build()
            .map_err(|e| {
                GliderError::ThreadPool(format!(
                    "Failed to initialize thread pool with {} threads: {}",
                    threads, e
                ))
            })
    }
}

/// Get information about the current parallel configuration
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

impl ParallelInfo {
    pub fn print_info(&self) {
        println!("Parallel processing:");
        println!("   Current threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
    }
}

/// One simulation file and where its container goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Job writing `<output_dir>/<input stem>_trajectory.nc`.
    pub fn into_dir(input: impl Into<PathBuf>, output_dir: &Path) -> Result<Self> {
        let input = input.into();
        let stem = input.file_stem().ok_or_else(|| {
            GliderError::InvalidInput(format!("'{}' has no file name", input.display()))
        })?;
        let output = output_dir.join(format!("{}_trajectory.nc", stem.to_string_lossy()));
        Ok(Self { input, output })
    }
}

/// Results of a batch, in job order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, GliderError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reject batches in which two jobs write the same destination.
pub fn check_distinct_destinations(jobs: &[ConversionJob]) -> Result<()> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.output.as_path()) {
            return Err(GliderError::InvalidInput(format!(
                "destination '{}' is used by more than one job",
                job.output.display()
            )));
        }
    }
    Ok(())
}

/// Convert every job on a dedicated pool. Individual failures are reported,
/// not propagated; only batch-level problems return `Err`.
pub fn convert_batch(
    jobs: &[ConversionJob],
    config: &WriteConfig,
    parallel: &ParallelConfig,
) -> Result<BatchReport> {
    check_distinct_destinations(jobs)?;
    let pool = pool_for(parallel, jobs.len())?;

    info!(jobs = jobs.len(), threads = pool.current_num_threads(), "starting batch conversion");

    let results: Vec<(PathBuf, Result<()>)> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let result = roms::convert(&job.input, &job.output, config.clone());
                if let Err(e) = &result {
                    error!(input = %job.input.display(), error = %e, "conversion failed");
                }
                (job.output.clone(), result)
            })
            .collect()
    });

    let mut report = BatchReport::default();
    for (output, result) in results {
        match result {
            Ok(()) => report.converted.push(output),
            Err(e) => report.failed.push((output, e)),
        }
    }
    Ok(report)
}

fn pool_for(parallel: &ParallelConfig, jobs: usize) -> Result<ThreadPool> {
    match parallel.num_threads {
        Some(_) => parallel.build_pool(),
        None => ParallelConfig::with_threads(num_cpus::get().min(jobs.max(1))).build_pool(),
    }
}
