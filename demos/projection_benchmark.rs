//! Benchmark of trajectory projection and batch ROMS conversion.
//!
//! Shows how the display stride affects projection time on long deployments
//! and how batch conversion scales with the size of the thread pool.

use glider_nc::config::WriteConfig;
use glider_nc::parallel::{convert_batch, ConversionJob, ParallelConfig};
use glider_nc::projector::TrajectoryProjector;
use glider_nc::reader::ContainerReader;
use std::path::Path;
use std::time::Instant;

fn write_float_file(path: &Path, steps: usize, floats: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("ocean_time", steps)?;
    file.add_dimension("drifter", floats)?;

    {
        let mut time = file.add_variable::<f64>("ocean_time", &["ocean_time"])?;
        time.put_attribute("units", "days since 2013-08-01 00:00:00")?;
        let offsets: Vec<f64> = (0..steps).map(|i| i as f64 / 24.0).collect();
        time.put_values(&offsets, ..)?;
    }

    let fields = [
        ("lon", -72.0, 0.001),
        ("lat", 38.0, 0.0005),
        ("depth", 10.0, 0.0),
        ("rho", 1026.0, 0.0),
        ("temp", 14.0, 0.0),
        ("salt", 34.5, 0.0),
    ];
    for (name, base, step) in fields {
        let data: Vec<f64> = (0..steps)
            .flat_map(|i| (0..floats).map(move |j| base + step * i as f64 + 0.05 * j as f64))
            .collect();
        let mut var = file.add_variable::<f64>(name, &["ocean_time", "drifter"])?;
        var.put_values(&data, ..)?;
    }
    Ok(())
}

fn time_projection(reader: &ContainerReader, projector: TrajectoryProjector) -> Result<(f64, usize), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let geometry = projector.project(reader)?;
    let points = geometry.lines().iter().map(|l| l.coordinates.len()).sum();
    Ok((start.elapsed().as_secs_f64(), points))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔬 glider-nc Projection Benchmark");
    println!("==========================================\n");

    let work_dir = tempfile::tempdir()?;
    let steps = 20_000;
    let floats = 16;

    let source = work_dir.path().join("floats_his.nc");
    write_float_file(&source, steps, floats)?;

    println!("📊 Projecting {} floats x {} records:", floats, steps);
    println!("-------------------------------------------");
    let reader = ContainerReader::open(&source)?;

    let (full_time, full_points) = time_projection(&reader, TrajectoryProjector::with_stride(1))?;
    println!("🐌 Full resolution: {} points in {:.3} seconds", full_points, full_time);

    let (display_time, display_points) = time_projection(&reader, TrajectoryProjector::new())?;
    println!("⚡ Display stride: {} points in {:.3} seconds", display_points, display_time);
    println!("   🚀 Speedup: {:.2}x\n", full_time / display_time);

    println!("📊 Converting a batch of 8 simulations:");
    println!("-------------------------------------------");
    let inputs: Vec<_> = (0..8)
        .map(|i| {
            let path = work_dir.path().join(format!("run_{}.nc", i));
            write_float_file(&path, 2_000, 4).map(|_| path)
        })
        .collect::<Result<_, _>>()?;

    let output_dir = work_dir.path().join("out");
    std::fs::create_dir_all(&output_dir)?;
    let jobs: Vec<_> = inputs
        .iter()
        .map(|input| ConversionJob::into_dir(input, &output_dir))
        .collect::<Result<_, _>>()?;

    let mut sequential = None;
    for threads in [1, num_cpus::get()] {
        let start = Instant::now();
        let report = convert_batch(&jobs, &WriteConfig::default(), &ParallelConfig::with_threads(threads))?;
        let elapsed = start.elapsed().as_secs_f64();
        println!(
            "   {} thread(s): {} converted, {} failed in {:.3} seconds",
            threads,
            report.converted.len(),
            report.failed.len(),
            elapsed
        );
        match sequential {
            None => sequential = Some(elapsed),
            Some(base) => println!("   🚀 Speedup: {:.2}x", base / elapsed),
        }
    }

    println!("\n💡 Use --threads with `glider-nc convert` to control parallelism");
    Ok(())
}
