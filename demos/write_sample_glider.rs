//! Writes a sample single-glider trajectory container and prints its map line.
//!
//! The result is a small IOOS glider file (`sample_glider.nc`) that can be
//! used to try the `inspect`, `validate` and `geojson` commands.

use chrono::{Duration, TimeZone, Utc};
use glider_nc::prelude::*;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let output_path = Path::new("sample_glider.nc");
    let records = 1_440;

    println!("🔨 Creating sample glider file: {}", output_path.display());

    let start = Utc.with_ymd_and_hms(2013, 8, 1, 0, 0, 0).unwrap();
    let column = |f: &dyn Fn(usize) -> f64| {
        ArrayD::from_shape_fn(IxDyn(&[records]), |ix| f(ix[0]))
    };
    let current = |value: f64| ArrayD::from_elem(IxDyn(&[1]), value);

    // One dive every 60 records, drifting slowly north-east
    let dive_depth = |i: usize| {
        let phase = (i % 60) as f64 / 60.0;
        if phase < 0.5 { phase * 2.0 * 80.0 } else { (1.0 - phase) * 2.0 * 80.0 }
    };

    let mut lon = column(&|i| -74.2 + 0.0002 * i as f64);
    // GPS dropouts at the surface
    for i in (0..records).step_by(97) {
        lon[[i]] = FILL_F64;
    }

    let observations = Observations {
        time: (0..records).map(|i| start + Duration::minutes(i as i64)).collect(),
        time_uv: vec![start + Duration::hours(12)],
        trajectory: vec![0],
        segment_id: ArrayD::from_elem(IxDyn(&[records]), 1i16),
        profile_id: ArrayD::from_shape_fn(IxDyn(&[records]), |ix| (ix[0] / 30 + 1) as i16),
        depth: column(&dive_depth),
        lat: column(&|i| 39.3 + 0.0001 * i as f64),
        lon,
        pressure: column(&|i| dive_depth(i) * 1.005),
        conductivity: column(&|_| 4.3),
        density: column(&|i| 1023.0 + dive_depth(i) * 0.02),
        salinity: column(&|_| 32.1),
        temperature: column(&|i| 22.0 - dive_depth(i) * 0.12),
        lat_uv: current(39.37),
        lon_uv: current(-74.06),
        u: current(0.05),
        v: current(0.12),
    };

    let config = WriteConfig::default()
        .with_global("title", "ru29 sample deployment")
        .with_global("id", "ru29-20130801T0000");

    ContainerWriter::new(config).write(output_path, &observations)?;
    println!("✅ Wrote {} records", records);

    let reader = ContainerReader::open(output_path)?;
    if let Some(coverage) = reader.time_coverage(1)? {
        println!("   Coverage: {} to {}", coverage.start_text(), coverage.end_text());
    }

    let geometry = TrajectoryProjector::new().project(&reader)?;
    for line in geometry.lines() {
        println!(
            "   Line {:?}: {} display points from {} records",
            line.id,
            line.coordinates.len(),
            records
        );
    }

    let report = validate(&reader)?;
    if report.is_valid() {
        println!("✅ Container passes validation");
    } else {
        for issue in &report.issues {
            println!("⚠️  {}", issue);
        }
    }

    println!("\n💡 Try: glider-nc geojson {} --callback render", output_path.display());
    Ok(())
}
