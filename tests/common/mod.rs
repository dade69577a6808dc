//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use glider_nc::config::Observations;
use glider_nc::schema::FILL_I16;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

pub fn deployment_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 8, 1, 0, 0, 0).unwrap()
}

/// Array of `records` rows, 1-D for one trajectory and (records, trajectories) otherwise.
pub fn column(
    records: usize,
    trajectories: usize,
    value: impl Fn(usize, usize) -> f64,
) -> ArrayD<f64> {
    if trajectories == 1 {
        ArrayD::from_shape_fn(IxDyn(&[records]), |ix| value(ix[0], 0))
    } else {
        ArrayD::from_shape_fn(IxDyn(&[records, trajectories]), |ix| value(ix[0], ix[1]))
    }
}

fn id_column(records: usize, trajectories: usize, value: impl Fn(usize) -> i16) -> ArrayD<i16> {
    if trajectories == 1 {
        ArrayD::from_shape_fn(IxDyn(&[records]), |ix| value(ix[0]))
    } else {
        ArrayD::from_shape_fn(IxDyn(&[records, trajectories]), |ix| value(ix[0]))
    }
}

/// A plausible glider deployment: one record per minute off the New Jersey coast.
pub fn sample_observations(records: usize, trajectories: usize) -> Observations {
    let start = deployment_start();
    let uv = |value: f64| column(1, trajectories, move |_, _| value);

    Observations {
        time: (0..records)
            .map(|i| start + Duration::seconds(60 * i as i64))
            .collect(),
        time_uv: vec![start + Duration::minutes(30)],
        trajectory: (0..trajectories as i16).collect(),
        segment_id: id_column(records, trajectories, |_| 1),
        profile_id: id_column(records, trajectories, |i| (i / 10 + 1) as i16),
        depth: column(records, trajectories, |i, _| (i % 100) as f64),
        lat: column(records, trajectories, |i, j| 39.0 + 0.001 * i as f64 + 0.1 * j as f64),
        lon: column(records, trajectories, |i, j| -74.0 + 0.001 * i as f64 - 0.1 * j as f64),
        pressure: column(records, trajectories, |i, _| (i % 100) as f64 * 1.01),
        conductivity: column(records, trajectories, |_, _| 4.2),
        density: column(records, trajectories, |_, _| 1025.0),
        salinity: column(records, trajectories, |_, _| 35.0),
        temperature: column(records, trajectories, |i, _| 15.0 - 0.01 * (i % 100) as f64),
        lat_uv: uv(39.0),
        lon_uv: uv(-74.0),
        u: uv(0.1),
        v: uv(-0.1),
    }
}

/// Observations whose id arrays are all fill, like converted model output.
pub fn with_missing_ids(mut obs: Observations) -> Observations {
    obs.segment_id.fill(FILL_I16);
    obs.profile_id.fill(FILL_I16);
    obs
}

/// Write a minimal file holding only the named 1-D f64 variables on `time`.
pub fn write_plain_file(path: &Path, time_name: &str, variables: &[(&str, Vec<f64>)]) {
    let mut file = netcdf::create(path).expect("Failed to create NetCDF file");
    let len = variables.first().map_or(0, |(_, values)| values.len());
    file.add_dimension(time_name, len)
        .expect("Failed to add time dimension");

    for (name, values) in variables {
        let mut var = file
            .add_variable::<f64>(name, &[time_name])
            .expect("Failed to add variable");
        if *name == time_name || *name == "time" || *name == "ocean_time" {
            var.put_attribute("units", "seconds since 2013-08-01 00:00:00")
                .expect("Failed to add units");
        }
        if !values.is_empty() {
            var.put_values(values, ..).expect("Failed to write data");
        }
    }
}

/// Write a ROMS-style float simulation: (ocean_time, drifter) fields with
/// `steps` hourly records for `floats` drifters.
pub fn write_roms_file(path: &Path, steps: usize, floats: usize) {
    write_masked_roms_file(path, steps, floats, None, &[]);
}

/// Like [`write_roms_file`], with every field declaring `fill` as its
/// `_FillValue` and holding it at each `(step, float)` in `masked`.
pub fn write_masked_roms_file(
    path: &Path,
    steps: usize,
    floats: usize,
    fill: Option<f64>,
    masked: &[(usize, usize)],
) {
    let mut file = netcdf::create(path).expect("Failed to create NetCDF file");
    file.add_dimension("ocean_time", steps)
        .expect("Failed to add dimension ocean_time");
    file.add_dimension("drifter", floats)
        .expect("Failed to add dimension drifter");

    {
        let mut time = file
            .add_variable::<f64>("ocean_time", &["ocean_time"])
            .expect("Failed to add ocean_time");
        time.put_attribute("units", "days since 2013-08-01 00:00:00")
            .expect("Failed to add units");
        let offsets: Vec<f64> = (0..steps).map(|i| i as f64 / 24.0).collect();
        time.put_values(&offsets, ..).expect("Failed to write ocean_time");
    }

    let fields: [(&str, fn(usize, usize) -> f64); 6] = [
        ("lon", |i, j| -70.0 + 0.01 * i as f64 + j as f64),
        ("lat", |i, j| 40.0 + 0.01 * i as f64 + j as f64),
        ("depth", |i, _| 5.0 + i as f64),
        ("rho", |_, _| 1026.0),
        ("temp", |i, _| 12.0 + 0.1 * i as f64),
        ("salt", |_, _| 34.5),
    ];
    for (name, value) in fields {
        let data: Vec<f64> = (0..steps)
            .flat_map(|i| (0..floats).map(move |j| (i, j)))
            .map(|(i, j)| match fill {
                Some(fill) if masked.contains(&(i, j)) => fill,
                _ => value(i, j),
            })
            .collect();
        let mut var = file
            .add_variable::<f64>(name, &["ocean_time", "drifter"])
            .expect("Failed to add variable");
        if let Some(fill) = fill {
            var.set_fill_value(fill).expect("Failed to set fill value");
        }
        var.put_values(&data, ..).expect("Failed to write data");
    }
}
