mod common;

use chrono::{TimeZone, Utc};
use common::{
    sample_observations, with_missing_ids, write_masked_roms_file, write_plain_file,
    write_roms_file,
};
use glider_nc::attributes::AttrValue;
use glider_nc::config::{QcArrays, WriteConfig};
use glider_nc::errors::GliderError;
use glider_nc::geojson::{geojson, geojson_line, GeoJsonOptions};
use glider_nc::metadata::{format_size, get_variable_metadata};
use glider_nc::parallel::{convert_batch, ConversionJob, ParallelConfig};
use glider_nc::projector::{FeatureId, Geometry, TrajectoryProjector};
use glider_nc::reader::ContainerReader;
use glider_nc::roms;
use glider_nc::schema::{SchemaRegistry, FILL_F64, FILL_I8};
use glider_nc::validation::{validate, ValidationIssue};
use glider_nc::writer::{write_container, ContainerWriter};
use ndarray::{ArrayD, IxDyn};
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn fixed_config() -> WriteConfig {
    WriteConfig::default().with_created_at(Utc.with_ymd_and_hms(2013, 8, 2, 12, 0, 0).unwrap())
}

#[test]
fn test_single_trajectory_layout() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("ru29.nc");

    write_container(&path, &sample_observations(10, 1), fixed_config())
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    assert_eq!(reader.dimension_len("time"), Some(10));
    assert_eq!(reader.dimension_len("trajectory"), Some(1));
    assert_eq!(reader.dimension_len("time_uv"), Some(1));

    let time_dim = reader
        .dimensions()
        .into_iter()
        .find(|d| d.name == "time")
        .expect("time dimension");
    assert!(time_dim.is_unlimited);

    assert_eq!(reader.shape("lat").unwrap(), vec![10]);
    assert_eq!(reader.shape("time_qc").unwrap(), vec![10]);
    assert_eq!(reader.shape("u").unwrap(), vec![1]);
    assert!(reader.shape("platform").unwrap().is_empty());

    let expected: Vec<&str> = SchemaRegistry::global().variables().map(|v| v.name).collect();
    assert_eq!(reader.variable_names(), expected);
}

#[test]
fn test_multi_trajectory_layout() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("multi.nc");

    write_container(&path, &sample_observations(10, 3), fixed_config())
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    assert_eq!(reader.shape("lat").unwrap(), vec![10, 3]);
    assert_eq!(reader.shape("lat_qc").unwrap(), vec![10, 3]);
    assert_eq!(reader.shape("time").unwrap(), vec![10]);
    assert_eq!(reader.shape("time_qc").unwrap(), vec![10]);
    assert_eq!(reader.shape("trajectory").unwrap(), vec![3]);
    assert_eq!(reader.shape("v").unwrap(), vec![1, 3]);

    let lat = reader.values_f64("lat").unwrap();
    assert!((lat[[2, 1]] - (39.0 + 0.002 + 0.1)).abs() < 1e-12);
}

#[test]
fn test_fill_values_and_attribute_order() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("attrs.nc");
    write_container(&path, &sample_observations(5, 1), fixed_config())
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    assert_eq!(reader.fill_value("lat").unwrap(), Some(FILL_F64));
    assert_eq!(reader.fill_value("segment_id").unwrap(), Some(-32767.0));
    assert_eq!(reader.fill_value("depth_qc").unwrap(), Some(-127.0));
    assert_eq!(reader.fill_value("time").unwrap(), None);
    assert_eq!(reader.fill_value("trajectory").unwrap(), None);

    let qc = reader.variable_attributes("lat_qc").unwrap();
    assert_eq!(qc.get("flag_values"), Some(&AttrValue::Bytes((0..=9).collect())));
    assert_eq!(qc.get_str("long_name"), Some("lat Quality Flag"));
    assert_eq!(qc.get_str("standard_name"), Some("lat status_flag"));

    let lat = reader.variable_attributes("lat").unwrap();
    assert_eq!(lat.get("valid_min"), Some(&AttrValue::Double(-90.0)));
    let segment = reader.variable_attributes("segment_id").unwrap();
    assert_eq!(segment.get("valid_max"), Some(&AttrValue::Short(999)));

    // Stored order is lexicographic apart from _FillValue
    let file = netcdf::open(&path).expect("Failed to open NetCDF file");
    let var = file.variable("temperature").expect("Variable not found");
    let names: Vec<String> = var
        .attributes()
        .map(|a| a.name().to_string())
        .filter(|name| name != "_FillValue")
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(var.attribute("_FillValue").is_some());

    let globals: Vec<String> = file.attributes().map(|a| a.name().to_string()).collect();
    let mut sorted = globals.clone();
    sorted.sort();
    assert_eq!(globals, sorted);
}

#[test]
fn test_omitted_qc_written_as_fill() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("qc.nc");

    let depth_qc = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1i8, 1, 4, 9]).unwrap();
    let qc = QcArrays {
        depth_qc: Some(depth_qc.clone()),
        ..QcArrays::default()
    };
    write_container(&path, &sample_observations(4, 1), fixed_config().with_qc(qc))
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    assert_eq!(reader.values_i8("depth_qc").unwrap(), depth_qc);
    for name in ["time_qc", "lat_qc", "lon_qc", "temperature_qc", "u_qc", "v_qc"] {
        let values = reader.values_i8(name).unwrap();
        assert!(!values.is_empty(), "{} is empty", name);
        assert!(values.iter().all(|v| *v == FILL_I8), "{} is not all fill", name);
    }
}

#[test]
fn test_global_attributes_defaults_bounds_and_overrides() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("globals.nc");

    let config = fixed_config()
        .with_global("title", "ru29 August 2013")
        .with_global("id", "ru29-20130801T0000");
    write_container(&path, &sample_observations(10, 1), config)
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let attrs = reader.attributes().unwrap();

    assert_eq!(attrs.get_str("title"), Some("ru29 August 2013"));
    assert_eq!(attrs.get_str("id"), Some("ru29-20130801T0000"));
    assert_eq!(attrs.get_str("Conventions"), Some("CF-1.6"));
    assert_eq!(
        attrs.get_str("format_version"),
        Some("IOOS_Glider_NetCDF_Trajectory_Template_v0.0")
    );
    assert_eq!(attrs.get_str("date_created"), Some("2013-08-02T12:00:00Z"));
    assert_eq!(attrs.get_str("time_coverage_start"), Some("2013-08-01 00:00 UTC"));
    assert_eq!(attrs.get_str("time_coverage_end"), Some("2013-08-01 00:09 UTC"));

    assert_eq!(attrs.get_f64("geospatial_lat_min"), Some(39.0));
    assert!((attrs.get_f64("geospatial_lat_max").unwrap() - 39.009).abs() < 1e-12);
    assert_eq!(attrs.get_f64("geospatial_vertical_min"), Some(0.0));
    assert_eq!(attrs.get_f64("geospatial_vertical_max"), Some(9.0));

    assert_eq!(attrs.len(), 50);
    assert!(!attrs.contains_key("platform_type"));
    assert!(!attrs.contains_key("geospatial_bounds_crs"));
}

#[test]
fn test_global_attributes_and_dimensions_survive_reopen() {
    let temp_dir = tempdir().expect("Failed to create temp dir");

    for (trajectories, name) in [(1, "single.nc"), (3, "multi.nc")] {
        let path = temp_dir.path().join(name);
        let obs = sample_observations(7, trajectories);
        let writer = ContainerWriter::new(fixed_config().with_global("title", "ru29"));
        let expected = writer.global_attributes(&obs);
        writer.write(&path, &obs).expect("Failed to write container");

        let reader = ContainerReader::open(&path).expect("Failed to open container");
        assert_eq!(reader.dimension_len("time"), Some(7));
        assert_eq!(reader.dimension_len("trajectory"), Some(trajectories));
        assert_eq!(reader.dimension_len("time_uv"), Some(1));

        let stored = reader.attributes().expect("Failed to read attributes");
        assert_eq!(stored, expected);

        let keys: Vec<&str> = stored.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}

#[test]
fn test_descriptor_overrides() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("platform.nc");

    let mut config = fixed_config();
    config.platform_overrides.insert("id", "ru30");
    config.instrument_overrides.insert("serial_number", "0142");
    write_container(&path, &sample_observations(3, 1), config)
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let platform = reader.variable_attributes("platform").unwrap();
    assert_eq!(platform.get_str("id"), Some("ru30"));
    assert_eq!(platform.get_str("type"), Some("platform"));
    let ctd = reader.variable_attributes("instrument_ctd").unwrap();
    assert_eq!(ctd.get_str("serial_number"), Some("0142"));
    assert_eq!(ctd.get_str("make_model"), Some("Seabird SBE 41CP"));
}

#[test]
fn test_shape_mismatch_touches_nothing() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("bad.nc");

    let mut obs = sample_observations(10, 1);
    obs.lat = ArrayD::from_elem(IxDyn(&[9]), 39.0);

    let err = write_container(&path, &obs, fixed_config()).unwrap_err();
    match err {
        GliderError::ShapeMismatch {
            variable,
            expected,
            actual,
        } => {
            assert_eq!(variable, "lat");
            assert_eq!(expected, 10);
            assert_eq!(actual, 9);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_write_keeps_existing_destination() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("keep.nc");

    write_container(
        &path,
        &sample_observations(5, 1),
        fixed_config().with_global("title", "original"),
    )
    .expect("Failed to write container");

    let mut obs = sample_observations(5, 3);
    obs.u = ArrayD::from_elem(IxDyn(&[1, 2]), 0.0);
    let err = write_container(&path, &obs, fixed_config().with_global("title", "replacement"));
    assert!(matches!(err, Err(GliderError::ShapeMismatch { .. })));

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    assert_eq!(reader.attributes().unwrap().get_str("title"), Some("original"));

    let entries: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["keep.nc".to_string()]);
}

#[test]
fn test_write_into_missing_directory_leaves_no_partial() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("absent").join("out.nc");

    let result = write_container(&path, &sample_observations(3, 1), fixed_config());
    assert!(result.is_err());
    assert!(!path.exists());
    assert!(!temp_dir.path().join("absent").join(".out.nc.partial").exists());
}

#[test]
fn test_overwrite_replaces_destination() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("replace.nc");
    let writer = ContainerWriter::new(fixed_config());

    writer
        .write(&path, &sample_observations(3, 1))
        .expect("Failed to write container");
    writer
        .write(&path, &sample_observations(7, 1))
        .expect("Failed to rewrite container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    assert_eq!(reader.dimension_len("time"), Some(7));
}

#[test]
fn test_reader_requires_coordinates() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("nolat.nc");
    write_plain_file(&path, "time", &[("time", vec![0.0, 60.0]), ("lon", vec![1.0, 2.0])]);

    match ContainerReader::open(&path) {
        Err(GliderError::MissingVariable { var }) => assert_eq!(var, "lat"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("opened a file without lat"),
    }
}

#[test]
fn test_reader_requires_time() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("notime.nc");
    write_plain_file(&path, "obs", &[("lon", vec![1.0]), ("lat", vec![2.0])]);

    assert!(matches!(
        ContainerReader::open(&path),
        Err(GliderError::MissingVariable { .. })
    ));
}

#[test]
fn test_reader_prefers_model_time() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("both.nc");
    write_plain_file(
        &path,
        "ocean_time",
        &[
            ("ocean_time", vec![0.0, 3600.0]),
            ("time", vec![0.0, 60.0]),
            ("lon", vec![1.0, 2.0]),
            ("lat", vec![3.0, 4.0]),
        ],
    );

    let reader = ContainerReader::open(&path).expect("Failed to open file");
    assert_eq!(reader.time_variable(), "ocean_time");
    let coverage = reader.time_coverage(1).unwrap().expect("coverage");
    assert_eq!(coverage.start_text(), "2013-08-01 00:00 UTC");
    assert_eq!(coverage.end_text(), "2013-08-01 01:00 UTC");
}

#[test]
fn test_properties_derive_missing_coverage() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("plain.nc");
    write_plain_file(
        &path,
        "time",
        &[
            ("time", vec![0.0, 60.0, 120.0, 180.0]),
            ("lon", vec![1.0, 2.0, 3.0, 4.0]),
            ("lat", vec![5.0, 6.0, 7.0, 8.0]),
        ],
    );

    let reader = ContainerReader::open(&path).expect("Failed to open file");
    let props = reader.properties(2).unwrap();
    assert_eq!(props.get_str("time_coverage_start"), Some("2013-08-01 00:00 UTC"));
    assert_eq!(props.get_str("time_coverage_end"), Some("2013-08-01 00:02 UTC"));

    // The file itself is unchanged
    assert!(!reader.attributes().unwrap().contains_key("time_coverage_start"));
}

#[test]
fn test_properties_keep_stored_coverage() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("stored.nc");
    let config = fixed_config()
        .with_global("time_coverage_start", "declared start")
        .with_global("time_coverage_end", "declared end");
    write_container(&path, &sample_observations(10, 1), config)
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let props = reader.properties(1).unwrap();
    assert_eq!(props.get_str("time_coverage_start"), Some("declared start"));
    assert_eq!(props.get_str("time_coverage_end"), Some("declared end"));
}

#[test]
fn test_empty_time_series_has_no_coverage() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("empty.nc");
    write_plain_file(
        &path,
        "time",
        &[("time", vec![]), ("lon", vec![]), ("lat", vec![])],
    );

    let reader = ContainerReader::open(&path).expect("Failed to open file");
    assert_eq!(reader.time_coverage(1).unwrap(), None);
}

#[test]
fn test_unknown_calendar_is_rejected() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("calendar.nc");
    write_plain_file(
        &path,
        "time",
        &[
            ("time", vec![0.0]),
            ("lon", vec![1.0]),
            ("lat", vec![2.0]),
        ],
    );
    {
        let mut file = netcdf::append(&path).expect("Failed to reopen file");
        let mut var = file.variable_mut("time").expect("Variable not found");
        var.put_attribute("calendar", "360_day")
            .expect("Failed to add calendar");
    }

    let reader = ContainerReader::open(&path).expect("Failed to open file");
    assert!(matches!(
        reader.time_coverage(1),
        Err(GliderError::UnitsParse { .. })
    ));
}

#[test]
fn test_project_single_line_masks_sentinels() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("single.nc");

    let mut obs = sample_observations(4, 1);
    obs.lon = ArrayD::from_shape_vec(IxDyn(&[4]), vec![10.0, 20.0, 1500.0, 30.0]).unwrap();
    obs.lat = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    write_container(&path, &obs, fixed_config().with_global("id", "ru29-20130801"))
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let geometry = TrajectoryProjector::new().project(&reader).unwrap();

    match geometry {
        Geometry::SingleLine(line) => {
            assert_eq!(line.coordinates, vec![[10.0, 1.0], [20.0, 2.0], [30.0, 4.0]]);
            assert_eq!(line.id, Some(FeatureId::Text("ru29-20130801".to_string())));
            assert_eq!(line.properties.get_str("title"), Some("Glider Dataset"));
        }
        Geometry::MultiLine(_) => panic!("expected a single line"),
    }
}

#[test]
fn test_project_applies_display_stride() {
    let temp_dir = tempdir().expect("Failed to create temp dir");

    let long = temp_dir.path().join("long.nc");
    write_container(&long, &sample_observations(1500, 1), fixed_config())
        .expect("Failed to write container");
    let reader = ContainerReader::open(&long).expect("Failed to open container");
    let geometry = TrajectoryProjector::new().project(&reader).unwrap();
    assert_eq!(geometry.lines()[0].coordinates.len(), 8);
    assert_eq!(geometry.lines()[0].coordinates[1][0], -74.0 + 0.001 * 200.0);

    let short = temp_dir.path().join("short.nc");
    write_container(&short, &sample_observations(500, 1), fixed_config())
        .expect("Failed to write container");
    let reader = ContainerReader::open(&short).expect("Failed to open container");
    let geometry = TrajectoryProjector::new().project(&reader).unwrap();
    assert_eq!(geometry.lines()[0].coordinates.len(), 500);
}

#[test]
fn test_project_multi_line_ids_and_empty_columns() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("multi.nc");

    let mut obs = sample_observations(6, 3);
    obs.trajectory = vec![5, 6, 7];
    obs.lon.index_axis_mut(ndarray::Axis(1), 1).fill(FILL_F64);
    write_container(&path, &obs, fixed_config()).expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let geometry = TrajectoryProjector::new().project(&reader).unwrap();
    assert!(geometry.is_multi());

    let lines = geometry.lines();
    assert_eq!(lines.len(), 3);
    let ids: Vec<_> = lines.iter().map(|l| l.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            Some(FeatureId::Number(5)),
            Some(FeatureId::Number(6)),
            Some(FeatureId::Number(7))
        ]
    );
    assert_eq!(lines[0].coordinates.len(), 6);
    assert!(lines[1].coordinates.is_empty());
    assert_eq!(lines[2].coordinates[0], [-74.2, 39.2]);
}

#[test]
fn test_geojson_feature_and_callback() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("feature.nc");
    write_container(
        &path,
        &sample_observations(5, 1),
        fixed_config().with_global("id", "ru29"),
    )
    .expect("Failed to write container");

    let text = geojson(&path, &GeoJsonOptions::new()).expect("Failed to render GeoJSON");
    let doc: Value = serde_json::from_str(&text).expect("invalid JSON");
    assert_eq!(doc["type"], "Feature");
    assert_eq!(doc["id"], "ru29");
    assert_eq!(doc["geometry"]["type"], "LineString");
    assert_eq!(doc["geometry"]["coordinates"].as_array().unwrap().len(), 5);
    assert_eq!(doc["properties"]["cdm_data_type"], "Trajectory");

    let wrapped = geojson_line(&path, &GeoJsonOptions::new().with_callback("app.render"))
        .expect("Failed to render GeoJSON");
    assert_eq!(wrapped, format!("app.render({})", text));

    let err = geojson(&path, &GeoJsonOptions::new().with_callback("alert(1)//")).unwrap_err();
    assert!(matches!(err, GliderError::InvalidCallback(_)));
}

#[test]
fn test_geojson_feature_collection() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("collection.nc");
    write_container(&path, &sample_observations(5, 3), fixed_config())
        .expect("Failed to write container");

    let text = geojson(&path, &GeoJsonOptions::new().with_pretty(true))
        .expect("Failed to render GeoJSON");
    let doc: Value = serde_json::from_str(&text).expect("invalid JSON");
    assert_eq!(doc["type"], "FeatureCollection");
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[2]["id"], 2);
    assert_eq!(features[0]["properties"]["time_coverage_start"], "2013-08-01 00:00 UTC");
}

#[test]
fn test_validate_clean_container() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("valid.nc");
    write_container(&path, &sample_observations(20, 1), fixed_config())
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let report = validate(&reader).unwrap();
    assert!(report.is_valid(), "unexpected issues: {:?}", report.issues);
}

#[test]
fn test_validate_reports_findings() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("invalid.nc");

    let mut obs = sample_observations(4, 1);
    obs.lat[[3]] = 95.0;
    let qc = QcArrays {
        lon_qc: Some(ArrayD::from_shape_vec(IxDyn(&[4]), vec![1i8, 12, 1, 12]).unwrap()),
        ..QcArrays::default()
    };
    let config = fixed_config()
        .with_qc(qc)
        .with_global("geospatial_lon_min", 0.0);
    write_container(&path, &obs, config).expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let report = validate(&reader).unwrap();
    assert!(!report.is_valid());

    assert!(report.issues.contains(&ValidationIssue::OutOfRange {
        variable: "lat".to_string(),
        min: -90.0,
        max: 90.0,
        count: 1,
    }));
    assert!(report.issues.contains(&ValidationIssue::QcOutOfDomain {
        variable: "lon_qc".to_string(),
        count: 2,
        example: 12,
    }));
    assert!(report.issues.iter().any(|issue| matches!(
        issue,
        ValidationIssue::BoundsMismatch { attribute, declared: Some(d), .. }
            if attribute == "geospatial_lon_min" && *d == 0.0
    )));
}

#[test]
fn test_roms_conversion() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("floats_his.nc");
    let output = temp_dir.path().join("floats.nc");
    write_roms_file(&input, 5, 2);

    roms::convert(&input, &output, fixed_config()).expect("Failed to convert");

    let reader = ContainerReader::open(&output).expect("Failed to open container");
    assert_eq!(reader.shape("lon").unwrap(), vec![5, 2]);
    assert_eq!(reader.shape("u").unwrap(), vec![1, 2]);
    assert_eq!(reader.values_i16("trajectory").unwrap().into_raw_vec(), vec![0, 1]);

    let attrs = reader.attributes().unwrap();
    assert_eq!(attrs.get_str("processing_level"), Some(""));
    assert_eq!(attrs.get_str("time_coverage_start"), Some("2013-08-01 00:00 UTC"));
    assert_eq!(attrs.get_str("time_coverage_end"), Some("2013-08-01 04:00 UTC"));

    let pressure = reader.values_f64("pressure").unwrap();
    assert!(pressure.iter().all(|v| v.is_nan()));
    let segment = reader.values_i16("segment_id").unwrap();
    assert!(segment.iter().all(|v| *v == -32767));

    let geometry = TrajectoryProjector::new().project(&reader).unwrap();
    assert_eq!(geometry.lines().len(), 2);
    assert_eq!(geometry.lines()[1].coordinates[0], [-69.0, 41.0]);
}

#[test]
fn test_roms_conversion_masks_inactive_floats() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("floats_his.nc");
    let output = temp_dir.path().join("floats.nc");
    write_masked_roms_file(&input, 5, 2, Some(1e37), &[(2, 1)]);

    roms::convert(&input, &output, fixed_config()).expect("Failed to convert");

    let reader = ContainerReader::open(&output).expect("Failed to open container");
    let lon = reader.values_f64("lon").unwrap();
    assert_eq!(lon[[2, 1]], FILL_F64);
    assert_eq!(reader.values_f64("temperature").unwrap()[[2, 1]], FILL_F64);

    let attrs = reader.attributes().unwrap();
    assert!((attrs.get_f64("geospatial_lon_max").unwrap() - (-68.96)).abs() < 1e-9);
    assert!((attrs.get_f64("geospatial_lat_max").unwrap() - 41.04).abs() < 1e-9);

    let report = validate(&reader).expect("Failed to validate");
    assert!(report.is_valid(), "{:?}", report.issues);

    let geometry = TrajectoryProjector::new().project(&reader).unwrap();
    assert_eq!(geometry.lines()[0].coordinates.len(), 5);
    assert_eq!(geometry.lines()[1].coordinates.len(), 4);
}

#[test]
fn test_roms_input_projects_directly() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("floats_his.nc");
    write_roms_file(&input, 3, 2);

    let reader = ContainerReader::open(&input).expect("Failed to open file");
    assert_eq!(reader.time_variable(), "ocean_time");
    let geometry = TrajectoryProjector::new().project(&reader).unwrap();
    let ids: Vec<_> = geometry.lines().iter().map(|l| l.id.clone()).collect();
    assert_eq!(ids, vec![Some(FeatureId::Number(0)), Some(FeatureId::Number(1))]);
    assert_eq!(
        geometry.lines()[0].properties.get_str("time_coverage_end"),
        Some("2013-08-01 02:00 UTC")
    );
}

#[test]
fn test_batch_conversion() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let out_dir = temp_dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let inputs: Vec<_> = ["a_his.nc", "b_his.nc"]
        .iter()
        .map(|name| {
            let path = temp_dir.path().join(name);
            write_roms_file(&path, 4, 2);
            path
        })
        .collect();

    let jobs: Vec<ConversionJob> = inputs
        .iter()
        .map(|input| ConversionJob::into_dir(input, &out_dir).unwrap())
        .collect();
    let report = convert_batch(&jobs, &fixed_config(), &ParallelConfig::with_threads(2))
        .expect("Failed to run batch");

    assert!(report.is_success());
    assert_eq!(report.converted.len(), 2);
    assert!(out_dir.join("a_his_trajectory.nc").exists());
    assert!(out_dir.join("b_his_trajectory.nc").exists());
}

#[test]
fn test_batch_rejects_shared_destination() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let output = temp_dir.path().join("same.nc");
    let jobs = vec![
        ConversionJob::new(temp_dir.path().join("a.nc"), &output),
        ConversionJob::new(temp_dir.path().join("b.nc"), &output),
    ];

    let err = convert_batch(&jobs, &fixed_config(), &ParallelConfig::with_threads(1)).unwrap_err();
    assert!(matches!(err, GliderError::InvalidInput(_)));
    assert!(!output.exists());
}

#[test]
fn test_batch_reports_individual_failures() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let good = temp_dir.path().join("good_his.nc");
    write_roms_file(&good, 3, 2);
    let missing = temp_dir.path().join("missing_his.nc");

    let jobs = vec![
        ConversionJob::into_dir(&good, temp_dir.path()).unwrap(),
        ConversionJob::into_dir(&missing, temp_dir.path()).unwrap(),
    ];
    let report = convert_batch(&jobs, &fixed_config(), &ParallelConfig::with_threads(2)).unwrap();
    assert_eq!(report.converted.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("missing_his_trajectory.nc"));
}

#[test]
fn test_missing_ids_fixture_writes_fill() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("ids.nc");
    write_container(&path, &with_missing_ids(sample_observations(3, 2)), fixed_config())
        .expect("Failed to write container");

    let reader = ContainerReader::open(&path).expect("Failed to open container");
    let report = validate(&reader).unwrap();
    assert!(report.is_valid(), "unexpected issues: {:?}", report.issues);
}

#[test]
fn test_variable_metadata() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("ru29.nc");
    write_container(&path, &sample_observations(12, 2), fixed_config())
        .expect("Failed to write container");
    let reader = ContainerReader::open(&path).expect("Failed to open container");

    let lat = get_variable_metadata(&reader, "lat").expect("Failed to describe lat");
    assert!(lat.in_schema);
    assert_eq!(lat.total_elements, 24);
    assert_eq!(lat.estimated_size_bytes, 24 * 8);
    let dims: Vec<&str> = lat.dimensions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(dims, vec!["time", "trajectory"]);
    assert_eq!(lat.attributes.get_str("units"), Some("degrees_north"));

    let qc = get_variable_metadata(&reader, "lat_qc").expect("Failed to describe lat_qc");
    assert_eq!(qc.estimated_size_bytes, 24);

    assert!(matches!(
        get_variable_metadata(&reader, "oxygen"),
        Err(GliderError::MissingVariable { .. })
    ));
    assert_eq!(format_size(512), "512 bytes");
    assert_eq!(format_size(2048), "2.00 KB");
}
