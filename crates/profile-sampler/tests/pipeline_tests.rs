//! End-to-end runs against the stub and instrumented backends.

use std::fs;

use atmos_common::{ConfigError, ProfileError};
use atmos_model::{StubBackend, STUB_PROFILE};
use profile_sampler::{run, ConfigResolver, Parallelism, RawConfig, RunOptions};
use profile_table::{header_line, ProfileTable};
use test_utils::backends::{CountingBackend, EchoBackend, FailingBackend, FailureMode};
use test_utils::fixtures::{
    half_hour_config, inverted_range_config, output_in, profile_config, scenario_time, temp_dir,
};
use test_utils::{assert_approx_eq, assert_rel_eq};

const STUB_ROW_TAIL: &str = "2500000000000, 100000000000000, 3000000000000, 100000000000, \
1000000000, 100000000000, 500000000000, 0.0000000000028, 1000, 1000";

#[test]
fn test_half_hour_scenario_table() {
    let dir = temp_dir();
    let config = half_hour_config(output_in(dir.path(), "nrlmsis_output.csv"));

    let summary = run(&config, &StubBackend::new(), &RunOptions::default()).unwrap();
    assert_eq!(summary.rows, 3);

    let text = fs::read_to_string(&config.output_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], header_line());
    assert_eq!(lines[1], format!("2025-08-17T00:00:00, 0, 0, 400000, {}", STUB_ROW_TAIL));
    assert_eq!(lines[2], format!("2025-08-17T00:30:00, 0, 0, 400000, {}", STUB_ROW_TAIL));
    assert_eq!(lines[3], format!("2025-08-17T01:00:00, 0, 0, 400000, {}", STUB_ROW_TAIL));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_inverted_range_writes_header_only() {
    let dir = temp_dir();
    let config = inverted_range_config(output_in(dir.path(), "empty.csv"));
    let backend = CountingBackend::new(StubBackend::new());

    let summary = run(&config, &backend, &RunOptions::default()).unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(backend.calls(), 0);

    let text = fs::read_to_string(&config.output_path).unwrap();
    assert_eq!(text, format!("{}\n", header_line()));
}

#[test]
fn test_zero_step_is_config_error_and_no_file() {
    let dir = temp_dir();
    let output = output_in(dir.path(), "never.csv");
    let overrides = RawConfig::from_pairs([
        ("start", "2025-08-17T00:00:00".to_string()),
        ("end", "2025-08-17T01:00:00".to_string()),
        ("dt", "0".to_string()),
        ("output", output.display().to_string()),
    ])
    .unwrap();

    let err = ConfigResolver::new()
        .resolve(&overrides, &[] as &[&str])
        .unwrap_err();
    assert!(matches!(err, ConfigError::NonPositiveStep(0)));
    assert!(!output.exists());
}

#[test]
fn test_stub_reruns_are_byte_identical() {
    let dir = temp_dir();
    let first = profile_config(output_in(dir.path(), "first.csv"));
    let second = profile_config(output_in(dir.path(), "second.csv"));

    run(&first, &StubBackend::new(), &RunOptions::default()).unwrap();
    run(
        &second,
        &StubBackend::new(),
        &RunOptions {
            parallelism: Parallelism::Rayon,
            progress_every: Some(5),
        },
    )
    .unwrap();

    let a = fs::read(&first.output_path).unwrap();
    let b = fs::read(&second.output_path).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn test_profile_rows_are_grouped_by_time() {
    let dir = temp_dir();
    let config = profile_config(output_in(dir.path(), "profile.csv"));

    run(&config, &EchoBackend, &RunOptions::default()).unwrap();
    let table = ProfileTable::load(&config.output_path).unwrap();
    assert_eq!(table.len(), 12);

    let altitudes: Vec<f64> = table.rows()[..4].iter().map(|r| r.altitude_m).collect();
    assert_eq!(altitudes, vec![300000.0, 150000.0, 300000.0, 600000.0]);
    for (i, row) in table.rows().iter().enumerate() {
        assert_eq!(row.time, scenario_time(1800 * (i / 4) as i64));
        assert_eq!(row.latitude_deg, 45.0);
        assert_eq!(row.longitude_deg, -75.0);
        // Echo backend puts the altitude into the O density
        assert_eq!(row.densities.o, row.altitude_m);
    }
}

#[test]
fn test_failure_mid_run_leaves_no_table() {
    let dir = temp_dir();
    let config = profile_config(output_in(dir.path(), "partial.csv"));
    let backend = FailingBackend::new(7, FailureMode::NegativeDensity);

    let err = run(&config, &backend, &RunOptions::default()).unwrap_err();
    match err {
        ProfileError::Sampling(e) => {
            assert_eq!(e.index, 6);
            assert_eq!(e.time, scenario_time(1800));
            assert_eq!(e.altitude_m, 300000.0);
            assert!(e.to_string().contains("2025-08-17T00:30:00"));
        }
        other => panic!("expected sampling error, got {:?}", other),
    }
    assert_eq!(backend.calls(), 7);
    assert!(!config.output_path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_failure_keeps_previous_table() {
    let dir = temp_dir();
    let config = half_hour_config(output_in(dir.path(), "out.csv"));
    run(&config, &StubBackend::new(), &RunOptions::default()).unwrap();
    let before = fs::read(&config.output_path).unwrap();

    let backend = FailingBackend::new(2, FailureMode::Error);
    assert!(run(&config, &backend, &RunOptions::default()).is_err());
    assert_eq!(fs::read(&config.output_path).unwrap(), before);
}

#[test]
fn test_truncated_table_rejected_by_reader() {
    let dir = temp_dir();
    let config = half_hour_config(output_in(dir.path(), "out.csv"));
    run(&config, &StubBackend::new(), &RunOptions::default()).unwrap();

    let text = fs::read_to_string(&config.output_path).unwrap();
    let cut = text.len() - 20;
    assert!(ProfileTable::parse(&text[..cut]).is_err());
    assert!(ProfileTable::parse(&text).is_ok());
}

#[test]
fn test_table_round_trip_and_nearest_lookup() {
    let dir = temp_dir();
    let config = profile_config(output_in(dir.path(), "lookup.csv"));
    run(&config, &StubBackend::new(), &RunOptions::default()).unwrap();

    let table = ProfileTable::load(&config.output_path).unwrap();
    assert_eq!(table.len(), 12);

    let row = table.nearest(scenario_time(1790), 590000.0).unwrap();
    assert_eq!(row.time, scenario_time(1800));
    assert_eq!(row.altitude_m, 600000.0);
    assert_rel_eq!(row.mass_density, STUB_PROFILE.mass_density, 1e-12);
    assert_rel_eq!(row.densities.o, STUB_PROFILE.densities.o, 1e-12);
    assert_approx_eq!(row.exospheric_temperature, STUB_PROFILE.exospheric_temperature, 1e-9);
    assert_approx_eq!(row.local_temperature, STUB_PROFILE.local_temperature, 1e-9);
}

#[cfg(unix)]
#[test]
fn test_output_table_is_readable_by_others() {
    use std::os::unix::fs::PermissionsExt;

    let dir = temp_dir();
    let config = half_hour_config(output_in(dir.path(), "shared.csv"));
    run(&config, &StubBackend::new(), &RunOptions::default()).unwrap();

    let mode = fs::metadata(&config.output_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}
