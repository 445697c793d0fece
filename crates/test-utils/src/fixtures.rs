//! Common run configurations for tests.
//!
//! These mirror the scenarios the pipeline is expected to handle: the
//! half-hourly single-altitude run, an inverted time range, multi-altitude
//! profiles with duplicates.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

use atmos_common::RunConfig;

/// Scenario start: 2025-08-17T00:00:00Z
pub fn scenario_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 17, 0, 0, 0).unwrap()
}

/// Offset from [`scenario_start`] in seconds.
pub fn scenario_time(offset_seconds: i64) -> DateTime<Utc> {
    scenario_start() + chrono::Duration::seconds(offset_seconds)
}

/// Base configuration: one hour, 30-minute cadence, 400 km, equator.
///
/// Three time steps, one altitude, three rows.
pub fn half_hour_config(output_path: impl Into<PathBuf>) -> RunConfig {
    RunConfig {
        start: scenario_start(),
        end: scenario_time(3600),
        step_seconds: 1800,
        latitude_deg: 0.0,
        longitude_deg: 0.0,
        altitudes_m: vec![400000.0],
        solar_flux_index: 150.0,
        geomagnetic_index: 4.0,
        output_path: output_path.into(),
    }
}

/// `end` one hour before `start`: an empty grid.
pub fn inverted_range_config(output_path: impl Into<PathBuf>) -> RunConfig {
    RunConfig {
        start: scenario_time(3600),
        end: scenario_start(),
        ..half_hour_config(output_path)
    }
}

/// Several altitudes with a duplicate, unsorted on purpose.
pub fn profile_config(output_path: impl Into<PathBuf>) -> RunConfig {
    RunConfig {
        altitudes_m: vec![300000.0, 150000.0, 300000.0, 600000.0],
        latitude_deg: 45.0,
        longitude_deg: -75.0,
        ..half_hour_config(output_path)
    }
}

/// Output path inside a test directory.
pub fn output_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// A fresh temporary directory, removed when dropped.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}
