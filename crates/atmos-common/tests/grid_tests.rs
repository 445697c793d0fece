//! Grid enumeration tests across realistic run shapes.

use std::path::PathBuf;

use atmos_common::{ConfigError, ProfileGrid, RunConfig};
use chrono::{Duration, TimeZone, Utc};

fn config(span_seconds: i64, step_seconds: i64, altitudes_m: Vec<f64>) -> RunConfig {
    let start = Utc.with_ymd_and_hms(2025, 8, 17, 0, 0, 0).unwrap();
    RunConfig {
        start,
        end: start + Duration::seconds(span_seconds),
        step_seconds,
        latitude_deg: 0.0,
        longitude_deg: 0.0,
        altitudes_m,
        solar_flux_index: 150.0,
        geomagnetic_index: 4.0,
        output_path: PathBuf::from("out.csv"),
    }
}

// ============================================================================
// Size
// ============================================================================

#[test]
fn test_day_at_one_minute() {
    let cfg = config(86_400, 60, vec![400000.0]);
    let grid = ProfileGrid::new(&cfg).unwrap();
    assert_eq!(grid.time_steps(), 1441);
    assert_eq!(grid.iter().len(), 1441);
}

#[test]
fn test_twelve_hours_three_altitudes() {
    let cfg = config(43_200, 60, vec![300000.0, 400000.0, 500000.0]);
    let grid = ProfileGrid::new(&cfg).unwrap();
    assert_eq!(grid.len(), 721 * 3);
    assert_eq!(grid.last_time(), Some(cfg.end));
}

#[test]
fn test_negative_step_rejected() {
    let cfg = config(3600, -60, vec![400000.0]);
    assert!(matches!(
        ProfileGrid::new(&cfg),
        Err(ConfigError::NonPositiveStep(-60))
    ));
}

// ============================================================================
// Order
// ============================================================================

#[test]
fn test_points_are_time_major() {
    let cfg = config(120, 60, vec![500000.0, 200000.0]);
    let grid = ProfileGrid::new(&cfg).unwrap();

    let points: Vec<(i64, f64)> = grid
        .iter()
        .map(|p| ((p.time - cfg.start).num_seconds(), p.altitude_m))
        .collect();
    assert_eq!(
        points,
        vec![
            (0, 500000.0),
            (0, 200000.0),
            (60, 500000.0),
            (60, 200000.0),
            (120, 500000.0),
            (120, 200000.0),
        ]
    );
}

#[test]
fn test_point_lookup_matches_iteration() {
    let cfg = config(3600, 900, vec![1.0, 2.0, 3.0]);
    let grid = ProfileGrid::new(&cfg).unwrap();
    for point in &grid {
        assert_eq!(grid.point(point.index), Some(point));
    }
    assert_eq!(grid.point(grid.len()), None);
}
