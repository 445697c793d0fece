//! Resolved run configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fully resolved configuration for one sampling run.
///
/// Produced once (see `profile_sampler::ConfigResolver`) and then only read.
/// The grid varies time and altitude; latitude, longitude and the space
/// weather indices are constant for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// First sample time (inclusive)
    pub start: DateTime<Utc>,
    /// Last sample time (inclusive upper bound)
    pub end: DateTime<Utc>,
    /// Sampling cadence in seconds
    pub step_seconds: i64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Altitudes in meters, sampled in this order for every timestamp
    pub altitudes_m: Vec<f64>,
    /// F10.7 solar radio flux, passed through to the backend
    pub solar_flux_index: f64,
    /// Ap geomagnetic index, passed through to the backend
    pub geomagnetic_index: f64,
    /// Destination table
    pub output_path: PathBuf,
}

impl RunConfig {
    /// Number of altitudes sampled per timestamp.
    pub fn altitude_count(&self) -> usize {
        self.altitudes_m.len()
    }

    /// Lowest and highest configured altitude, if any.
    pub fn altitude_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.altitudes_m.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), a| (lo.min(a), hi.max(a))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(altitudes_m: Vec<f64>) -> RunConfig {
        RunConfig {
            start: Utc.with_ymd_and_hms(2025, 8, 17, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 8, 17, 1, 0, 0).unwrap(),
            step_seconds: 1800,
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitudes_m,
            solar_flux_index: 150.0,
            geomagnetic_index: 4.0,
            output_path: PathBuf::from("out.csv"),
        }
    }

    #[test]
    fn test_altitude_range() {
        let cfg = config(vec![400000.0, 200000.0, 300000.0]);
        assert_eq!(cfg.altitude_range(), Some((200000.0, 400000.0)));
        assert_eq!(cfg.altitude_count(), 3);
    }

    #[test]
    fn test_altitude_range_empty() {
        assert_eq!(config(vec![]).altitude_range(), None);
    }

    #[test]
    fn test_json_roundtrip_keeps_order() {
        let cfg = config(vec![300000.0, 300000.0, 100000.0]);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
