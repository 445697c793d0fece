//! Atmospheric state at a single grid point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Species number densities in particles per cubic meter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeciesDensities {
    pub he: f64,
    pub o: f64,
    pub n2: f64,
    pub o2: f64,
    pub ar: f64,
    pub h: f64,
    pub n: f64,
}

impl SpeciesDensities {
    /// Densities paired with their field names, in table column order.
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("he_density", self.he),
            ("o_density", self.o),
            ("n2_density", self.n2),
            ("o2_density", self.o2),
            ("ar_density", self.ar),
            ("h_density", self.h),
            ("n_density", self.n),
        ]
    }
}

/// Result of evaluating one grid point.
///
/// The shape never depends on the backend that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericSample {
    pub time: DateTime<Utc>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub densities: SpeciesDensities,
    /// Total mass density (kg/m³)
    pub mass_density: f64,
    /// Exospheric temperature (K)
    pub exospheric_temperature: f64,
    /// Temperature at the sample altitude (K)
    pub local_temperature: f64,
}

impl AtmosphericSample {
    /// Every physical magnitude with its field name, in table column order.
    pub fn magnitudes(&self) -> [(&'static str, f64); 10] {
        let d = self.densities.named();
        [
            d[0],
            d[1],
            d[2],
            d[3],
            d[4],
            d[5],
            d[6],
            ("mass_density", self.mass_density),
            ("exospheric_temperature", self.exospheric_temperature),
            ("local_temperature", self.local_temperature),
        ]
    }

    /// Check that all densities and temperatures are finite and non-negative.
    ///
    /// Reports the first offending field.
    pub fn validate(&self) -> Result<(), BackendError> {
        for (field, value) in self.magnitudes() {
            if !value.is_finite() || value < 0.0 {
                return Err(BackendError::InvalidValue { field, value });
            }
        }
        Ok(())
    }
}
