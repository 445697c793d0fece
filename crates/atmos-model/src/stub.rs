//! Deterministic stand-in for a real atmospheric model.

use atmos_common::{AtmosphericSample, BackendError, SpeciesDensities};

use crate::{AtmosphereBackend, PointQuery};

/// Demonstration magnitudes returned for every point.
///
/// Roughly a moderate-activity thermosphere near 400 km. Number densities in
/// m⁻³, mass density in kg/m³, temperatures in K.
pub const STUB_PROFILE: StubProfile = StubProfile {
    densities: SpeciesDensities {
        he: 2.5e12,
        o: 1.0e14,
        n2: 3.0e12,
        o2: 1.0e11,
        ar: 1.0e9,
        h: 1.0e11,
        n: 5.0e11,
    },
    mass_density: 2.8e-12,
    exospheric_temperature: 1000.0,
    local_temperature: 1000.0,
};

/// The fixed magnitudes a [`StubBackend`] reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StubProfile {
    pub densities: SpeciesDensities,
    pub mass_density: f64,
    pub exospheric_temperature: f64,
    pub local_temperature: f64,
}

/// Backend that ignores its inputs and always answers [`STUB_PROFILE`].
///
/// Only the traceability fields (time, position) follow the query. The space
/// weather indices are ignored. Never fails.
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
    profile: Option<StubProfile>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { profile: None }
    }

    /// Stub answering custom fixed values instead of [`STUB_PROFILE`].
    pub fn with_profile(profile: StubProfile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    pub fn profile(&self) -> StubProfile {
        self.profile.unwrap_or(STUB_PROFILE)
    }
}

impl AtmosphereBackend for StubBackend {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        let profile = self.profile();
        Ok(AtmosphericSample {
            time: query.time,
            latitude_deg: query.latitude_deg,
            longitude_deg: query.longitude_deg,
            altitude_m: query.altitude_m,
            densities: profile.densities,
            mass_density: profile.mass_density,
            exospheric_temperature: profile.exospheric_temperature,
            local_temperature: profile.local_temperature,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
