//! Atmospheric model backends.
//!
//! The sampling loop only ever sees the [`AtmosphereBackend`] capability.
//! Which implementation sits behind it is decided once, up front, by the
//! caller through [`BackendKind::build`]:
//!
//! - [`LibraryBackend`]: an installed NRLMSISE-00 shared library, loaded at
//!   run time. Construction fails if the library cannot be loaded; there is
//!   no silent downgrade to the stub.
//! - [`StubBackend`]: fixed demonstration values, for pipeline testing and
//!   hosts without the real model.

mod library;
mod stub;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use atmos_common::{AtmosphericSample, BackendError, BackendUnavailableError, GridPoint, RunConfig};

pub use library::{LibraryBackend, DEFAULT_LIBRARY_ENV};
pub use stub::{StubBackend, STUB_PROFILE};

/// Everything a backend needs to evaluate one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointQuery {
    pub time: DateTime<Utc>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    /// F10.7 solar flux; backends may ignore it
    pub solar_flux_index: f64,
    /// Ap geomagnetic index; backends may ignore it
    pub geomagnetic_index: f64,
}

impl PointQuery {
    /// Build the query for a grid point of a run.
    pub fn at(point: &GridPoint, config: &RunConfig) -> Self {
        Self {
            time: point.time,
            latitude_deg: config.latitude_deg,
            longitude_deg: config.longitude_deg,
            altitude_m: point.altitude_m,
            solar_flux_index: config.solar_flux_index,
            geomagnetic_index: config.geomagnetic_index,
        }
    }
}

/// Source of atmospheric state for a single point.
///
/// Implementations must be thread-safe so points can be evaluated in
/// parallel. A backend that batches internally must still answer per point.
pub trait AtmosphereBackend: Send + Sync {
    /// Evaluate the atmosphere at one point.
    ///
    /// The returned sample carries the query's time and position.
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError>;

    /// Backend name for logging and run summaries.
    fn name(&self) -> &'static str;
}

impl<B: AtmosphereBackend + ?Sized> AtmosphereBackend for Box<B> {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        (**self).query(query)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Backend variant selected before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Real NRLMSISE-00 model from a native library
    #[default]
    Library,
    /// Fixed demonstration values
    Stub,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Library => "library",
            BackendKind::Stub => "stub",
        }
    }

    /// Construct the selected backend.
    ///
    /// `library_path` overrides the library location for [`BackendKind::Library`]
    /// and is ignored for the stub.
    pub fn build(
        self,
        library_path: Option<&Path>,
    ) -> Result<Box<dyn AtmosphereBackend>, BackendUnavailableError> {
        match self {
            BackendKind::Stub => Ok(Box::new(StubBackend::new())),
            BackendKind::Library => {
                let backend = match library_path {
                    Some(path) => LibraryBackend::open(path)?,
                    None => LibraryBackend::from_env()?,
                };
                Ok(Box::new(backend))
            }
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "library" | "nrlmsise" | "nrlmsise00" => Ok(BackendKind::Library),
            "stub" => Ok(BackendKind::Stub),
            other => Err(format!(
                "unknown backend '{}' (expected 'library' or 'stub')",
                other
            )),
        }
    }
}
