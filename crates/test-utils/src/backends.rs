//! Instrumented backends for sampler and pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use atmos_common::{AtmosphericSample, BackendError, SpeciesDensities};
use atmos_model::{AtmosphereBackend, PointQuery, StubBackend};

/// Wraps another backend and counts `query` calls.
#[derive(Debug, Default)]
pub struct CountingBackend<B = StubBackend> {
    inner: B,
    calls: AtomicUsize,
}

impl<B> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<B: AtmosphereBackend> AtmosphereBackend for CountingBackend<B> {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query(query)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// How a [`FailingBackend`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// `query` itself returns an error
    Error,
    /// `query` succeeds but reports a negative O density
    NegativeDensity,
    /// `query` succeeds but reports a NaN local temperature
    NonFinite,
}

/// Stub-valued backend that fails on its Nth call (1-based).
///
/// Every call, including the failing one, is counted.
#[derive(Debug)]
pub struct FailingBackend {
    fail_on: usize,
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new(fail_on: usize, mode: FailureMode) -> Self {
        Self {
            fail_on,
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AtmosphereBackend for FailingBackend {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut sample = StubBackend::new().query(query)?;
        if call == self.fail_on {
            match self.mode {
                FailureMode::Error => {
                    return Err(BackendError::Evaluation(format!("injected failure on call {call}")))
                }
                FailureMode::NegativeDensity => sample.densities.o = -1.0,
                FailureMode::NonFinite => sample.local_temperature = f64::NAN,
            }
        }
        Ok(sample)
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Stub-valued backend that fails every query at one altitude.
///
/// Failures are keyed by point, not by call order, so a parallel run sees
/// the same failing points however the pool schedules them. `slow_at` delays
/// the failing query at one timestamp, making the earliest failure finish
/// last.
#[derive(Debug)]
pub struct AltitudeFailingBackend {
    altitude_m: f64,
    slow_at: Option<(DateTime<Utc>, Duration)>,
}

impl AltitudeFailingBackend {
    pub fn new(altitude_m: f64) -> Self {
        Self {
            altitude_m,
            slow_at: None,
        }
    }

    pub fn slow_at(mut self, time: DateTime<Utc>, delay: Duration) -> Self {
        self.slow_at = Some((time, delay));
        self
    }
}

impl AtmosphereBackend for AltitudeFailingBackend {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        if query.altitude_m != self.altitude_m {
            return StubBackend::new().query(query);
        }
        if let Some((time, delay)) = self.slow_at {
            if query.time == time {
                std::thread::sleep(delay);
            }
        }
        Err(BackendError::Evaluation(format!(
            "no data at {} m",
            query.altitude_m
        )))
    }

    fn name(&self) -> &'static str {
        "altitude-failing"
    }
}

/// Backend whose values encode the query, so tests can check that every row
/// belongs to the point that produced it.
///
/// O density equals the altitude in meters, He density equals seconds since
/// the Unix epoch, local temperature equals latitude + 1000.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoBackend;

impl AtmosphereBackend for EchoBackend {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        Ok(AtmosphericSample {
            time: query.time,
            latitude_deg: query.latitude_deg,
            longitude_deg: query.longitude_deg,
            altitude_m: query.altitude_m,
            densities: SpeciesDensities {
                he: query.time.timestamp() as f64,
                o: query.altitude_m,
                ..SpeciesDensities::default()
            },
            mass_density: query.solar_flux_index,
            exospheric_temperature: query.geomagnetic_index,
            local_temperature: query.latitude_deg + 1000.0,
        })
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_start;

    fn query() -> PointQuery {
        PointQuery {
            time: scenario_start(),
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_m: 400000.0,
            solar_flux_index: 150.0,
            geomagnetic_index: 4.0,
        }
    }

    #[test]
    fn test_failing_backend_fails_exactly_once() {
        let backend = FailingBackend::new(2, FailureMode::Error);
        assert!(backend.query(&query()).is_ok());
        assert!(backend.query(&query()).is_err());
        assert!(backend.query(&query()).is_ok());
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn test_failing_backend_invalid_values_fail_validation() {
        let backend = FailingBackend::new(1, FailureMode::NegativeDensity);
        let sample = backend.query(&query()).unwrap();
        assert!(sample.validate().is_err());

        let backend = FailingBackend::new(1, FailureMode::NonFinite);
        let sample = backend.query(&query()).unwrap();
        assert!(sample.validate().is_err());
    }

    #[test]
    fn test_altitude_failing_backend_keys_on_altitude() {
        let backend = AltitudeFailingBackend::new(400000.0);
        assert!(backend.query(&query()).is_err());
        let other = PointQuery {
            altitude_m: 300000.0,
            ..query()
        };
        assert!(backend.query(&other).is_ok());
    }

    #[test]
    fn test_counting_backend() {
        let backend = CountingBackend::new(EchoBackend);
        backend.query(&query()).unwrap();
        backend.query(&query()).unwrap();
        assert_eq!(backend.calls(), 2);
    }
}
