//! Grid sampling.
//!
//! [`BatchSampler`] walks a [`ProfileGrid`] and asks the backend for one
//! sample per point. Every returned sample is validated before it is kept;
//! the first failure aborts the whole batch. A partial result is never
//! returned.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use atmos_common::{AtmosphericSample, GridPoint, ProfileGrid, RunConfig, SamplingError};
use atmos_model::{AtmosphereBackend, PointQuery};

/// Progress hooks invoked while a batch runs.
///
/// Samples are reported in grid order in both serial and parallel mode.
pub trait SampleObserver {
    fn on_start(&mut self, _total: usize) {}

    fn on_sample(&mut self, _point: &GridPoint, _sample: &AtmosphericSample) {}

    fn on_finish(&mut self, _produced: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SampleObserver for NoopObserver {}

/// Logs progress through `tracing`.
#[derive(Debug)]
pub struct ProgressLogger {
    every: Option<usize>,
    total: usize,
    started: Option<Instant>,
}

impl ProgressLogger {
    /// `every`: log a line after this many samples. `None` logs only the
    /// start and the end of the batch.
    pub fn new(every: Option<usize>) -> Self {
        Self {
            every: every.filter(|n| *n > 0),
            total: 0,
            started: None,
        }
    }
}

impl SampleObserver for ProgressLogger {
    fn on_start(&mut self, total: usize) {
        self.total = total;
        self.started = Some(Instant::now());
        info!(total_points = total, "Sampling grid");
    }

    fn on_sample(&mut self, point: &GridPoint, _sample: &AtmosphericSample) {
        let done = point.index + 1;
        if let Some(every) = self.every {
            if done % every == 0 && done < self.total {
                info!(
                    done = done,
                    total = self.total,
                    time = %point.time,
                    "Sampling progress"
                );
            }
        }
    }

    fn on_finish(&mut self, produced: usize) {
        let elapsed_ms = self
            .started
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0);
        info!(samples = produced, elapsed_ms = elapsed_ms, "Sampling complete");
    }
}

/// How grid points are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// One point at a time, stopping at the first failure
    #[default]
    Serial,
    /// Points evaluated on the rayon pool, results reassembled in grid order
    Rayon,
}

/// Evaluates every point of a grid against one backend.
pub struct BatchSampler<'b> {
    backend: &'b dyn AtmosphereBackend,
    parallelism: Parallelism,
}

impl<'b> BatchSampler<'b> {
    pub fn new(backend: &'b dyn AtmosphereBackend) -> Self {
        Self {
            backend,
            parallelism: Parallelism::Serial,
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Sample the whole grid.
    pub fn run(&self, grid: &ProfileGrid<'_>) -> Result<Vec<AtmosphericSample>, SamplingError> {
        self.run_observed(grid, &mut NoopObserver)
    }

    /// Sample the whole grid, reporting progress to `observer`.
    ///
    /// On success the result has exactly `grid.len()` samples, in grid order.
    /// On failure the error names the lowest-index point that failed.
    pub fn run_observed(
        &self,
        grid: &ProfileGrid<'_>,
        observer: &mut dyn SampleObserver,
    ) -> Result<Vec<AtmosphericSample>, SamplingError> {
        let total = grid.len();
        debug!(
            backend = self.backend.name(),
            parallelism = ?self.parallelism,
            time_steps = grid.time_steps(),
            altitudes = grid.config().altitude_count(),
            "Starting batch"
        );
        observer.on_start(total);

        let samples = match self.parallelism {
            Parallelism::Serial => self.run_serial(grid, observer)?,
            Parallelism::Rayon => self.run_parallel(grid, observer)?,
        };

        observer.on_finish(samples.len());
        Ok(samples)
    }

    fn run_serial(
        &self,
        grid: &ProfileGrid<'_>,
        observer: &mut dyn SampleObserver,
    ) -> Result<Vec<AtmosphericSample>, SamplingError> {
        let config = grid.config();
        let mut samples = Vec::with_capacity(grid.len());
        for point in grid {
            let sample = sample_point(self.backend, &point, config)?;
            observer.on_sample(&point, &sample);
            samples.push(sample);
        }
        Ok(samples)
    }

    fn run_parallel(
        &self,
        grid: &ProfileGrid<'_>,
        observer: &mut dyn SampleObserver,
    ) -> Result<Vec<AtmosphericSample>, SamplingError> {
        let config = grid.config();
        let backend = self.backend;
        let points: Vec<GridPoint> = grid.iter().collect();

        let results: Vec<Result<AtmosphericSample, SamplingError>> = points
            .par_iter()
            .map(|point| sample_point(backend, point, config))
            .collect();

        let mut samples = Vec::with_capacity(results.len());
        for (point, result) in points.iter().zip(results) {
            let sample = result?;
            observer.on_sample(point, &sample);
            samples.push(sample);
        }
        Ok(samples)
    }
}

/// Query and validate one point.
fn sample_point(
    backend: &dyn AtmosphereBackend,
    point: &GridPoint,
    config: &RunConfig,
) -> Result<AtmosphericSample, SamplingError> {
    let query = PointQuery::at(point, config);
    backend
        .query(&query)
        .and_then(|sample| sample.validate().map(|_| sample))
        .map_err(|source| {
            warn!(
                backend = backend.name(),
                index = point.index,
                time = %point.time,
                altitude_m = point.altitude_m,
                error = %source,
                "Sampling failed"
            );
            SamplingError {
                index: point.index,
                time: point.time,
                altitude_m: point.altitude_m,
                source,
            }
        })
}
