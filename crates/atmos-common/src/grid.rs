//! Time × altitude sampling grid.
//!
//! The enumeration order is part of the output contract: the outer loop walks
//! time from `start` to `end` inclusive in `step_seconds` increments, the inner
//! loop walks `altitudes_m` in configured order. Consumers rely on all
//! altitudes of one timestamp being contiguous.

use chrono::{DateTime, Duration, Utc};

use crate::config::RunConfig;
use crate::error::ConfigError;

/// A single (timestamp, altitude) coordinate to evaluate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Position in enumeration order
    pub index: usize,
    pub time: DateTime<Utc>,
    pub altitude_m: f64,
}

/// The sampling grid derived from a [`RunConfig`].
///
/// Cheap to copy; iterating never mutates it, so the sequence can be walked
/// any number of times and always yields the same points.
#[derive(Debug, Clone, Copy)]
pub struct ProfileGrid<'a> {
    config: &'a RunConfig,
    time_steps: usize,
}

impl<'a> ProfileGrid<'a> {
    /// Build the grid for a configuration.
    ///
    /// `end < start` gives an empty grid. A non-positive step is rejected
    /// since it would never reach `end`.
    pub fn new(config: &'a RunConfig) -> Result<Self, ConfigError> {
        if config.step_seconds <= 0 {
            return Err(ConfigError::NonPositiveStep(config.step_seconds));
        }

        let time_steps = if config.end < config.start {
            0
        } else {
            let span = (config.end - config.start).num_seconds();
            (span / config.step_seconds) as usize + 1
        };

        Ok(Self { config, time_steps })
    }

    pub fn config(&self) -> &'a RunConfig {
        self.config
    }

    /// Number of distinct timestamps.
    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.time_steps * self.config.altitudes_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of the `step`-th time slice.
    pub fn time_at(&self, step: usize) -> DateTime<Utc> {
        self.config.start + Duration::seconds(step as i64 * self.config.step_seconds)
    }

    /// Last timestamp actually sampled (may be before `end` when the span is
    /// not a multiple of the step).
    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.time_steps.checked_sub(1).map(|s| self.time_at(s))
    }

    /// Grid point at a flat index.
    pub fn point(&self, index: usize) -> Option<GridPoint> {
        if index >= self.len() {
            return None;
        }
        let n_alt = self.config.altitudes_m.len();
        Some(GridPoint {
            index,
            time: self.time_at(index / n_alt),
            altitude_m: self.config.altitudes_m[index % n_alt],
        })
    }

    /// Iterate over all points in time-major, altitude-minor order.
    pub fn iter(&self) -> GridIter<'a> {
        GridIter {
            grid: *self,
            next: 0,
            end: self.len(),
        }
    }
}

impl<'a> IntoIterator for &ProfileGrid<'a> {
    type Item = GridPoint;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the points of a [`ProfileGrid`].
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    grid: ProfileGrid<'a>,
    next: usize,
    end: usize,
}

impl Iterator for GridIter<'_> {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.next >= self.end {
            return None;
        }
        let point = self.grid.point(self.next);
        self.next += 1;
        point
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}
