//! End-to-end run: configuration to table on disk.

use std::path::PathBuf;

use tracing::info;

use atmos_common::{ProfileGrid, ProfileResult, RunConfig};
use atmos_model::AtmosphereBackend;

use crate::config::{ConfigResolver, RawConfig};
use crate::sampler::{BatchSampler, Parallelism, ProgressLogger};

/// Knobs that affect how a run executes but never what it produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub parallelism: Parallelism,
    /// Log a progress line every N samples
    pub progress_every: Option<usize>,
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub backend: &'static str,
    pub rows: usize,
    pub time_steps: usize,
    pub altitudes: usize,
    pub output_path: PathBuf,
}

/// Sample the grid described by `config` and write the table.
///
/// The grid is validated before the backend sees a single query, and the
/// table is only written once every point has produced a valid sample. Any
/// failure leaves the destination path untouched.
pub fn run(
    config: &RunConfig,
    backend: &dyn AtmosphereBackend,
    options: &RunOptions,
) -> ProfileResult<RunSummary> {
    let grid = ProfileGrid::new(config)?;
    let (min_altitude_m, max_altitude_m) = config.altitude_range().unwrap_or((0.0, 0.0));

    info!(
        backend = backend.name(),
        start = %config.start,
        end = %config.end,
        step_seconds = config.step_seconds,
        time_steps = grid.time_steps(),
        altitudes = config.altitude_count(),
        min_altitude_m = min_altitude_m,
        max_altitude_m = max_altitude_m,
        output = %config.output_path.display(),
        "Starting profile run"
    );

    let mut progress = ProgressLogger::new(options.progress_every);
    let samples = BatchSampler::new(backend)
        .with_parallelism(options.parallelism)
        .run_observed(&grid, &mut progress)?;

    let rows = profile_table::write_table(&config.output_path, &samples)?;

    Ok(RunSummary {
        backend: backend.name(),
        rows,
        time_steps: grid.time_steps(),
        altitudes: config.altitude_count(),
        output_path: config.output_path.clone(),
    })
}

/// Resolve `overrides` over the built-in defaults and run serially.
///
/// Convenience for embedding callers that never have a command line.
pub fn run_with_overrides(
    overrides: &RawConfig,
    backend: &dyn AtmosphereBackend,
) -> ProfileResult<RunSummary> {
    let config = ConfigResolver::new().resolve(overrides, &[] as &[&str])?;
    run(&config, backend, &RunOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmos_common::ProfileError;
    use atmos_model::StubBackend;
    use test_utils::backends::{FailingBackend, FailureMode};
    use test_utils::fixtures::{half_hour_config, output_in, temp_dir};

    #[test]
    fn test_summary_counts() {
        let dir = temp_dir();
        let config = half_hour_config(output_in(dir.path(), "out.csv"));

        let summary = run(&config, &StubBackend::new(), &RunOptions::default()).unwrap();
        assert_eq!(summary.backend, "stub");
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.time_steps, 3);
        assert_eq!(summary.altitudes, 1);
        assert!(summary.output_path.exists());
    }

    #[test]
    fn test_zero_step_rejected_before_sampling() {
        let dir = temp_dir();
        let mut config = half_hour_config(output_in(dir.path(), "out.csv"));
        config.step_seconds = 0;
        let backend = FailingBackend::new(1, FailureMode::Error);

        let err = run(&config, &backend, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, ProfileError::Config(_)));
        assert_eq!(backend.calls(), 0);
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_run_with_overrides() {
        let dir = temp_dir();
        let output = output_in(dir.path(), "nested/custom_output.csv");
        let overrides = RawConfig::from_pairs([
            ("start", "2025-08-17T00:00:00".to_string()),
            ("end", "2025-08-17T12:00:00".to_string()),
            ("altitudes_m", "300000,400000,500000".to_string()),
            ("output_path", output.display().to_string()),
        ])
        .unwrap();

        let summary = run_with_overrides(&overrides, &StubBackend::new()).unwrap();
        // 12 h at the default 60 s step: 721 timestamps
        assert_eq!(summary.time_steps, 721);
        assert_eq!(summary.rows, 721 * 3);
        assert!(output.exists());
    }
}
