//! Batch atmospheric profile sampling.
//!
//! # Architecture
//!
//! ```text
//! overrides / argv / defaults
//!      │
//!      ▼
//! ConfigResolver::resolve ──► RunConfig
//!      │
//!      ▼
//! ProfileGrid::new          (time-major, altitude-minor points)
//!      │
//!      ▼
//! BatchSampler::run ──► AtmosphereBackend::query, once per point
//!      │                  (stops at the first invalid point)
//!      ▼
//! profile_table::write_table  (temp file, renamed on success)
//! ```
//!
//! The backend is chosen by the caller before any of this starts; nothing in
//! the loop branches on which backend it is talking to.
//!
//! # Example
//!
//! ```ignore
//! use atmos_model::StubBackend;
//! use profile_sampler::{pipeline, ConfigResolver, RawConfig, RunOptions};
//!
//! let overrides = RawConfig::from_pairs([
//!     ("start", "2025-08-17T00:00:00"),
//!     ("end", "2025-08-17T12:00:00"),
//!     ("altitudes_m", "300000,400000,500000"),
//!     ("output_path", "data/custom_output.csv"),
//! ])?;
//! let config = ConfigResolver::new().resolve(&overrides, &[] as &[&str])?;
//! let summary = pipeline::run(&config, &StubBackend::new(), &RunOptions::default())?;
//! ```

pub mod config;
pub mod pipeline;
pub mod sampler;

pub use config::{ConfigResolver, ConfigSource, RawConfig, SampleArgs};
pub use pipeline::{run, run_with_overrides, RunOptions, RunSummary};
pub use sampler::{BatchSampler, NoopObserver, Parallelism, ProgressLogger, SampleObserver};
