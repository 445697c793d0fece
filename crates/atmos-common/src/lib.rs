//! Common types and utilities shared across the atmospheric profile crates.

pub mod config;
pub mod error;
pub mod grid;
pub mod sample;
pub mod time;

pub use config::RunConfig;
pub use error::{
    BackendError, BackendUnavailableError, ConfigError, ProfileError, ProfileResult,
    SamplingError, TableError,
};
pub use grid::{GridIter, GridPoint, ProfileGrid};
pub use sample::{AtmosphericSample, SpeciesDensities};
pub use time::{format_table_time, parse_iso8601, TimeParseError};
