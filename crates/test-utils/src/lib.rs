//! Shared test utilities for the vleo-atmos workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Run configuration fixtures for the documented scenarios
//! - Instrumented backends (call counting, scripted values, failure on the Nth call)
//! - Approximate float assertions
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{fixtures, FailingBackend};
//! ```

pub mod backends;
pub mod fixtures;

pub use backends::*;
pub use fixtures::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for relative floating-point equality, for magnitudes spanning many
/// orders (densities from 1e-12 kg/m³ to 1e14 m⁻³).
///
/// ```ignore
/// assert_rel_eq!(2.8e-12, 2.80001e-12, 1e-4);
/// ```
#[macro_export]
macro_rules! assert_rel_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let scale = left.abs().max(right.abs()).max(f64::MIN_POSITIVE);
        let rel = (left - right).abs() / scale;
        if rel > $tolerance as f64 {
            panic!(
                "assertion failed: `(left ≈ right)` relative\n  left: `{:?}`,\n right: `{:?}`,\n  rel diff: `{:?}`",
                left, right, rel
            );
        }
    }};
}
