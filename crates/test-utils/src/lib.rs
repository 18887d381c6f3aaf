//! Shared test utilities for the stormcast-data workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Temporary dataset directories
//! - Time axis, coordinate and data cube generators
//! - Common test fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, hourly_times};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

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

/// Macro for element-wise relative equality of two arrays (or any two
/// iterables of floats) of the same length.
///
/// Each pair must satisfy `|left - right| <= rel * max(|right|, 1)`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_all_close;
///
/// assert_all_close!(restored.iter(), original.iter(), 1e-6);
/// ```
#[macro_export]
macro_rules! assert_all_close {
    ($left:expr, $right:expr, $rel:expr) => {{
        let left: Vec<f64> = $left.into_iter().map(|v| *v as f64).collect();
        let right: Vec<f64> = $right.into_iter().map(|v| *v as f64).collect();
        let rel: f64 = $rel as f64;
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let tol = rel * r.abs().max(1.0);
            if (l - r).abs() > tol {
                panic!(
                    "assertion failed: element {} differs\n  left: `{:?}`,\n right: `{:?}`,\n   tol: `{:?}`",
                    i, l, r, tol
                );
            }
        }
    }};
}
