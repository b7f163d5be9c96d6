//! Relative error of an ensemble estimate against a reference value.

use serde::Serialize;
use thiserror::Error;

/// Errors from [`relative_error`].
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
pub enum ComparisonError {
    /// The reference value is exactly zero, so the relative error is undefined.
    #[error("Division by zero: reference value is 0 (estimate = {estimate})")]
    DivisionByZero {
        /// The estimate being compared.
        estimate: f64,
    },

    /// Either operand is NaN or infinite.
    #[error("Non-finite operand: estimate = {estimate}, reference = {reference}")]
    NonFinite {
        /// The estimate being compared.
        estimate: f64,
        /// The reference value.
        reference: f64,
    },

    /// No trial succeeded, so there is no estimate to compare.
    #[error("No successful trials: the ensemble estimate is undefined")]
    EmptyEstimate,
}

/// Computes `|estimate - reference| / |reference|`.
///
/// # Errors
///
/// - [`ComparisonError::DivisionByZero`] when `reference == 0.0` (either sign)
/// - [`ComparisonError::NonFinite`] when an operand is NaN or infinite
///
/// # Examples
///
/// ```rust
/// use ensemble_core::compare::{relative_error, ComparisonError};
///
/// let err = relative_error(0.45, 0.50).unwrap();
/// assert!((err - 0.10).abs() < 1e-12);
///
/// assert!(matches!(
///     relative_error(0.45, 0.0),
///     Err(ComparisonError::DivisionByZero { .. })
/// ));
/// ```
pub fn relative_error(estimate: f64, reference: f64) -> Result<f64, ComparisonError> {
    if !estimate.is_finite() || !reference.is_finite() {
        return Err(ComparisonError::NonFinite {
            estimate,
            reference,
        });
    }
    if reference == 0.0 {
        return Err(ComparisonError::DivisionByZero { estimate });
    }
    Ok(((estimate - reference) / reference).abs())
}
