//! Error types for stochastic sampling.

use thiserror::Error;

/// Errors raised while configuring a sampler or drawing samples.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SamplingError {
    /// A sampled component lies outside its declared physical domain.
    #[error("Domain violation: {parameter} = {value} is outside {domain}")]
    DomainViolation {
        /// Parameter name.
        parameter: String,
        /// Offending value.
        value: f64,
        /// Human-readable domain, e.g. `(0, 1)`.
        domain: String,
    },

    /// Distribution parameters are not usable (e.g. negative standard deviation).
    #[error("Invalid distribution for '{parameter}': {reason}")]
    InvalidDistribution {
        /// Parameter name.
        parameter: String,
        /// Description of the problem.
        reason: String,
    },

    /// A fixed sample does not have one value per configured parameter.
    #[error("Sample arity mismatch: expected {expected} values, found {found}")]
    ArityMismatch {
        /// Number of configured parameters.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },

    /// The sampler has no parameters.
    #[error("Sampler configuration has no parameters")]
    EmptyConfiguration,

    /// Two parameters share a name.
    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),
}

impl SamplingError {
    /// Returns `true` for [`SamplingError::DomainViolation`].
    #[inline]
    pub fn is_domain_violation(&self) -> bool {
        matches!(self, Self::DomainViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_violation_display() {
        let err = SamplingError::DomainViolation {
            parameter: "mach_number".to_string(),
            value: 1.2,
            domain: "(0, 1)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Domain violation: mach_number = 1.2 is outside (0, 1)"
        );
        assert!(err.is_domain_violation());
    }

    #[test]
    fn test_arity_mismatch_display() {
        let err = SamplingError::ArityMismatch {
            expected: 2,
            found: 3,
        };
        assert!(err.to_string().contains("expected 2"));
        assert!(!err.is_domain_violation());
    }
}
