//! The deterministic reference trial.
//!
//! One extra trial runs at a fixed, non-random sample alongside the batch.
//! Its value is compared against the ensemble mean once everything has
//! joined. It never feeds the running statistics.

use crate::dispatch::{Dispatcher, TrialHandle};
use crate::report::{QoIResult, ReferenceReport, TrialId};
use crate::runner::SimulationRunner;
use crate::snapshot::TrialState;
use ensemble_core::{relative_error, ComparisonError, RunningStats, Sample, SampleGenerator, SamplingError};
use tracing::warn;

/// A fixed sample to run as the reference.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceTrial {
    sample: Sample,
}

impl ReferenceTrial {
    /// Validates `values` against the generator's parameters.
    ///
    /// # Errors
    ///
    /// [`SamplingError::ArityMismatch`] or [`SamplingError::DomainViolation`].
    pub fn new(generator: &SampleGenerator, values: &[f64]) -> Result<Self, SamplingError> {
        Ok(Self {
            sample: generator.fixed(values)?,
        })
    }

    /// The fixed sample.
    #[inline]
    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// Dispatches the reference as `trial_id`, bypassing the aggregator.
    pub fn dispatch<S, R>(&self, dispatcher: &Dispatcher<S, R>, trial_id: TrialId) -> TrialHandle
    where
        S: TrialState,
        R: SimulationRunner<S> + 'static,
    {
        dispatcher.dispatch_one(trial_id, Ok(self.sample.clone()), None)
    }

    /// Compares the ensemble estimate with the reference `outcome`.
    pub fn report(self, stats: &RunningStats, outcome: QoIResult) -> ReferenceReport {
        let relative_error = compare(stats, &outcome);
        ReferenceReport {
            sample: self.sample,
            outcome,
            relative_error,
        }
    }
}

/// Relative error of the ensemble mean against the reference value.
///
/// `None` if the reference trial failed; an error if there is no estimate or
/// the reference value is zero.
pub fn compare(stats: &RunningStats, reference: &QoIResult) -> Option<Result<f64, ComparisonError>> {
    let Some(value) = reference.value() else {
        warn!(
            error = ?reference.error(),
            "Reference trial failed; relative error unavailable"
        );
        return None;
    };

    let comparison = if stats.is_empty() {
        Err(ComparisonError::EmptyEstimate)
    } else {
        relative_error(stats.mean(), value)
    };

    if let Err(err) = &comparison {
        warn!(error = %err, "Relative error against reference is undefined");
    }
    Some(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrialError;
    use approx::assert_relative_eq;
    use ensemble_core::SamplerConfig;

    fn stats(values: &[f64]) -> RunningStats {
        values.iter().copied().collect()
    }

    #[test]
    fn test_ten_percent_error() {
        let reference = QoIResult::new(10, Ok(0.50));
        let err = compare(&stats(&[0.40, 0.50]), &reference).unwrap().unwrap();
        assert_relative_eq!(err, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_reference() {
        let reference = QoIResult::new(10, Ok(0.0));
        assert_eq!(
            compare(&stats(&[0.45]), &reference),
            Some(Err(ComparisonError::DivisionByZero { estimate: 0.45 }))
        );
    }

    #[test]
    fn test_no_successful_trials() {
        let reference = QoIResult::new(10, Ok(0.5));
        assert_eq!(
            compare(&RunningStats::new(), &reference),
            Some(Err(ComparisonError::EmptyEstimate))
        );
    }

    #[test]
    fn test_failed_reference() {
        let reference = QoIResult::failure(10, TrialError::Timeout { limit_ms: 100 });
        assert_eq!(compare(&stats(&[0.45]), &reference), None);
    }

    #[test]
    fn test_reference_sample_validated() {
        let generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 0).unwrap();

        let trial = ReferenceTrial::new(&generator, &[0.7, 0.0]).unwrap();
        assert_eq!(trial.sample().values(), &[0.7, 0.0]);

        assert!(matches!(
            ReferenceTrial::new(&generator, &[1.0, 0.0]),
            Err(SamplingError::DomainViolation { .. })
        ));
        assert!(matches!(
            ReferenceTrial::new(&generator, &[0.7]),
            Err(SamplingError::ArityMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_report_keeps_sample() {
        let generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 0).unwrap();
        let trial = ReferenceTrial::new(&generator, &[0.7, 0.0]).unwrap();

        let report = trial.report(&stats(&[0.45, 0.45]), QoIResult::new(2, Ok(0.5)));
        assert_eq!(report.sample.get("mach_number"), Some(0.7));
        assert_relative_eq!(report.relative_error.unwrap().unwrap(), 0.1, epsilon = 1e-12);
    }
}
