//! Trial results and the batch report.

use crate::error::{TrialError, TrialErrorKind};
use ensemble_core::{ComparisonError, RunningStats, Sample};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Identifier of one trial within a batch (`0..n_trials`).
pub type TrialId = usize;

/// Outcome of one trial: a finite scalar value or the reason it failed.
///
/// Exactly one of [`value`](Self::value) and [`error`](Self::error) is set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QoIResult {
    trial_id: TrialId,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<TrialError>,
}

impl QoIResult {
    /// Wraps a trial outcome.
    ///
    /// A NaN or infinite value is a diverged run and becomes
    /// [`TrialError::RunnerFailure`].
    pub fn new(trial_id: TrialId, outcome: Result<f64, TrialError>) -> Self {
        match outcome {
            Ok(value) if value.is_finite() => Self::success(trial_id, value),
            Ok(value) => Self::failure(
                trial_id,
                TrialError::RunnerFailure(format!("non-finite quantity of interest: {value}")),
            ),
            Err(error) => Self::failure(trial_id, error),
        }
    }

    fn success(trial_id: TrialId, value: f64) -> Self {
        Self {
            trial_id,
            value: Some(value),
            error: None,
        }
    }

    /// A failed result.
    pub fn failure(trial_id: TrialId, error: TrialError) -> Self {
        Self {
            trial_id,
            value: None,
            error: Some(error),
        }
    }

    /// The trial this result belongs to.
    #[inline]
    pub fn trial_id(&self) -> TrialId {
        self.trial_id
    }

    /// The quantity of interest, if the trial succeeded.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// The failure, if the trial failed.
    #[inline]
    pub fn error(&self) -> Option<&TrialError> {
        self.error.as_ref()
    }

    /// Returns `true` if the trial produced a value.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }
}

/// A successful trial's value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrialValue {
    /// Trial identifier.
    pub trial_id: TrialId,
    /// Quantity of interest.
    pub value: f64,
}

/// A failed trial and its reason.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialFailure {
    /// Trial identifier.
    pub trial_id: TrialId,
    /// Why it failed.
    pub error: TrialError,
}

/// Tally of failed trials.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FailureSummary {
    /// Number of failed trials.
    pub total: usize,
    /// Failures per category.
    pub by_kind: BTreeMap<TrialErrorKind, usize>,
    /// Every failed trial.
    pub trials: Vec<TrialFailure>,
}

impl FailureSummary {
    /// Records one failed trial.
    pub fn record(&mut self, trial_id: TrialId, error: TrialError) {
        self.total += 1;
        *self.by_kind.entry(error.kind()).or_insert(0) += 1;
        self.trials.push(TrialFailure { trial_id, error });
    }

    /// Number of failures of `kind`.
    pub fn count(&self, kind: TrialErrorKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Returns `true` if no trial failed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub(crate) fn sort_by_trial(&mut self) {
        self.trials.sort_by_key(|f| f.trial_id);
    }
}

/// Derived statistics, as reported.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatisticsSummary {
    /// Number of values aggregated.
    pub count: u64,
    /// Mean; absent when no trial succeeded.
    pub mean: Option<f64>,
    /// Unbiased sample variance; absent for fewer than two values.
    pub variance: Option<f64>,
    /// Sample standard deviation.
    pub std_dev: Option<f64>,
    /// Standard error of the mean.
    pub std_error: Option<f64>,
}

impl From<&RunningStats> for StatisticsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            mean: (!stats.is_empty()).then(|| stats.mean()),
            variance: stats.variance(),
            std_dev: stats.std_dev(),
            std_error: stats.std_error(),
        }
    }
}

/// The deterministic reference trial and its comparison with the estimate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReferenceReport {
    /// The fixed sample the reference ran at.
    pub sample: Sample,
    /// The reference trial's result.
    pub outcome: QoIResult,
    /// `|mean - reference| / |reference|`; absent when the reference
    /// trial itself failed.
    pub relative_error: Option<Result<f64, ComparisonError>>,
}

/// Final output of a batch, handed to the reporting collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchReport {
    /// Number of trials dispatched.
    pub trials_requested: usize,
    /// Sampler seed actually used; replaying with it reproduces the samples.
    pub seed: u64,
    /// Statistics over the successful trials.
    #[serde(serialize_with = "serialize_summary")]
    pub statistics: RunningStats,
    /// Successful values, in trial order.
    pub values: Vec<TrialValue>,
    /// Failed trials.
    pub failures: FailureSummary,
    /// Reference comparison, if a reference sample was configured.
    pub reference: Option<ReferenceReport>,
    /// Wall-clock time from dispatch to join, in nanoseconds.
    pub elapsed_ns: u64,
    /// Runner threads of timed-out or cancelled trials still running at join.
    pub detached_runners: usize,
}

impl BatchReport {
    /// Number of successful trials.
    #[inline]
    pub fn succeeded(&self) -> usize {
        self.values.len()
    }

    /// Number of failed trials.
    #[inline]
    pub fn failed(&self) -> usize {
        self.failures.total
    }

    /// Successful values without their trial ids.
    pub fn raw_values(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.value).collect()
    }

    /// Derived statistics.
    pub fn summary(&self) -> StatisticsSummary {
        StatisticsSummary::from(&self.statistics)
    }

    /// Relative error against the reference, if it could be computed.
    pub fn relative_error(&self) -> Option<f64> {
        match self.reference.as_ref()?.relative_error {
            Some(Ok(err)) => Some(err),
            _ => None,
        }
    }
}

fn serialize_summary<S: Serializer>(stats: &RunningStats, serializer: S) -> Result<S::Ok, S::Error> {
    StatisticsSummary::from(stats).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_finite_value_is_failure() {
        let result = QoIResult::new(4, Ok(f64::NAN));
        assert!(!result.is_success());
        assert_eq!(
            result.error().map(TrialError::kind),
            Some(TrialErrorKind::RunnerFailure)
        );

        let result = QoIResult::new(5, Ok(f64::NEG_INFINITY));
        assert!(result.value().is_none());
    }

    #[test]
    fn test_failure_summary_counts() {
        let mut failures = FailureSummary::default();
        failures.record(7, TrialError::Timeout { limit_ms: 10 });
        failures.record(2, TrialError::RunnerFailure("boom".to_string()));
        failures.record(5, TrialError::RunnerFailure("bang".to_string()));
        failures.sort_by_trial();

        assert_eq!(failures.total, 3);
        assert_eq!(failures.count(TrialErrorKind::RunnerFailure), 2);
        assert_eq!(failures.count(TrialErrorKind::Cancelled), 0);
        let ids: Vec<_> = failures.trials.iter().map(|f| f.trial_id).collect();
        assert_eq!(ids, vec![2, 5, 7]);
    }

    #[test]
    fn test_summary_of_empty_stats() {
        let summary = StatisticsSummary::from(&RunningStats::new());
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.variance, None);
    }

    #[test]
    fn test_report_json_shape() {
        let mut failures = FailureSummary::default();
        failures.record(1, TrialError::Cancelled);

        let report = BatchReport {
            trials_requested: 3,
            seed: 42,
            statistics: [1.0, 3.0].into_iter().collect(),
            values: vec![
                TrialValue { trial_id: 0, value: 1.0 },
                TrialValue { trial_id: 2, value: 3.0 },
            ],
            failures,
            reference: None,
            elapsed_ns: 1_000,
            detached_runners: 0,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["seed"], json!(42));
        assert_eq!(json["detached_runners"], json!(0));
        assert_eq!(json["statistics"]["count"], json!(2));
        assert_eq!(json["statistics"]["mean"], json!(2.0));
        assert_eq!(json["statistics"]["variance"], json!(2.0));
        assert_eq!(json["failures"]["by_kind"]["cancelled"], json!(1));
        assert_eq!(json["failures"]["trials"][0]["error"]["kind"], json!("cancelled"));
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.raw_values(), vec![1.0, 3.0]);
    }
}
