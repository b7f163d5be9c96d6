//! The join barrier.

use crate::aggregator::AggregatorHandle;
use crate::dispatch::TrialHandle;
use crate::error::EngineError;
use crate::report::{FailureSummary, QoIResult, TrialValue};
use ensemble_core::RunningStats;
use tracing::debug;

/// Finalised results of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Collected {
    /// Statistics over successful trials.
    pub stats: RunningStats,
    /// Successful values, sorted by trial id.
    pub values: Vec<TrialValue>,
    /// Failed trials, sorted by trial id.
    pub failures: FailureSummary,
    /// The reference trial's result, if one was dispatched.
    pub reference: Option<QoIResult>,
}

/// Waits for every outstanding trial and finalises the aggregate.
pub struct ResultCollector;

impl ResultCollector {
    /// Blocks until every trial in `handles` and the optional `reference`
    /// trial has resolved, then stops the aggregator and returns the
    /// finalised statistics with the raw per-trial values.
    ///
    /// This is the only point at which the orchestrator waits on trials.
    ///
    /// # Errors
    ///
    /// [`EngineError::AggregatorLost`] if the aggregator thread died.
    pub fn join(
        handles: &[TrialHandle],
        reference: Option<&TrialHandle>,
        aggregator: AggregatorHandle,
    ) -> Result<Collected, EngineError> {
        for handle in handles {
            handle.wait();
        }
        let reference = reference.map(TrialHandle::wait);
        debug!(trials = handles.len(), "All trials resolved");

        // Every result was published before its handle resolved.
        let (stats, values, failures) = aggregator.finish()?.into_parts();

        Ok(Collected {
            stats,
            values,
            failures,
            reference,
        })
    }
}
