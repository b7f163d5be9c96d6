//! Single-writer online aggregation of trial results.
//!
//! Results arrive concurrently from worker threads, but the running
//! statistics have exactly one owner: a dedicated aggregator thread that
//! drains a single-consumer channel. Workers only ever hold a
//! [`ResultSink`] (the sending half), so no two threads can update the
//! accumulator at once.
//!
//! ```text
//!  worker 0 ──┐
//!  worker 1 ──┼── ResultSink ──► mpsc ──► aggregator thread ──► RunningStats
//!  worker N ──┘                           (sole owner)          values, failures
//! ```
//!
//! Failed results are skipped by the statistics and counted separately.

use crate::error::EngineError;
use crate::report::{FailureSummary, QoIResult, TrialValue};
use ensemble_core::RunningStats;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Accumulated state of a batch's results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OnlineAggregator {
    stats: RunningStats,
    values: Vec<TrialValue>,
    failures: FailureSummary,
}

impl OnlineAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one result in.
    ///
    /// Successes update the running statistics with Welford's rule;
    /// failures are tallied and do not touch the statistics.
    pub fn update(&mut self, result: QoIResult) {
        let trial_id = result.trial_id();
        match (result.value(), result.error()) {
            (Some(value), _) => {
                self.stats.push(value);
                self.values.push(TrialValue { trial_id, value });
            }
            (None, Some(error)) => {
                warn!(trial = trial_id, kind = %error.kind(), error = %error, "Trial failed");
                self.failures.record(trial_id, error.clone());
            }
            (None, None) => {}
        }
    }

    /// Running statistics over successful trials so far.
    #[inline]
    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    /// Successful values in arrival order.
    #[inline]
    pub fn values(&self) -> &[TrialValue] {
        &self.values
    }

    /// Failures so far.
    #[inline]
    pub fn failures(&self) -> &FailureSummary {
        &self.failures
    }

    /// Number of results observed, successful or not.
    pub fn observed(&self) -> usize {
        self.values.len() + self.failures.total
    }

    /// Consumes the aggregator, returning its parts with values and
    /// failures sorted by trial id.
    pub fn into_parts(mut self) -> (RunningStats, Vec<TrialValue>, FailureSummary) {
        self.values.sort_by_key(|v| v.trial_id);
        self.failures.sort_by_trial();
        (self.stats, self.values, self.failures)
    }

    /// Starts an aggregator on its own thread.
    ///
    /// # Errors
    ///
    /// [`EngineError::WorkerPool`] if the thread cannot be spawned.
    pub fn spawn() -> Result<AggregatorHandle, EngineError> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("ensemble-aggregator".to_string())
            .spawn(move || Self::drain(rx))
            .map_err(|e| EngineError::WorkerPool(format!("Failed to spawn aggregator: {e}")))?;

        Ok(AggregatorHandle { tx, thread })
    }

    fn drain(rx: Receiver<AggregatorMessage>) -> Self {
        let mut aggregator = Self::new();
        while let Ok(message) = rx.recv() {
            match message {
                AggregatorMessage::Record(result) => aggregator.update(result),
                AggregatorMessage::Finish => break,
            }
        }
        debug!(
            succeeded = aggregator.values.len(),
            failed = aggregator.failures.total,
            "Aggregator finished"
        );
        aggregator
    }
}

#[derive(Debug)]
enum AggregatorMessage {
    Record(QoIResult),
    Finish,
}

/// Sending half of the aggregator channel.
#[derive(Clone, Debug)]
pub struct ResultSink {
    tx: Sender<AggregatorMessage>,
}

impl ResultSink {
    /// Publishes one result. Returns `false` if the aggregator has stopped.
    pub fn publish(&self, result: QoIResult) -> bool {
        self.tx.send(AggregatorMessage::Record(result)).is_ok()
    }
}

/// Owner's handle to a running aggregator thread.
#[derive(Debug)]
pub struct AggregatorHandle {
    tx: Sender<AggregatorMessage>,
    thread: JoinHandle<OnlineAggregator>,
}

impl AggregatorHandle {
    /// A sink for workers to publish into.
    pub fn sink(&self) -> ResultSink {
        ResultSink {
            tx: self.tx.clone(),
        }
    }

    /// Stops the aggregator and returns its final state.
    ///
    /// Every result published before this call is included.
    ///
    /// # Errors
    ///
    /// [`EngineError::AggregatorLost`] if the aggregator thread panicked.
    pub fn finish(self) -> Result<OnlineAggregator, EngineError> {
        // Send fails only if the thread is gone, which join reports.
        let _ = self.tx.send(AggregatorMessage::Finish);
        self.thread.join().map_err(|_| EngineError::AggregatorLost)
    }
}
