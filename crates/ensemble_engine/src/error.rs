//! Error taxonomy for the ensemble engine.
//!
//! Errors fall into two groups:
//!
//! - **Batch-fatal** ([`EngineError`]): shared setup failed (snapshot
//!   capture, configuration, worker pool) or a fail-fast sampling policy
//!   tripped. No trial result is produced.
//! - **Trial-local** ([`TrialError`]): one trial failed. It is recorded as a
//!   failed result, counted by [`TrialErrorKind`], and the batch continues.

use crate::config::ConfigError;
use ensemble_core::SamplingError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors capturing or materialising a state snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The baseline state is not ready to be captured.
    #[error("Baseline state is not initialised: {0}")]
    NotInitialised(String),

    /// Serialising the baseline state failed.
    #[error("Failed to serialise baseline state: {0}")]
    Serialise(#[source] serde_json::Error),

    /// The serialised baseline does not restore to the same state.
    #[error("Baseline state does not survive serialisation: {0}")]
    NotRestorable(String),

    /// Deserialising a clone from the snapshot failed.
    #[error("Failed to materialise state from snapshot: {0}")]
    Deserialise(#[source] serde_json::Error),
}

/// Errors injecting a sample into a materialised state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OverrideError {
    /// The sample lacks a component the state needs.
    #[error("Sample has no component named '{0}'")]
    MissingParameter(String),

    /// The configuration location to override does not exist.
    #[error("Override target not found: {0}")]
    MissingTarget(String),

    /// The state's configuration has an unexpected shape.
    #[error("Malformed state configuration: {0}")]
    Malformed(String),
}

/// Errors reported by a [`SimulationRunner`](crate::runner::SimulationRunner).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunnerError {
    /// The simulation raised an error.
    #[error("Simulation failed: {0}")]
    Failed(String),

    /// The simulation did not converge.
    #[error("Simulation diverged: {0}")]
    Diverged(String),

    /// A pipeline stage failed a check or its execution.
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed {
        /// Stage name.
        stage: String,
        /// Description of the failure.
        reason: String,
    },

    /// The runner observed cancellation and stopped early.
    #[error("Simulation cancelled")]
    Cancelled,
}

/// Failure of a single trial.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TrialError {
    /// The trial's sample violated a parameter domain.
    #[error("Domain violation: {0}")]
    DomainViolation(String),

    /// The trial's state could not be materialised from the snapshot.
    #[error("Snapshot materialisation failed: {0}")]
    Snapshot(String),

    /// The sample could not be applied to the trial's state.
    #[error("Override failed: {0}")]
    Override(String),

    /// The simulation raised an error, diverged, or panicked.
    #[error("Runner failure: {0}")]
    RunnerFailure(String),

    /// The trial exceeded its time budget.
    #[error("Trial exceeded its time budget of {limit_ms} ms")]
    Timeout {
        /// The per-trial limit in milliseconds.
        limit_ms: u64,
    },

    /// The trial was cancelled before it produced a value.
    #[error("Trial cancelled")]
    Cancelled,
}

impl TrialError {
    /// Category used for failure tallies.
    pub fn kind(&self) -> TrialErrorKind {
        match self {
            Self::DomainViolation(_) => TrialErrorKind::DomainViolation,
            Self::Snapshot(_) => TrialErrorKind::Snapshot,
            Self::Override(_) => TrialErrorKind::Override,
            Self::RunnerFailure(_) => TrialErrorKind::RunnerFailure,
            Self::Timeout { .. } => TrialErrorKind::Timeout,
            Self::Cancelled => TrialErrorKind::Cancelled,
        }
    }
}

impl From<RunnerError> for TrialError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Cancelled => Self::Cancelled,
            other => Self::RunnerFailure(other.to_string()),
        }
    }
}

impl From<SamplingError> for TrialError {
    fn from(err: SamplingError) -> Self {
        Self::DomainViolation(err.to_string())
    }
}

/// Category of a [`TrialError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialErrorKind {
    /// See [`TrialError::DomainViolation`].
    DomainViolation,
    /// See [`TrialError::Snapshot`].
    Snapshot,
    /// See [`TrialError::Override`].
    Override,
    /// See [`TrialError::RunnerFailure`].
    RunnerFailure,
    /// See [`TrialError::Timeout`].
    Timeout,
    /// See [`TrialError::Cancelled`].
    Cancelled,
}

impl fmt::Display for TrialErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DomainViolation => "domain_violation",
            Self::Snapshot => "snapshot",
            Self::Override => "override",
            Self::RunnerFailure => "runner_failure",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The baseline state could not be captured.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Sampler misconfiguration, or a domain violation under a fail-fast policy.
    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    /// Invalid batch configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker pool could not be built.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The aggregator thread terminated abnormally.
    #[error("Aggregator terminated before the batch was collected")]
    AggregatorLost,
}
