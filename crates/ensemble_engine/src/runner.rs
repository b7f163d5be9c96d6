//! Simulation runner seam.
//!
//! The engine treats the simulation as a black box: it hands a runner one
//! trial-owned state and gets back a single scalar quantity of interest.
//! Anything implementing [`SimulationRunner`] can be swapped in without
//! touching dispatch or aggregation.

use crate::error::RunnerError;
use crate::report::TrialId;
use ensemble_core::Sample;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a trial and its handle.
///
/// Cancelling never interrupts a runner; long-running runners should poll
/// [`CancellationToken::is_cancelled`] (or [`TrialContext::check_cancelled`])
/// at convenient points and return [`RunnerError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Per-trial information passed to a runner alongside its state.
#[derive(Clone, Debug)]
pub struct TrialContext {
    trial_id: TrialId,
    sample: Sample,
    token: CancellationToken,
}

impl TrialContext {
    /// Creates a context for `trial_id`.
    pub fn new(trial_id: TrialId, sample: Sample, token: CancellationToken) -> Self {
        Self {
            trial_id,
            sample,
            token,
        }
    }

    /// Identifier of the trial being run.
    #[inline]
    pub fn trial_id(&self) -> TrialId {
        self.trial_id
    }

    /// The sample already applied to the state.
    #[inline]
    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// The trial's cancellation token.
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` if the trial has been cancelled or timed out.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns [`RunnerError::Cancelled`] if the trial has been cancelled.
    #[inline]
    pub fn check_cancelled(&self) -> Result<(), RunnerError> {
        if self.is_cancelled() {
            Err(RunnerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Executes one trial and extracts its quantity of interest.
///
/// Implementations must not touch state outside `state`, and must be
/// deterministic for an identical `state`. Runners are shared across worker
/// threads, hence `Send + Sync`.
pub trait SimulationRunner<S>: Send + Sync {
    /// Runs the simulation on a trial-owned `state`.
    fn run(&self, state: S, ctx: &TrialContext) -> Result<f64, RunnerError>;
}

impl<S, R: SimulationRunner<S> + ?Sized> SimulationRunner<S> for Arc<R> {
    fn run(&self, state: S, ctx: &TrialContext) -> Result<f64, RunnerError> {
        (**self).run(state, ctx)
    }
}

/// Adapts a closure into a [`SimulationRunner`].
///
/// # Examples
///
/// ```rust
/// use ensemble_engine::runner::{runner_fn, SimulationRunner};
/// use ensemble_engine::flow_case::FlowCase;
///
/// let runner = runner_fn(|case: FlowCase, _ctx| Ok(case.model.node_count as f64));
/// # let _ = &runner;
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FnRunner<F>(F);

/// Wraps `f` as a runner.
pub fn runner_fn<S, F>(f: F) -> FnRunner<F>
where
    F: Fn(S, &TrialContext) -> Result<f64, RunnerError> + Send + Sync,
{
    FnRunner(f)
}

impl<S, F> SimulationRunner<S> for FnRunner<F>
where
    F: Fn(S, &TrialContext) -> Result<f64, RunnerError> + Send + Sync,
{
    fn run(&self, state: S, ctx: &TrialContext) -> Result<f64, RunnerError> {
        (self.0)(state, ctx)
    }
}
