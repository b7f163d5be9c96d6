//! Ordered pipeline of named simulation stages.
//!
//! A [`StagedRunner`] composes stages that each mutate the trial-owned state
//! in turn (for example a free-stream setup followed by the flow solve), then
//! extracts the quantity of interest. Every stage declares its own
//! preconditions and postconditions; a failure anywhere names the stage.
//!
//! ```text
//! state ─► [pre] stage 1 [post] ─► [pre] stage 2 [post] ─► ... ─► extract ─► QoI
//!            ▲                        ▲
//!            └─ cancellation checked before every stage
//! ```

use crate::error::RunnerError;
use crate::runner::{SimulationRunner, TrialContext};
use tracing::trace;

/// One named step of a [`StagedRunner`].
pub trait Stage<S>: Send + Sync {
    /// Stage name, used in failure reports.
    fn name(&self) -> &str;

    /// Checks that `state` is ready for this stage.
    fn check_preconditions(&self, _state: &S) -> Result<(), String> {
        Ok(())
    }

    /// Performs the stage on the trial-owned `state`.
    fn execute(&self, state: &mut S, ctx: &TrialContext) -> Result<(), RunnerError>;

    /// Checks what this stage guarantees to later stages.
    fn check_postconditions(&self, _state: &S) -> Result<(), String> {
        Ok(())
    }
}

type Extractor<S> = Box<dyn Fn(&S) -> Result<f64, RunnerError> + Send + Sync>;

/// Runs [`Stage`]s in insertion order, then extracts the QoI.
///
/// # Examples
///
/// ```rust
/// use ensemble_engine::error::RunnerError;
/// use ensemble_engine::pipeline::{Stage, StagedRunner};
/// use ensemble_engine::runner::TrialContext;
///
/// struct Double;
///
/// impl Stage<f64> for Double {
///     fn name(&self) -> &str {
///         "double"
///     }
///
///     fn execute(&self, state: &mut f64, _ctx: &TrialContext) -> Result<(), RunnerError> {
///         *state *= 2.0;
///         Ok(())
///     }
/// }
///
/// let runner = StagedRunner::new(|x: &f64| Ok(*x))
///     .with_stage(Double)
///     .with_stage(Double);
/// assert_eq!(runner.stage_names(), vec!["double", "double"]);
/// ```
pub struct StagedRunner<S> {
    stages: Vec<Box<dyn Stage<S>>>,
    extractor: Extractor<S>,
}

impl<S> StagedRunner<S> {
    /// Creates an empty pipeline with the QoI `extractor`.
    pub fn new<F>(extractor: F) -> Self
    where
        F: Fn(&S) -> Result<f64, RunnerError> + Send + Sync + 'static,
    {
        Self {
            stages: Vec::new(),
            extractor: Box::new(extractor),
        }
    }

    /// Appends `stage`.
    #[must_use]
    pub fn with_stage<T: Stage<S> + 'static>(mut self, stage: T) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if there are no stages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn stage_failed(stage: &str, reason: impl Into<String>) -> RunnerError {
    RunnerError::StageFailed {
        stage: stage.to_string(),
        reason: reason.into(),
    }
}

impl<S> SimulationRunner<S> for StagedRunner<S> {
    fn run(&self, mut state: S, ctx: &TrialContext) -> Result<f64, RunnerError> {
        for stage in &self.stages {
            ctx.check_cancelled()?;
            let name = stage.name();

            stage
                .check_preconditions(&state)
                .map_err(|reason| stage_failed(name, format!("precondition violated: {reason}")))?;

            match stage.execute(&mut state, ctx) {
                Ok(()) => {}
                Err(RunnerError::Cancelled) => return Err(RunnerError::Cancelled),
                Err(err) => return Err(stage_failed(name, err.to_string())),
            }

            stage
                .check_postconditions(&state)
                .map_err(|reason| stage_failed(name, format!("postcondition violated: {reason}")))?;

            trace!(trial = ctx.trial_id(), stage = name, "Stage complete");
        }

        ctx.check_cancelled()?;
        (self.extractor)(&state)
    }
}
