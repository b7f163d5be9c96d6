//! Batch entry point.
//!
//! [`EnsembleOrchestrator::run`] drives one batch end to end:
//!
//! 1. Capture the baseline state once (fatal on failure)
//! 2. Draw every trial sample up front from one seeded stream under the
//!    configured [`SamplingPolicy`](ensemble_core::SamplingPolicy)
//! 3. Start the aggregator and the worker pool
//! 4. Dispatch the reference trial (if configured) and all trials
//! 5. Join, then compare the estimate against the reference
//!
//! [`EnsembleOrchestrator::start`] stops after step 4 and hands back a
//! [`RunningBatch`], which can cancel trials before joining.

use crate::aggregator::{AggregatorHandle, OnlineAggregator};
use crate::collector::ResultCollector;
use crate::config::BatchConfig;
use crate::dispatch::{Dispatcher, TrialHandle};
use crate::error::EngineError;
use crate::reference::ReferenceTrial;
use crate::report::{BatchReport, TrialId};
use crate::runner::SimulationRunner;
use crate::snapshot::{Snapshot, TrialState};
use ensemble_core::{SampleGenerator, SamplerConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs ensemble batches with a fixed configuration and runner.
///
/// # Examples
///
/// ```rust
/// use ensemble_core::SamplerConfig;
/// use ensemble_engine::config::BatchConfig;
/// use ensemble_engine::flow_case::FlowCase;
/// use ensemble_engine::orchestrator::EnsembleOrchestrator;
/// use ensemble_engine::runner::runner_fn;
///
/// let mut baseline = FlowCase::airfoil_example();
/// baseline.initialise(1_024, 2_000);
///
/// let config = BatchConfig::builder()
///     .n_trials(16)
///     .seed(42)
///     .parallelism(2)
///     .reference_sample(vec![0.7, 0.0])
///     .build()
///     .unwrap();
///
/// let runner = runner_fn(|case: FlowCase, _ctx| {
///     let v = case.free_stream_velocity().unwrap_or_default();
///     Ok((v[0] * v[0] + v[1] * v[1]).sqrt() / 340.0)
/// });
///
/// let report = EnsembleOrchestrator::new(config, runner)
///     .run(&baseline, SamplerConfig::flow_defaults())
///     .unwrap();
///
/// assert_eq!(report.succeeded(), 16);
/// assert!(report.relative_error().unwrap() < 0.05);
/// ```
pub struct EnsembleOrchestrator<R> {
    config: BatchConfig,
    runner: Arc<R>,
}

impl<R> EnsembleOrchestrator<R> {
    /// Creates an orchestrator.
    pub fn new(config: BatchConfig, runner: R) -> Self {
        Self {
            config,
            runner: Arc::new(runner),
        }
    }

    /// The batch configuration.
    #[inline]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Runs one batch to completion.
    ///
    /// # Errors
    ///
    /// Batch-fatal errors only: the baseline cannot be captured, the
    /// sampler or reference sample is invalid, a fail-fast domain
    /// violation, or the worker pool cannot start. Individual trial
    /// failures are reported in the returned [`BatchReport`].
    pub fn run<S>(&self, baseline: &S, sampler: SamplerConfig) -> Result<BatchReport, EngineError>
    where
        S: TrialState,
        R: SimulationRunner<S> + 'static,
    {
        self.start(baseline, sampler)?.join()
    }

    /// Dispatches one batch and returns without waiting for it.
    pub fn start<S>(&self, baseline: &S, sampler: SamplerConfig) -> Result<RunningBatch<S, R>, EngineError>
    where
        S: TrialState,
        R: SimulationRunner<S> + 'static,
    {
        self.config.validate()?;
        let n_trials = self.config.n_trials();

        let snapshot = Snapshot::capture(baseline)?;

        let mut generator = match self.config.seed() {
            Some(seed) => SampleGenerator::new(sampler, seed)?,
            None => SampleGenerator::from_entropy(sampler)?,
        };
        let reference = self
            .config
            .reference_sample()
            .map(|values| ReferenceTrial::new(&generator, values))
            .transpose()?;
        let draws = generator.draw_batch(n_trials, self.config.sampling_policy())?;

        let dispatcher = Dispatcher::from_config(snapshot, Arc::clone(&self.runner), &self.config)?;
        let aggregator = OnlineAggregator::spawn()?;

        info!(
            n_trials,
            seed = generator.seed(),
            workers = dispatcher.workers(),
            snapshot_bytes = dispatcher.snapshot().len(),
            timeout_ms = self.config.trial_timeout().map(|t| t.as_millis() as u64),
            reference = reference.is_some(),
            "Starting ensemble batch"
        );

        let seed = generator.seed();
        let started = Instant::now();
        let reference = reference.map(|trial| {
            let handle = trial.dispatch(&dispatcher, reference_trial_id(n_trials));
            (trial, handle)
        });
        let handles = dispatcher.dispatch(draws, Some(aggregator.sink()));

        Ok(RunningBatch {
            dispatcher,
            handles,
            reference,
            aggregator,
            seed,
            started,
        })
    }
}

/// The reference trial follows the batch's trial ids.
fn reference_trial_id(n_trials: usize) -> TrialId {
    n_trials
}

/// A dispatched batch that has not been joined yet.
pub struct RunningBatch<S, R> {
    dispatcher: Dispatcher<S, R>,
    handles: Vec<TrialHandle>,
    reference: Option<(ReferenceTrial, TrialHandle)>,
    aggregator: AggregatorHandle,
    seed: u64,
    started: Instant,
}

impl<S, R> RunningBatch<S, R> {
    /// Handles of the batch's trials, in trial order.
    #[inline]
    pub fn handles(&self) -> &[TrialHandle] {
        &self.handles
    }

    /// Handle of the reference trial, if one was dispatched.
    pub fn reference_handle(&self) -> Option<&TrialHandle> {
        self.reference.as_ref().map(|(_, handle)| handle)
    }

    /// Number of trials that have resolved so far.
    pub fn finished(&self) -> usize {
        self.handles.iter().filter(|h| h.is_finished()).count()
    }

    /// Cancels every unresolved trial, including the reference.
    ///
    /// Returns how many trials were cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self
            .handles
            .iter()
            .chain(self.reference_handle())
            .filter(|h| h.cancel())
            .count();
        info!(cancelled, "Batch cancellation requested");
        cancelled
    }

    /// Waits for every trial and builds the report.
    ///
    /// # Errors
    ///
    /// [`EngineError::AggregatorLost`] if the aggregator thread died.
    pub fn join(self) -> Result<BatchReport, EngineError>
    where
        S: TrialState,
        R: SimulationRunner<S> + 'static,
    {
        let Self {
            dispatcher,
            handles,
            reference,
            aggregator,
            seed,
            started,
        } = self;

        let (reference_trial, reference_handle) = match reference {
            Some((trial, handle)) => (Some(trial), Some(handle)),
            None => (None, None),
        };

        let collected = ResultCollector::join(&handles, reference_handle.as_ref(), aggregator)?;
        let elapsed = started.elapsed();
        let detached_runners = dispatcher.live_runners();
        if detached_runners > 0 {
            warn!(detached_runners, "Runner threads of abandoned trials are still running");
        }
        drop(dispatcher);

        let reference = match (reference_trial, collected.reference) {
            (Some(trial), Some(outcome)) => Some(trial.report(&collected.stats, outcome)),
            _ => None,
        };

        let report = BatchReport {
            trials_requested: handles.len(),
            seed,
            statistics: collected.stats,
            values: collected.values,
            failures: collected.failures,
            reference,
            elapsed_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
            detached_runners,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            mean = report.summary().mean,
            variance = report.summary().variance,
            relative_error = report.relative_error(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Ensemble batch complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OverrideError, RunnerError, SnapshotError};
    use crate::runner::{runner_fn, TrialContext};
    use ensemble_core::{Sample, SamplingError, SamplingPolicy};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Angle {
        ready: bool,
        angle: f64,
    }

    impl TrialState for Angle {
        fn check_initialised(&self) -> Result<(), String> {
            if self.ready {
                Ok(())
            } else {
                Err("not ready".to_string())
            }
        }

        fn apply_override(&mut self, sample: &Sample) -> Result<(), OverrideError> {
            self.angle = sample
                .get("angle_of_attack")
                .ok_or_else(|| OverrideError::MissingParameter("angle_of_attack".to_string()))?;
            Ok(())
        }
    }

    fn ready() -> Angle {
        Angle {
            ready: true,
            angle: 0.0,
        }
    }

    fn doubled() -> impl SimulationRunner<Angle> {
        runner_fn(|s: Angle, _: &TrialContext| Ok(s.angle * 2.0))
    }

    #[test]
    fn test_uninitialised_baseline_is_fatal() {
        let config = BatchConfig::builder().n_trials(4).seed(1).build().unwrap();
        let err = EnsembleOrchestrator::new(config, doubled())
            .run(&Angle::default(), SamplerConfig::flow_defaults())
            .unwrap_err();
        assert!(matches!(err, EngineError::Snapshot(SnapshotError::NotInitialised(_))));
    }

    #[test]
    fn test_invalid_reference_sample_is_fatal() {
        let config = BatchConfig::builder()
            .n_trials(4)
            .seed(1)
            .reference_sample(vec![1.2, 0.0])
            .build()
            .unwrap();
        let err = EnsembleOrchestrator::new(config, doubled())
            .run(&ready(), SamplerConfig::flow_defaults())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Sampling(SamplingError::DomainViolation { .. })
        ));
    }

    #[test]
    fn test_reference_excluded_from_statistics() {
        let config = BatchConfig::builder()
            .n_trials(6)
            .seed(3)
            .parallelism(2)
            .reference_sample(vec![0.7, 0.25])
            .build()
            .unwrap();
        let report = EnsembleOrchestrator::new(config, doubled())
            .run(&ready(), SamplerConfig::flow_defaults())
            .unwrap();

        assert_eq!(report.trials_requested, 6);
        assert_eq!(report.statistics.count(), 6);
        assert!(report.values.iter().all(|v| v.trial_id < 6));

        let reference = report.reference.as_ref().unwrap();
        assert_eq!(reference.outcome.trial_id(), 6);
        assert_eq!(reference.outcome.value(), Some(0.5));
    }

    #[test]
    fn test_cancel_all_running_batch() {
        let config = BatchConfig::builder().n_trials(5).seed(4).parallelism(2).build().unwrap();
        let runner = runner_fn(|_: Angle, ctx: &TrialContext| {
            while !ctx.is_cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
            Err(RunnerError::Cancelled)
        });

        let orchestrator = EnsembleOrchestrator::new(config, runner);
        let batch = orchestrator.start(&ready(), SamplerConfig::flow_defaults()).unwrap();
        assert_eq!(batch.handles().len(), 5);
        assert_eq!(batch.cancel_all(), 5);

        let report = batch.join().unwrap();
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 5);
        assert_eq!(report.summary().mean, None);
    }

    #[test]
    fn test_entropy_seeded_run_replays_from_report() {
        let unseeded = BatchConfig::builder().n_trials(8).build().unwrap();
        let first = EnsembleOrchestrator::new(unseeded, doubled())
            .run(&ready(), SamplerConfig::flow_defaults())
            .unwrap();

        let replay = BatchConfig::builder()
            .n_trials(8)
            .seed(first.seed)
            .build()
            .unwrap();
        let second = EnsembleOrchestrator::new(replay, doubled())
            .run(&ready(), SamplerConfig::flow_defaults())
            .unwrap();

        assert_eq!(second.seed, first.seed);
        assert_eq!(second.values, first.values);
        assert_eq!(first.detached_runners, 0);
    }

    #[test]
    fn test_resample_policy_runs_every_trial() {
        let config = BatchConfig::builder()
            .n_trials(20)
            .seed(9)
            .sampling_policy(SamplingPolicy::Resample { max_attempts: 10 })
            .build()
            .unwrap();
        let report = EnsembleOrchestrator::new(config, doubled())
            .run(&ready(), SamplerConfig::flow_defaults())
            .unwrap();
        assert_eq!(report.succeeded() + report.failed(), 20);
    }
}
