//! Task dispatch onto a worker pool.
//!
//! Each trial becomes one independent job on a rayon [`ThreadPool`]:
//! materialise a state from the shared snapshot, apply the trial's sample,
//! run the simulation, and resolve the trial's [`TrialHandle`] with a
//! [`QoIResult`]. Jobs never communicate and carry no ordering. A failure
//! anywhere in the job resolves the handle with a failed result; nothing is
//! retried.
//!
//! The simulation itself runs on a dedicated thread watched by the pool
//! worker, so a per-trial timeout or a cancellation can resolve the trial
//! even while the runner is stuck. A runner that ignores cancellation is
//! left to finish on its own thread and its late result is discarded. Such
//! detached threads run on top of the pool, so while any exist the number of
//! busy threads can exceed the worker count; [`Dispatcher::live_runners`]
//! reports how many runner threads are alive.
//!
//! # Resolution
//!
//! A trial resolves exactly once, whichever of the worker, a timeout or
//! [`TrialHandle::cancel`] gets there first. The result is published to the
//! aggregator before the handle becomes observable as finished, so by the
//! time every handle has been waited on, every result is already queued for
//! the aggregator.

use crate::aggregator::ResultSink;
use crate::config::BatchConfig;
use crate::error::{EngineError, TrialError};
use crate::report::{QoIResult, TrialId};
use crate::runner::{CancellationToken, SimulationRunner, TrialContext};
use crate::snapshot::{Snapshot, TrialState};
use ensemble_core::sampling::Draw;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Interval at which a waiting worker re-checks its trial's cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct TrialSlot {
    trial_id: TrialId,
    resolved: AtomicBool,
    result: Mutex<Option<QoIResult>>,
    ready: Condvar,
    token: CancellationToken,
    sink: Option<ResultSink>,
}

impl TrialSlot {
    fn new(trial_id: TrialId, sink: Option<ResultSink>) -> Self {
        Self {
            trial_id,
            resolved: AtomicBool::new(false),
            result: Mutex::new(None),
            ready: Condvar::new(),
            token: CancellationToken::new(),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<QoIResult>> {
        self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// First caller wins; later results are dropped.
    fn resolve(&self, result: QoIResult) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        match result.error() {
            None => debug!(trial = self.trial_id, value = result.value(), "Trial resolved"),
            Some(error) => debug!(trial = self.trial_id, error = %error, "Trial resolved with failure"),
        }

        if let Some(sink) = &self.sink {
            if !sink.publish(result.clone()) {
                warn!(trial = self.trial_id, "Aggregator stopped before trial result was published");
            }
        }

        *self.lock() = Some(result);
        self.ready.notify_all();
        true
    }
}

/// Future of one dispatched trial.
///
/// Cloning a handle yields another view of the same trial.
#[derive(Clone)]
pub struct TrialHandle {
    slot: Arc<TrialSlot>,
}

impl TrialHandle {
    /// The trial's identifier.
    #[inline]
    pub fn trial_id(&self) -> TrialId {
        self.slot.trial_id
    }

    /// Cancels the trial.
    ///
    /// If it has not resolved yet it resolves now as
    /// [`TrialError::Cancelled`], and the runner's token is set. Other
    /// trials and the snapshot are unaffected. Returns `false` if the trial
    /// had already resolved.
    pub fn cancel(&self) -> bool {
        self.slot.token.cancel();
        let cancelled = self
            .slot
            .resolve(QoIResult::failure(self.slot.trial_id, TrialError::Cancelled));
        if cancelled {
            warn!(trial = self.slot.trial_id, "Trial cancelled");
        }
        cancelled
    }

    /// Returns `true` once the result is available.
    pub fn is_finished(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// The result, if available, without blocking.
    pub fn try_result(&self) -> Option<QoIResult> {
        self.slot.lock().clone()
    }

    /// Blocks until the trial resolves.
    pub fn wait(&self) -> QoIResult {
        let mut guard = self.slot.lock();
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            guard = self
                .slot
                .ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl std::fmt::Debug for TrialHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialHandle")
            .field("trial_id", &self.slot.trial_id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Counts a runner thread as live until dropped.
struct LiveRunner(Arc<AtomicUsize>);

impl LiveRunner {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveRunner {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Schedules trials onto a fixed-size worker pool.
///
/// # Examples
///
/// ```rust
/// use ensemble_core::{SampleGenerator, SamplerConfig, SamplingPolicy};
/// use ensemble_engine::dispatch::Dispatcher;
/// use ensemble_engine::flow_case::FlowCase;
/// use ensemble_engine::runner::runner_fn;
/// use ensemble_engine::snapshot::Snapshot;
///
/// let mut baseline = FlowCase::airfoil_example();
/// baseline.initialise(1_024, 2_000);
/// let snapshot = Snapshot::capture(&baseline).unwrap();
///
/// let runner = runner_fn(|case: FlowCase, _ctx| Ok(case.free_stream_velocity().unwrap()[0]));
/// let dispatcher = Dispatcher::new(snapshot, runner, 2, None).unwrap();
///
/// let mut generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 7).unwrap();
/// let draws = generator.draw_batch(4, SamplingPolicy::FailFast).unwrap();
///
/// let handles = dispatcher.dispatch(draws, None);
/// for handle in &handles {
///     assert!(handle.wait().is_success());
/// }
/// ```
pub struct Dispatcher<S, R> {
    pool: ThreadPool,
    workers: usize,
    snapshot: Snapshot<S>,
    runner: Arc<R>,
    timeout: Option<Duration>,
    live_runners: Arc<AtomicUsize>,
}

impl<S, R> Dispatcher<S, R>
where
    S: TrialState,
    R: SimulationRunner<S> + 'static,
{
    /// Creates a dispatcher with `workers` threads (at least one).
    ///
    /// # Errors
    ///
    /// [`EngineError::WorkerPool`] if the pool cannot be built.
    pub fn new(
        snapshot: Snapshot<S>,
        runner: R,
        workers: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, EngineError> {
        Self::with_shared_runner(snapshot, Arc::new(runner), workers, timeout)
    }

    /// Creates a dispatcher sized and timed by `config`.
    pub fn from_config(snapshot: Snapshot<S>, runner: Arc<R>, config: &BatchConfig) -> Result<Self, EngineError> {
        Self::with_shared_runner(snapshot, runner, config.worker_count(), config.trial_timeout())
    }

    fn with_shared_runner(
        snapshot: Snapshot<S>,
        runner: Arc<R>,
        workers: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, EngineError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ensemble-worker-{i}"))
            .panic_handler(|payload| {
                error!(panic = panic_message(payload.as_ref()), "Worker job panicked");
            })
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            workers,
            snapshot,
            runner,
            timeout,
            live_runners: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of worker threads.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Per-trial time budget.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of runner threads currently alive, including those detached
    /// from timed-out or cancelled trials.
    pub fn live_runners(&self) -> usize {
        self.live_runners.load(Ordering::Acquire)
    }

    /// The shared baseline snapshot.
    #[inline]
    pub fn snapshot(&self) -> &Snapshot<S> {
        &self.snapshot
    }

    /// Dispatches one trial per draw; trial ids follow the draw order.
    ///
    /// Returns immediately with one handle per trial. Each result is also
    /// published to `sink` when given.
    pub fn dispatch(&self, draws: Vec<Draw>, sink: Option<ResultSink>) -> Vec<TrialHandle> {
        draws
            .into_iter()
            .enumerate()
            .map(|(trial_id, draw)| self.dispatch_one(trial_id, draw, sink.clone()))
            .collect()
    }

    /// Dispatches a single trial.
    pub fn dispatch_one(&self, trial_id: TrialId, draw: Draw, sink: Option<ResultSink>) -> TrialHandle {
        let slot = Arc::new(TrialSlot::new(trial_id, sink));
        let job = TrialJob {
            slot: Arc::clone(&slot),
            draw,
            snapshot: self.snapshot.clone(),
            runner: Arc::clone(&self.runner),
            timeout: self.timeout,
            live_runners: Arc::clone(&self.live_runners),
        };

        debug!(trial = trial_id, "Trial dispatched");
        self.pool.spawn(move || job.execute());
        TrialHandle { slot }
    }
}

impl<S, R> std::fmt::Debug for Dispatcher<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.workers)
            .field("timeout", &self.timeout)
            .field("live_runners", &self.live_runners)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

struct TrialJob<S, R> {
    slot: Arc<TrialSlot>,
    draw: Draw,
    snapshot: Snapshot<S>,
    runner: Arc<R>,
    timeout: Option<Duration>,
    live_runners: Arc<AtomicUsize>,
}

impl<S, R> TrialJob<S, R>
where
    S: TrialState,
    R: SimulationRunner<S> + 'static,
{
    fn execute(self) {
        let slot = Arc::clone(&self.slot);
        if slot.is_resolved() {
            return;
        }
        if slot.token.is_cancelled() {
            slot.resolve(QoIResult::failure(slot.trial_id, TrialError::Cancelled));
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run())).unwrap_or_else(|payload| {
            Err(TrialError::RunnerFailure(format!(
                "Trial panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
        slot.resolve(QoIResult::new(slot.trial_id, outcome));
    }

    fn run(self) -> Result<f64, TrialError> {
        let sample = self.draw?;
        let state = panic::catch_unwind(AssertUnwindSafe(|| self.snapshot.materialise_with(&sample)))
            .unwrap_or_else(|payload| {
                Err(TrialError::Override(format!(
                    "State preparation panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })?;

        let token = self.slot.token.clone();
        let ctx = TrialContext::new(self.slot.trial_id, sample, token.clone());
        let runner = self.runner;
        let (tx, rx) = mpsc::channel();
        let live = LiveRunner::enter(&self.live_runners);

        thread::Builder::new()
            .name(format!("ensemble-trial-{}", self.slot.trial_id))
            .spawn(move || {
                let _live = live;
                // The receiver is gone if the trial already timed out.
                let _ = tx.send(invoke(runner.as_ref(), state, &ctx));
            })
            .map_err(|e| TrialError::RunnerFailure(format!("Failed to start trial thread: {e}")))?;

        let deadline = self.timeout.map(|limit| (limit, Instant::now() + limit));
        loop {
            let wait = match deadline {
                Some((_, at)) => CANCEL_POLL_INTERVAL.min(at.saturating_duration_since(Instant::now())),
                None => CANCEL_POLL_INTERVAL,
            };

            match rx.recv_timeout(wait) {
                Ok(outcome) => return outcome,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TrialError::RunnerFailure(
                        "Trial thread exited without a result".to_string(),
                    ));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if token.is_cancelled() || self.slot.is_resolved() {
                        debug!(
                            trial = self.slot.trial_id,
                            live_runners = self.live_runners.load(Ordering::Acquire),
                            "Trial cancelled; runner thread detached"
                        );
                        return Err(TrialError::Cancelled);
                    }
                    if let Some((limit, at)) = deadline {
                        if Instant::now() >= at {
                            token.cancel();
                            let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                            warn!(
                                trial = self.slot.trial_id,
                                limit_ms,
                                live_runners = self.live_runners.load(Ordering::Acquire),
                                "Trial timed out; runner thread detached"
                            );
                            return Err(TrialError::Timeout { limit_ms });
                        }
                    }
                }
            }
        }
    }
}

/// Runs the simulation, turning a panic into a runner failure.
fn invoke<S, R>(runner: &R, state: S, ctx: &TrialContext) -> Result<f64, TrialError>
where
    R: SimulationRunner<S> + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| runner.run(state, ctx))) {
        Ok(outcome) => outcome.map_err(TrialError::from),
        Err(payload) => Err(TrialError::RunnerFailure(format!(
            "Runner panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message;
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.as_str();
    }
    "unknown panic payload"
}
