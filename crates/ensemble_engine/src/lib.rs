//! # Ensemble Engine (Layer 2: Orchestration)
//!
//! ## Layer 2 Role
//!
//! ensemble_engine fans a stochastic simulation ensemble out over a worker
//! pool and folds the results back into running statistics:
//! - Snapshot of the heavy baseline state, captured once and cloned per trial
//! - Task dispatch with configurable parallelism, per-trial timeouts and
//!   cancellation
//! - Single-writer online aggregation (Welford) through an actor thread
//! - A join barrier, a deterministic reference trial and a batch report
//!
//! ## Data Flow
//!
//! ```text
//! SampleGenerator ──► Dispatcher ──► [materialise ► override ► run] ──► ResultSink
//!                         ▲                                                │
//!                  Snapshot (shared)                                       ▼
//!                                                                   OnlineAggregator
//!                                                                          │
//!                     ReferenceTrial ──────────────► ResultCollector::join ◄┘
//!                                                          │
//!                                                          ▼
//!                                                     BatchReport
//! ```
//!
//! ## Failure Model
//!
//! Shared setup failures (snapshot capture, invalid configuration, a
//! fail-fast domain violation) abort the batch with an [`EngineError`].
//! Everything that goes wrong inside a single trial becomes a failed
//! [`QoIResult`], is excluded from the statistics and is counted in the
//! report.
//!
//! ## Usage Example
//!
//! ```rust
//! use ensemble_core::SamplerConfig;
//! use ensemble_engine::prelude::*;
//!
//! let mut baseline = FlowCase::airfoil_example();
//! baseline.initialise(1_024, 2_000);
//!
//! let config = BatchConfig::builder().n_trials(10).seed(7).build().unwrap();
//! let runner = runner_fn(|_case: FlowCase, ctx: &TrialContext| {
//!     Ok(ctx.sample().get("angle_of_attack").unwrap_or(0.0) * 2.0)
//! });
//!
//! let report = EnsembleOrchestrator::new(config, runner)
//!     .run(&baseline, SamplerConfig::flow_defaults())
//!     .unwrap();
//!
//! assert_eq!(report.statistics.count(), 10);
//! assert_eq!(report.failed(), 0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod aggregator;
pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flow_case;
pub mod orchestrator;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod runner;
pub mod snapshot;

pub use error::{EngineError, OverrideError, RunnerError, SnapshotError, TrialError, TrialErrorKind};
pub use report::{BatchReport, QoIResult, TrialId};

/// Commonly used types.
pub mod prelude {
    pub use crate::aggregator::{OnlineAggregator, ResultSink};
    pub use crate::collector::ResultCollector;
    pub use crate::config::{BatchConfig, EnsembleConfig};
    pub use crate::dispatch::{Dispatcher, TrialHandle};
    pub use crate::error::{EngineError, RunnerError, TrialError, TrialErrorKind};
    pub use crate::flow_case::FlowCase;
    pub use crate::orchestrator::{EnsembleOrchestrator, RunningBatch};
    pub use crate::pipeline::{Stage, StagedRunner};
    pub use crate::report::{BatchReport, QoIResult};
    pub use crate::runner::{runner_fn, CancellationToken, SimulationRunner, TrialContext};
    pub use crate::snapshot::{Snapshot, TrialState};
}
