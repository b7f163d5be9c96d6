//! # Airfoil Uncertainty Study
//!
//! Propagates uncertainty in free-stream Mach number and angle of attack
//! through a potential-flow surrogate of a cambered airfoil, using the
//! ensemble engine:
//!
//! - Baseline [`FlowCase`](ensemble_engine::flow_case::FlowCase) captured once
//! - Sampled far-field velocity injected per trial
//! - Lift coefficient aggregated online, compared against the reference
//!   conditions `M = 0.7, alpha = 0`

pub mod config;
pub mod error;
pub mod surrogate;

use config::StudyConfig;
use ensemble_engine::orchestrator::EnsembleOrchestrator;
use ensemble_engine::report::BatchReport;
use error::StudyError;

/// Runs the study described by `config`.
pub fn run_study(config: &StudyConfig) -> Result<BatchReport, StudyError> {
    let baseline = config.case.baseline()?;
    let orchestrator =
        EnsembleOrchestrator::new(config.ensemble.batch.clone(), surrogate::surrogate_runner());
    let report = orchestrator.run(&baseline, config.ensemble.sampler.clone())?;
    Ok(report)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{CaseConfig, StudyConfig};
    pub use crate::error::StudyError;
    pub use crate::run_study;
    pub use crate::surrogate::{surrogate_runner, FreeStream, PotentialFlow};
}
