//! Potential-flow surrogate for the airfoil lift coefficient.
//!
//! Two stages over a [`FlowCase`]:
//!
//! 1. `free_stream`: recovers Mach number and angle of attack from the
//!    far-field velocity written by the sample override
//! 2. `potential_flow`: thin-airfoil lift with Prandtl-Glauert compressibility
//!    correction
//!
//! ```text
//! Cl = 2 * pi * (alpha + alpha_0) / sqrt(1 - M^2)
//! ```
//!
//! where `alpha_0` is the zero-lift angle of the cambered section.

use ensemble_engine::error::RunnerError;
use ensemble_engine::flow_case::{FlowCase, SPEED_OF_SOUND};
use ensemble_engine::pipeline::{Stage, StagedRunner};
use ensemble_engine::runner::TrialContext;
use std::f64::consts::PI;

/// Result key for the free-stream Mach number.
pub const MACH_KEY: &str = "mach_number";
/// Result key for the angle of attack [rad].
pub const ALPHA_KEY: &str = "angle_of_attack";
/// Result key for the lift coefficient.
pub const LIFT_KEY: &str = "lift_coefficient";

/// Zero-lift angle of the section [rad] (5 degrees).
pub const ZERO_LIFT_ANGLE: f64 = 5.0 * PI / 180.0;

/// Derives free-stream conditions from the far-field velocity.
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeStream;

impl Stage<FlowCase> for FreeStream {
    fn name(&self) -> &str {
        "free_stream"
    }

    fn check_preconditions(&self, state: &FlowCase) -> Result<(), String> {
        match state.free_stream_velocity() {
            Some([vx, vy, _]) if vx.hypot(vy) > 0.0 => Ok(()),
            Some(_) => Err("far-field velocity is zero".to_string()),
            None => Err("no far-field velocity set".to_string()),
        }
    }

    fn execute(&self, state: &mut FlowCase, _ctx: &TrialContext) -> Result<(), RunnerError> {
        let [vx, vy, _] = state
            .free_stream_velocity()
            .ok_or_else(|| RunnerError::Failed("no far-field velocity set".to_string()))?;

        state.results.insert(MACH_KEY.to_string(), vx.hypot(vy) / SPEED_OF_SOUND);
        state.results.insert(ALPHA_KEY.to_string(), vy.atan2(vx));
        Ok(())
    }

    fn check_postconditions(&self, state: &FlowCase) -> Result<(), String> {
        match state.results.get(MACH_KEY) {
            Some(&mach) if mach < 1.0 => Ok(()),
            Some(&mach) => Err(format!("free stream is not subsonic (M = {mach:.3})")),
            None => Err("Mach number not recorded".to_string()),
        }
    }
}

/// Compressible thin-airfoil lift.
#[derive(Clone, Copy, Debug)]
pub struct PotentialFlow {
    zero_lift_angle: f64,
}

impl PotentialFlow {
    /// Creates the stage for a section with the given zero-lift angle [rad].
    pub fn new(zero_lift_angle: f64) -> Self {
        Self { zero_lift_angle }
    }
}

impl Default for PotentialFlow {
    fn default() -> Self {
        Self::new(ZERO_LIFT_ANGLE)
    }
}

/// Lift coefficient at Mach `mach` and angle of attack `alpha`.
pub fn lift_coefficient(mach: f64, alpha: f64, zero_lift_angle: f64) -> f64 {
    2.0 * PI * (alpha + zero_lift_angle) / (1.0 - mach * mach).sqrt()
}

impl Stage<FlowCase> for PotentialFlow {
    fn name(&self) -> &str {
        "potential_flow"
    }

    fn check_preconditions(&self, state: &FlowCase) -> Result<(), String> {
        if !state.results.contains_key(MACH_KEY) || !state.results.contains_key(ALPHA_KEY) {
            return Err("free-stream conditions missing".to_string());
        }
        Ok(())
    }

    fn execute(&self, state: &mut FlowCase, _ctx: &TrialContext) -> Result<(), RunnerError> {
        let mach = state.results[MACH_KEY];
        let alpha = state.results[ALPHA_KEY];

        let cl = lift_coefficient(mach, alpha, self.zero_lift_angle);
        if !cl.is_finite() {
            return Err(RunnerError::Diverged(format!(
                "lift coefficient is not finite at M = {mach}"
            )));
        }
        state.results.insert(LIFT_KEY.to_string(), cl);
        Ok(())
    }

    fn check_postconditions(&self, state: &FlowCase) -> Result<(), String> {
        if state.results.contains_key(LIFT_KEY) {
            Ok(())
        } else {
            Err("lift coefficient not recorded".to_string())
        }
    }
}

/// The two-stage surrogate, yielding the lift coefficient.
pub fn surrogate_runner() -> StagedRunner<FlowCase> {
    StagedRunner::new(|case: &FlowCase| {
        case.results
            .get(LIFT_KEY)
            .copied()
            .ok_or_else(|| RunnerError::Failed("lift coefficient not computed".to_string()))
    })
    .with_stage(FreeStream)
    .with_stage(PotentialFlow::default())
}
