//! Sample generator and its configuration.

use super::distribution::{CompiledDistribution, Distribution};
use super::domain::Domain;
use super::error::SamplingError;
use super::rng::SamplerRng;
use super::sample::Sample;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::FRAC_PI_2;

/// Name of the free-stream Mach number parameter.
pub const MACH_NUMBER: &str = "mach_number";

/// Name of the angle-of-attack parameter (radians).
pub const ANGLE_OF_ATTACK: &str = "angle_of_attack";

/// Outcome of drawing one trial's sample.
///
/// An `Err` here is a per-trial failure that the dispatcher reports as a
/// failed result; it is not fatal to the batch.
pub type Draw = Result<Sample, SamplingError>;

/// Declaration of one stochastic parameter.
///
/// In TOML:
///
/// ```toml
/// [[parameters]]
/// name = "mach_number"
/// distribution = "normal"
/// mean = 0.7
/// stddev = 0.01
/// domain = { lower = 0.0, upper = 1.0 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name, unique within a sampler.
    pub name: String,
    /// Distribution the parameter is drawn from.
    #[serde(flatten)]
    pub distribution: Distribution,
    /// Physical domain; defaults to the whole real line.
    #[serde(default)]
    pub domain: Domain,
}

impl ParameterSpec {
    /// Creates a parameter specification.
    pub fn new(name: impl Into<String>, distribution: Distribution, domain: Domain) -> Self {
        Self {
            name: name.into(),
            distribution,
            domain,
        }
    }
}

/// Ordered list of stochastic parameters making up a [`Sample`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Parameters in sample order.
    pub parameters: Vec<ParameterSpec>,
}

impl SamplerConfig {
    /// Creates a configuration from parameter specifications.
    pub fn new(parameters: Vec<ParameterSpec>) -> Self {
        Self { parameters }
    }

    /// Free-stream Mach number and angle of attack for a transonic airfoil:
    ///
    /// - `mach_number ~ Normal(0.7, 0.01)` on (0, 1)
    /// - `angle_of_attack ~ Normal(0.0, 0.01)` on (-pi/2, pi/2)
    pub fn flow_defaults() -> Self {
        Self::new(vec![
            ParameterSpec::new(
                MACH_NUMBER,
                Distribution::Normal {
                    mean: 0.7,
                    stddev: 0.01,
                },
                Domain::open(0.0, 1.0),
            ),
            ParameterSpec::new(
                ANGLE_OF_ATTACK,
                Distribution::Normal {
                    mean: 0.0,
                    stddev: 0.01,
                },
                Domain::open(-FRAC_PI_2, FRAC_PI_2),
            ),
        ])
    }

    /// Number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Returns `true` if no parameters are configured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Validates names, distributions and domains.
    ///
    /// # Errors
    ///
    /// - [`SamplingError::EmptyConfiguration`] if there are no parameters
    /// - [`SamplingError::DuplicateParameter`] if a name repeats
    /// - [`SamplingError::InvalidDistribution`] for bad distribution
    ///   parameters or an empty domain
    pub fn validate(&self) -> Result<(), SamplingError> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<Vec<CompiledDistribution>, SamplingError> {
        if self.parameters.is_empty() {
            return Err(SamplingError::EmptyConfiguration);
        }

        let mut seen = HashSet::with_capacity(self.parameters.len());
        let mut compiled = Vec::with_capacity(self.parameters.len());
        for spec in &self.parameters {
            if !seen.insert(spec.name.as_str()) {
                return Err(SamplingError::DuplicateParameter(spec.name.clone()));
            }
            if !spec.domain.is_valid() {
                return Err(SamplingError::InvalidDistribution {
                    parameter: spec.name.clone(),
                    reason: format!("domain {} is empty", spec.domain),
                });
            }
            compiled.push(spec.distribution.compile(&spec.name)?);
        }
        Ok(compiled)
    }
}

/// What to do when a drawn sample violates its domain.
///
/// ```rust
/// use ensemble_core::sampling::SamplingPolicy;
///
/// let p: SamplingPolicy = serde_json::from_str(r#"{"policy":"resample","max_attempts":5}"#).unwrap();
/// assert_eq!(p, SamplingPolicy::Resample { max_attempts: 5 });
/// assert_eq!(SamplingPolicy::default(), SamplingPolicy::FailFast);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Abort the whole batch before anything is dispatched.
    #[default]
    FailFast,
    /// Redraw the trial, giving up after `max_attempts` draws in total.
    /// Exhaustion turns that single trial into a failure.
    Resample {
        /// Total draws allowed per trial (values below 1 count as 1).
        max_attempts: u32,
    },
    /// Dispatch the violating trial as an immediate failure.
    RecordFailure,
}

/// Draws validated [`Sample`]s from a seeded stream.
///
/// # Examples
///
/// ```rust
/// use ensemble_core::sampling::{SampleGenerator, SamplerConfig, SamplingPolicy};
///
/// let mut a = SampleGenerator::new(SamplerConfig::flow_defaults(), 42).unwrap();
/// let mut b = SampleGenerator::new(SamplerConfig::flow_defaults(), 42).unwrap();
///
/// let batch_a = a.draw_batch(10, SamplingPolicy::FailFast).unwrap();
/// let batch_b = b.draw_batch(10, SamplingPolicy::FailFast).unwrap();
/// assert_eq!(batch_a, batch_b);
/// ```
#[derive(Clone, Debug)]
pub struct SampleGenerator {
    specs: Vec<ParameterSpec>,
    compiled: Vec<CompiledDistribution>,
    names: Vec<String>,
    rng: SamplerRng,
}

impl SampleGenerator {
    /// Creates a generator with a fixed seed.
    ///
    /// # Errors
    ///
    /// Returns the first validation error of `config`.
    pub fn new(config: SamplerConfig, seed: u64) -> Result<Self, SamplingError> {
        Self::with_rng(config, SamplerRng::from_seed(seed))
    }

    /// Creates a generator seeded from operating-system entropy.
    pub fn from_entropy(config: SamplerConfig) -> Result<Self, SamplingError> {
        Self::with_rng(config, SamplerRng::from_entropy())
    }

    /// Creates a generator that draws from `rng`.
    pub fn with_rng(config: SamplerConfig, rng: SamplerRng) -> Result<Self, SamplingError> {
        let compiled = config.compile()?;
        let names = config.parameters.iter().map(|p| p.name.clone()).collect();
        Ok(Self {
            specs: config.parameters,
            compiled,
            names,
            rng,
        })
    }

    /// Seed of the underlying stream.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Parameter names in sample order.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Draws every component independently, then validates them.
    ///
    /// All components are drawn before validation, so the stream advances
    /// by the same amount whether or not the sample is valid.
    ///
    /// # Errors
    ///
    /// [`SamplingError::DomainViolation`] naming the first component that
    /// falls outside its domain.
    pub fn draw(&mut self) -> Result<Sample, SamplingError> {
        let values: Vec<f64> = self
            .compiled
            .iter()
            .map(|d| d.draw(&mut self.rng))
            .collect();
        self.validate(&values)?;
        Ok(Sample::new(self.names.clone(), values))
    }

    /// Builds a deterministic sample from explicit values.
    ///
    /// Does not touch the random stream.
    ///
    /// # Errors
    ///
    /// [`SamplingError::ArityMismatch`] if `values` has the wrong length, or
    /// [`SamplingError::DomainViolation`] for an out-of-domain component.
    pub fn fixed(&self, values: &[f64]) -> Result<Sample, SamplingError> {
        if values.len() != self.specs.len() {
            return Err(SamplingError::ArityMismatch {
                expected: self.specs.len(),
                found: values.len(),
            });
        }
        self.validate(values)?;
        Ok(Sample::new(self.names.clone(), values.to_vec()))
    }

    /// Draws one trial's sample under `policy`.
    ///
    /// The outer `Result` is fatal to the batch (only with
    /// [`SamplingPolicy::FailFast`]); the inner [`Draw`] is the per-trial
    /// outcome.
    pub fn draw_with_policy(&mut self, policy: SamplingPolicy) -> Result<Draw, SamplingError> {
        match policy {
            SamplingPolicy::FailFast => self.draw().map(Ok),
            SamplingPolicy::RecordFailure => Ok(self.draw()),
            SamplingPolicy::Resample { max_attempts } => {
                let attempts = max_attempts.max(1);
                let mut last = self.draw();
                for _ in 1..attempts {
                    if !matches!(&last, Err(e) if e.is_domain_violation()) {
                        break;
                    }
                    last = self.draw();
                }
                Ok(last)
            }
        }
    }

    /// Draws `n` trial samples in order under `policy`.
    ///
    /// # Errors
    ///
    /// With [`SamplingPolicy::FailFast`], the first domain violation.
    pub fn draw_batch(&mut self, n: usize, policy: SamplingPolicy) -> Result<Vec<Draw>, SamplingError> {
        (0..n).map(|_| self.draw_with_policy(policy)).collect()
    }

    fn validate(&self, values: &[f64]) -> Result<(), SamplingError> {
        for (spec, &value) in self.specs.iter().zip(values) {
            if !spec.domain.contains(value) {
                return Err(SamplingError::DomainViolation {
                    parameter: spec.name.clone(),
                    value,
                    domain: spec.domain.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> SampleGenerator {
        SampleGenerator::new(SamplerConfig::flow_defaults(), seed).unwrap()
    }

    /// Mach drawn from N(1.2, 0) so every draw violates (0, 1).
    fn always_supersonic() -> SamplerConfig {
        SamplerConfig::new(vec![ParameterSpec::new(
            MACH_NUMBER,
            Distribution::Normal {
                mean: 1.2,
                stddev: 0.0,
            },
            Domain::open(0.0, 1.0),
        )])
    }

    /// Mach drawn uniformly on [0.5, 1.5): roughly half the draws violate.
    fn straddling() -> SamplerConfig {
        SamplerConfig::new(vec![ParameterSpec::new(
            MACH_NUMBER,
            Distribution::Uniform {
                low: 0.5,
                high: 1.5,
            },
            Domain::open(0.0, 1.0),
        )])
    }

    #[test]
    fn test_fixed_mach_domain() {
        let g = generator(1);

        let err = g.fixed(&[1.2, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            SamplingError::DomainViolation { ref parameter, value, .. }
                if parameter == MACH_NUMBER && value == 1.2
        ));

        assert!(g.fixed(&[0.69, 0.0]).is_ok());
        assert!(g.fixed(&[0.0, 0.0]).unwrap_err().is_domain_violation());
        assert!(g.fixed(&[1.0, 0.0]).unwrap_err().is_domain_violation());
    }

    #[test]
    fn test_fixed_arity() {
        let g = generator(1);
        assert_eq!(
            g.fixed(&[0.7]).unwrap_err(),
            SamplingError::ArityMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_fixed_does_not_advance_stream() {
        let mut a = generator(3);
        let mut b = generator(3);

        let _ = a.fixed(&[0.7, 0.0]).unwrap();
        assert_eq!(a.draw().unwrap(), b.draw().unwrap());
    }

    #[test]
    fn test_draws_respect_domain() {
        let mut g = generator(11);
        for _ in 0..1000 {
            let s = g.draw().unwrap();
            let mach = s.get(MACH_NUMBER).unwrap();
            assert!(mach > 0.0 && mach < 1.0);
        }
    }

    #[test]
    fn test_draw_violation_is_reported_not_clamped() {
        let mut g = SampleGenerator::new(always_supersonic(), 0).unwrap();
        let err = g.draw().unwrap_err();
        assert!(matches!(err, SamplingError::DomainViolation { value, .. } if value == 1.2));
    }

    #[test]
    fn test_fail_fast_aborts_batch() {
        let mut g = SampleGenerator::new(always_supersonic(), 0).unwrap();
        assert!(g.draw_batch(5, SamplingPolicy::FailFast).is_err());
    }

    #[test]
    fn test_record_failure_keeps_batch() {
        let mut g = SampleGenerator::new(always_supersonic(), 0).unwrap();
        let draws = g.draw_batch(5, SamplingPolicy::RecordFailure).unwrap();
        assert_eq!(draws.len(), 5);
        assert!(draws.iter().all(|d| d.is_err()));
    }

    #[test]
    fn test_resample_exhaustion_is_per_trial() {
        let mut g = SampleGenerator::new(always_supersonic(), 0).unwrap();
        let draws = g
            .draw_batch(3, SamplingPolicy::Resample { max_attempts: 4 })
            .unwrap();
        assert!(draws.iter().all(|d| d.is_err()));
    }

    #[test]
    fn test_resample_recovers() {
        let mut g = SampleGenerator::new(straddling(), 17).unwrap();
        let draws = g
            .draw_batch(50, SamplingPolicy::Resample { max_attempts: 64 })
            .unwrap();
        // P(64 consecutive violations) = 2^-64 per trial
        assert!(draws.iter().all(|d| d.is_ok()));
    }

    #[test]
    fn test_empty_configuration() {
        let err = SampleGenerator::new(SamplerConfig::new(vec![]), 0).unwrap_err();
        assert_eq!(err, SamplingError::EmptyConfiguration);
    }

    #[test]
    fn test_duplicate_parameter() {
        let mut config = SamplerConfig::flow_defaults();
        config.parameters[1].name = MACH_NUMBER.to_string();
        assert_eq!(
            config.validate().unwrap_err(),
            SamplingError::DuplicateParameter(MACH_NUMBER.to_string())
        );
    }

    #[test]
    fn test_empty_domain_rejected() {
        let mut config = SamplerConfig::flow_defaults();
        config.parameters[0].domain = Domain::open(1.0, 0.0);
        assert!(matches!(
            config.validate(),
            Err(SamplingError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_toml_configuration() {
        let toml_str = r#"
            [[parameters]]
            name = "mach_number"
            distribution = "normal"
            mean = 0.7
            stddev = 0.01
            domain = { lower = 0.0, upper = 1.0 }

            [[parameters]]
            name = "angle_of_attack"
            distribution = "uniform"
            low = -0.05
            high = 0.05
        "#;

        let config: SamplerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(
            config.parameters[0].distribution,
            Distribution::Normal {
                mean: 0.7,
                stddev: 0.01
            }
        );
        assert_eq!(config.parameters[0].domain, Domain::open(0.0, 1.0));
        assert_eq!(config.parameters[1].domain, Domain::unbounded());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            sampling_policy: SamplingPolicy,
        }

        let w: Wrapper =
            toml::from_str(r#"sampling_policy = { policy = "record_failure" }"#).unwrap();
        assert_eq!(w.sampling_policy, SamplingPolicy::RecordFailure);
    }

    #[test]
    fn test_overflowing_uniform_is_error_not_panic() {
        let config = SamplerConfig::new(vec![ParameterSpec::new(
            "x",
            Distribution::Uniform {
                low: -1e308,
                high: 1e308,
            },
            Domain::unbounded(),
        )]);
        assert!(matches!(
            SampleGenerator::new(config, 1),
            Err(SamplingError::InvalidDistribution { .. })
        ));
    }
}
