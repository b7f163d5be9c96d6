//! Distribution families for stochastic parameters.
//!
//! [`Distribution`] is the serialisable description found in configuration
//! files. It is compiled once into a [`CompiledDistribution`] backed by
//! `rand_distr`, so parameter errors surface when the sampler is built and
//! not in the middle of a batch.

use super::error::SamplingError;
use super::rng::SamplerRng;
use rand_distr::{LogNormal, Normal, Uniform};
use serde::{Deserialize, Serialize};

/// Probability distribution of one stochastic parameter.
///
/// Serialised with an internal `distribution` tag:
///
/// ```rust
/// use ensemble_core::sampling::Distribution;
///
/// let d: Distribution =
///     serde_json::from_str(r#"{"distribution":"normal","mean":0.7,"stddev":0.01}"#).unwrap();
/// assert_eq!(d, Distribution::Normal { mean: 0.7, stddev: 0.01 });
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum Distribution {
    /// Gaussian with the given mean and standard deviation.
    Normal {
        /// Mean.
        mean: f64,
        /// Standard deviation (>= 0).
        stddev: f64,
    },
    /// Uniform on the half-open interval [low, high).
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound (> low).
        high: f64,
    },
    /// Log-normal: `exp(N(mu, sigma))`.
    LogNormal {
        /// Mean of the underlying normal.
        mu: f64,
        /// Standard deviation of the underlying normal (>= 0).
        sigma: f64,
    },
    /// Degenerate distribution that always yields `value`.
    Constant {
        /// The value.
        value: f64,
    },
}

impl Distribution {
    /// Validates the parameters and builds the sampling object.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::InvalidDistribution`] for non-finite
    /// parameters, negative spreads, or an empty uniform range.
    pub fn compile(&self, parameter: &str) -> Result<CompiledDistribution, SamplingError> {
        let invalid = |reason: String| SamplingError::InvalidDistribution {
            parameter: parameter.to_string(),
            reason,
        };

        match *self {
            Self::Normal { mean, stddev } => {
                if !mean.is_finite() || !stddev.is_finite() || stddev < 0.0 {
                    return Err(invalid(format!(
                        "normal requires finite mean and stddev >= 0, got mean={mean}, stddev={stddev}"
                    )));
                }
                Normal::new(mean, stddev)
                    .map(CompiledDistribution::Normal)
                    .map_err(|e| invalid(e.to_string()))
            }
            Self::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low >= high {
                    return Err(invalid(format!(
                        "uniform requires finite low < high, got [{low}, {high})"
                    )));
                }
                if !(high - low).is_finite() {
                    return Err(invalid(format!(
                        "uniform range [{low}, {high}) is too wide to sample"
                    )));
                }
                Ok(CompiledDistribution::Uniform(Uniform::new(low, high)))
            }
            Self::LogNormal { mu, sigma } => {
                if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
                    return Err(invalid(format!(
                        "log_normal requires finite mu and sigma >= 0, got mu={mu}, sigma={sigma}"
                    )));
                }
                LogNormal::new(mu, sigma)
                    .map(CompiledDistribution::LogNormal)
                    .map_err(|e| invalid(e.to_string()))
            }
            Self::Constant { value } => {
                if !value.is_finite() {
                    return Err(invalid(format!("constant must be finite, got {value}")));
                }
                Ok(CompiledDistribution::Constant(value))
            }
        }
    }
}

/// Ready-to-sample form of a [`Distribution`].
#[derive(Clone, Copy, Debug)]
pub enum CompiledDistribution {
    /// Gaussian.
    Normal(Normal<f64>),
    /// Uniform.
    Uniform(Uniform<f64>),
    /// Log-normal.
    LogNormal(LogNormal<f64>),
    /// Constant.
    Constant(f64),
}

impl CompiledDistribution {
    /// Draws one value, advancing `rng` (except for constants).
    #[inline]
    pub fn draw(&self, rng: &mut SamplerRng) -> f64 {
        match self {
            Self::Normal(d) => rng.sample(d),
            Self::Uniform(d) => rng.sample(d),
            Self::LogNormal(d) => rng.sample(d),
            Self::Constant(value) => *value,
        }
    }
}
