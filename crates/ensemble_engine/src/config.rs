//! Batch configuration.
//!
//! [`BatchConfig`] controls one ensemble run: how many trials, which seed,
//! how many workers, the per-trial time budget, the sampling policy and the
//! optional reference sample. It can be built fluently through
//! [`BatchConfig::builder`] or loaded, together with the sampler, from a TOML
//! file as an [`EnsembleConfig`].
//!
//! # TOML Layout
//!
//! ```toml
//! [batch]
//! n_trials = 10
//! seed = 42
//! parallelism = 4
//! trial_timeout_secs = 30.0
//! sampling_policy = { policy = "resample", max_attempts = 5 }
//! reference_sample = [0.7, 0.0]
//!
//! [[sampler.parameters]]
//! name = "mach_number"
//! distribution = "normal"
//! mean = 0.7
//! stddev = 0.01
//! domain = { lower = 0.0, upper = 1.0 }
//! ```
//!
//! # Environment Overrides
//!
//! [`EnsembleConfig::with_env_override`] reads `ENSEMBLE_TRIALS`,
//! `ENSEMBLE_SEED`, `ENSEMBLE_PARALLELISM` and `ENSEMBLE_TRIAL_TIMEOUT_SECS`.

use ensemble_core::{SamplerConfig, SamplingPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of trials in one batch.
pub const MAX_TRIALS: usize = 1_000_000;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Trial count outside [1, MAX_TRIALS].
    #[error("Invalid trial count {0}: must be in range [1, 1_000_000]")]
    InvalidTrialCount(usize),

    /// Non-positive, non-finite or unrepresentable trial timeout.
    #[error("Invalid trial timeout {0}: must be a positive, representable number of seconds")]
    InvalidTimeout(f64),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },

    /// Reading or parsing a configuration file failed.
    #[error("Configuration file error: {0}")]
    FileError(String),

    /// An environment override could not be parsed.
    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Configuration of one ensemble batch.
///
/// # Examples
///
/// ```rust
/// use ensemble_engine::config::BatchConfig;
/// use ensemble_core::SamplingPolicy;
/// use std::time::Duration;
///
/// let config = BatchConfig::builder()
///     .n_trials(100)
///     .seed(42)
///     .parallelism(4)
///     .trial_timeout(Duration::from_secs(60))
///     .sampling_policy(SamplingPolicy::Resample { max_attempts: 3 })
///     .reference_sample(vec![0.7, 0.0])
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_trials(), 100);
/// assert_eq!(config.worker_count(), 4);
/// assert_eq!(config.trial_timeout(), Some(Duration::from_secs(60)));
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    n_trials: usize,
    seed: Option<u64>,
    parallelism: usize,
    trial_timeout_secs: Option<f64>,
    sampling_policy: SamplingPolicy,
    reference_sample: Option<Vec<f64>>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            n_trials: 10,
            seed: None,
            parallelism: 0,
            trial_timeout_secs: None,
            sampling_policy: SamplingPolicy::FailFast,
            reference_sample: None,
        }
    }
}

impl BatchConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Number of trials to dispatch.
    #[inline]
    pub fn n_trials(&self) -> usize {
        self.n_trials
    }

    /// Optional sampler seed; `None` means entropy-seeded.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Configured parallelism (0 = one worker per CPU).
    ///
    /// Bounds the pool workers only. The runner thread of a trial that timed
    /// out or was cancelled keeps running until the runner returns, so a
    /// runner that ignores its cancellation token can push the number of
    /// busy threads above this value. `BatchReport::detached_runners` counts
    /// them at join.
    #[inline]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Resolved number of worker threads (at least 1).
    pub fn worker_count(&self) -> usize {
        match self.parallelism {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Per-trial time budget.
    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Policy for out-of-domain samples.
    #[inline]
    pub fn sampling_policy(&self) -> SamplingPolicy {
        self.sampling_policy
    }

    /// Component values of the deterministic reference trial.
    #[inline]
    pub fn reference_sample(&self) -> Option<&[f64]> {
        self.reference_sample.as_deref()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `n_trials` is 0 or greater than [`MAX_TRIALS`]
    /// - `trial_timeout_secs` is not positive or too large for a `Duration`
    /// - `reference_sample` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trials == 0 || self.n_trials > MAX_TRIALS {
            return Err(ConfigError::InvalidTrialCount(self.n_trials));
        }
        if let Some(secs) = self.trial_timeout_secs {
            if !matches!(Duration::try_from_secs_f64(secs), Ok(limit) if !limit.is_zero()) {
                return Err(ConfigError::InvalidTimeout(secs));
            }
        }
        if let Some(values) = &self.reference_sample {
            if values.is_empty() {
                return Err(ConfigError::InvalidParameter {
                    name: "reference_sample",
                    value: "must contain at least one value".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`BatchConfig`].
#[derive(Clone, Debug, Default)]
pub struct BatchConfigBuilder {
    n_trials: Option<usize>,
    seed: Option<u64>,
    parallelism: usize,
    trial_timeout: Option<Duration>,
    sampling_policy: SamplingPolicy,
    reference_sample: Option<Vec<f64>>,
}

impl BatchConfigBuilder {
    /// Sets the number of trials, in [1, 1_000_000].
    #[inline]
    pub fn n_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = Some(n_trials);
        self
    }

    /// Sets the sampler seed for reproducibility.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the worker count; 0 uses one worker per CPU, 1 runs sequentially.
    #[inline]
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Bounds each trial's run time.
    #[inline]
    pub fn trial_timeout(mut self, timeout: Duration) -> Self {
        self.trial_timeout = Some(timeout);
        self
    }

    /// Sets the policy for out-of-domain samples.
    #[inline]
    pub fn sampling_policy(mut self, policy: SamplingPolicy) -> Self {
        self.sampling_policy = policy;
        self
    }

    /// Requests a deterministic reference trial at `values`.
    #[inline]
    pub fn reference_sample(mut self, values: Vec<f64>) -> Self {
        self.reference_sample = Some(values);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `n_trials` is not set or any value is invalid.
    pub fn build(self) -> Result<BatchConfig, ConfigError> {
        let n_trials = self.n_trials.ok_or(ConfigError::InvalidParameter {
            name: "n_trials",
            value: "must be specified".to_string(),
        })?;

        let config = BatchConfig {
            n_trials,
            seed: self.seed,
            parallelism: self.parallelism,
            trial_timeout_secs: self.trial_timeout.map(|d| d.as_secs_f64()),
            sampling_policy: self.sampling_policy,
            reference_sample: self.reference_sample,
        };

        config.validate()?;
        Ok(config)
    }
}

/// File-level configuration: batch settings plus sampler.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EnsembleConfig {
    /// Batch settings.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Stochastic parameters; defaults to [`SamplerConfig::flow_defaults`].
    #[serde(default = "SamplerConfig::flow_defaults")]
    pub sampler: SamplerConfig,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            sampler: SamplerConfig::flow_defaults(),
        }
    }
}

impl EnsembleConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EnsembleConfig = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Applies `ENSEMBLE_*` environment overrides and re-validates.
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var("ENSEMBLE_TRIALS") {
            self.batch.n_trials = parse_env("ENSEMBLE_TRIALS", &value)?;
        }
        if let Ok(value) = std::env::var("ENSEMBLE_SEED") {
            self.batch.seed = Some(parse_env("ENSEMBLE_SEED", &value)?);
        }
        if let Ok(value) = std::env::var("ENSEMBLE_PARALLELISM") {
            self.batch.parallelism = parse_env("ENSEMBLE_PARALLELISM", &value)?;
        }
        if let Ok(value) = std::env::var("ENSEMBLE_TRIAL_TIMEOUT_SECS") {
            self.batch.trial_timeout_secs = Some(parse_env("ENSEMBLE_TRIAL_TIMEOUT_SECS", &value)?);
        }

        self.validate()?;
        Ok(self)
    }

    /// Validates batch settings and sampler.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.batch.validate()?;
        self.sampler
            .validate()
            .map_err(|e| ConfigError::InvalidParameter {
                name: "sampler",
                value: e.to_string(),
            })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{name}={value:?} is not a valid value")))
}
