//! # Stochastic Parameter Sampling
//!
//! This module draws the stochastic inputs of each trial. A sampler is
//! configured with an ordered list of [`ParameterSpec`]s, each naming a
//! parameter, the [`Distribution`] it is drawn from, and the physical
//! [`Domain`] its values must lie in.
//!
//! ## Domain Validation
//!
//! A drawn value outside its declared domain is never clamped or silently
//! redrawn. [`SampleGenerator::draw`] reports a
//! [`SamplingError::DomainViolation`] and the caller decides what to do,
//! usually by way of a [`SamplingPolicy`].
//!
//! ## Reproducibility
//!
//! All draws come from a single seeded stream ([`SamplerRng`]). The same
//! seed and configuration always produce the same sequence of samples.
//!
//! ## Module Structure
//!
//! - [`distribution`]: distribution families and their parameters
//! - [`domain`]: open/closed intervals for physical validity
//! - [`sample`]: the immutable [`Sample`] tuple
//! - [`generator`]: [`SampleGenerator`], [`SamplerConfig`], [`SamplingPolicy`]
//! - [`rng`]: seeded PRNG wrapper
//!
//! ## Usage Example
//!
//! ```rust
//! use ensemble_core::sampling::{SampleGenerator, SamplerConfig, SamplingError};
//!
//! let mut generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 7).unwrap();
//! let sample = generator.draw().unwrap();
//! assert_eq!(sample.len(), 2);
//!
//! // A deterministic sample for the reference trial
//! let reference = generator.fixed(&[0.7, 0.0]).unwrap();
//! assert_eq!(reference.get("mach_number"), Some(0.7));
//!
//! // Mach 1.2 is outside the open interval (0, 1)
//! let err = generator.fixed(&[1.2, 0.0]).unwrap_err();
//! assert!(matches!(err, SamplingError::DomainViolation { .. }));
//! ```

pub mod distribution;
pub mod domain;
pub mod error;
pub mod generator;
pub mod rng;
pub mod sample;

pub use distribution::Distribution;
pub use domain::Domain;
pub use error::SamplingError;
pub use generator::{Draw, ParameterSpec, SampleGenerator, SamplerConfig, SamplingPolicy};
pub use rng::SamplerRng;
pub use sample::Sample;
