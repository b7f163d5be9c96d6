//! # Ensemble Core (Layer 1: Foundation)
//!
//! ## Layer 1 Role
//!
//! ensemble_core holds the deterministic building blocks of a stochastic
//! simulation ensemble:
//! - Seeded sampling of named parameters with declared physical domains
//! - One-pass, numerically stable running statistics (Welford)
//! - Relative-error comparison against a deterministic reference trial
//!
//! Nothing in this crate spawns threads or owns shared mutable state.
//! Concurrency lives in `ensemble_engine`, which consumes these types.
//!
//! ## Usage Example
//!
//! ```rust
//! use ensemble_core::sampling::{SampleGenerator, SamplerConfig};
//! use ensemble_core::stats::RunningStats;
//!
//! let mut generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 42).unwrap();
//!
//! let mut stats = RunningStats::new();
//! for _ in 0..100 {
//!     let sample = generator.draw().unwrap();
//!     stats = stats.update(sample.get("mach_number").unwrap());
//! }
//!
//! assert_eq!(stats.count(), 100);
//! assert!((stats.mean() - 0.7).abs() < 0.01);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod compare;
pub mod sampling;
pub mod stats;

pub use compare::{relative_error, ComparisonError};
pub use sampling::{
    Distribution, Domain, ParameterSpec, Sample, SampleGenerator, SamplerConfig, SamplingError,
    SamplingPolicy,
};
pub use stats::RunningStats;
