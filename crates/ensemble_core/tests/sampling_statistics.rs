//! Integration tests across sampling and statistics.
//!
//! Checks the pieces the engine composes: seeded draws feed the Welford
//! accumulator, and the reference comparison consumes its mean.

use approx::assert_relative_eq;
use ensemble_core::sampling::generator::{ANGLE_OF_ATTACK, MACH_NUMBER};
use ensemble_core::{
    relative_error, ComparisonError, RunningStats, SampleGenerator, SamplerConfig,
    SamplingError, SamplingPolicy,
};

#[test]
fn test_seeded_batches_are_reproducible() {
    let draw = |seed| {
        SampleGenerator::new(SamplerConfig::flow_defaults(), seed)
            .unwrap()
            .draw_batch(25, SamplingPolicy::FailFast)
            .unwrap()
    };

    assert_eq!(draw(2024), draw(2024));
    assert_ne!(draw(2024), draw(2025));
}

#[test]
fn test_mach_statistics_converge() {
    let mut generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 7).unwrap();

    let stats: RunningStats = (0..50_000)
        .map(|_| generator.draw().unwrap().get(MACH_NUMBER).unwrap())
        .collect();

    assert_relative_eq!(stats.mean(), 0.7, epsilon = 2e-4);
    assert_relative_eq!(stats.std_dev().unwrap(), 0.01, epsilon = 2e-4);
}

#[test]
fn test_angle_transform_mean() {
    let mut generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 99).unwrap();
    let samples = generator.draw_batch(10, SamplingPolicy::FailFast).unwrap();

    let doubled: Vec<f64> = samples
        .iter()
        .map(|s| s.as_ref().unwrap().get(ANGLE_OF_ATTACK).unwrap() * 2.0)
        .collect();
    let expected = doubled.iter().sum::<f64>() / doubled.len() as f64;

    let stats: RunningStats = doubled.iter().copied().collect();
    assert_eq!(stats.count(), 10);
    assert_relative_eq!(stats.mean(), expected, epsilon = 1e-9);
}

#[test]
fn test_reference_comparison_scenarios() {
    assert_relative_eq!(relative_error(0.45, 0.50).unwrap(), 0.10, epsilon = 1e-12);
    assert!(matches!(
        relative_error(0.45, 0.0),
        Err(ComparisonError::DivisionByZero { .. })
    ));
}

#[test]
fn test_mach_boundaries_rejected() {
    let generator = SampleGenerator::new(SamplerConfig::flow_defaults(), 0).unwrap();

    for mach in [0.0, 1.0, 1.2, -0.1] {
        assert!(
            matches!(
                generator.fixed(&[mach, 0.0]),
                Err(SamplingError::DomainViolation { .. })
            ),
            "mach {mach} should be rejected"
        );
    }
    assert!(generator.fixed(&[0.69, 0.0]).is_ok());
}
