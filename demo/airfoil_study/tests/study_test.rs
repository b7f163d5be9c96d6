//! Airfoil study end-to-end tests.

use airfoil_study::prelude::*;
use airfoil_study::surrogate::{lift_coefficient, ZERO_LIFT_ANGLE};
use approx::assert_relative_eq;
use ensemble_engine::error::TrialErrorKind;

const STUDY: &str = r#"
    [batch]
    n_trials = 48
    seed = 7
    parallelism = 4
    trial_timeout_secs = 30.0
    reference_sample = [0.7, 0.0]

    [case]
    nodes = 320
    elements = 600
"#;

#[test]
fn test_study_produces_lift_statistics() {
    let config = StudyConfig::from_toml_str(STUDY).unwrap();
    let report = run_study(&config).unwrap();

    assert_eq!(report.trials_requested, 48);
    assert_eq!(report.succeeded(), 48);
    assert_eq!(report.failures.count(TrialErrorKind::RunnerFailure), 0);

    let reference_cl = lift_coefficient(0.7, 0.0, ZERO_LIFT_ANGLE);
    let reference = report.reference.as_ref().unwrap();
    assert_relative_eq!(reference.outcome.value().unwrap(), reference_cl, max_relative = 1e-9);

    // Angle of attack spread dominates: sigma_Cl ~ 2 pi * 0.01 / sqrt(0.51).
    let summary = report.summary();
    assert!(summary.std_dev.unwrap() > 0.02 && summary.std_dev.unwrap() < 0.2);
    assert!(report.relative_error().unwrap() < 0.1);
}

#[test]
fn test_study_is_reproducible() {
    let config = StudyConfig::from_toml_str(STUDY).unwrap();
    let first = run_study(&config).unwrap();
    let second = run_study(&config).unwrap();

    assert_eq!(first.raw_values(), second.raw_values());
    assert_eq!(first.statistics.count(), second.statistics.count());
}

#[test]
fn test_report_serialises_to_json() {
    let config = StudyConfig::from_toml_str(STUDY).unwrap();
    let report = run_study(&config).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["statistics"]["count"], serde_json::json!(48));
    assert!(json["statistics"]["mean"].as_f64().unwrap() > 0.5);
    assert_eq!(json["reference"]["sample"]["names"][0], "mach_number");
    assert_eq!(json["values"].as_array().unwrap().len(), 48);
}

#[test]
fn test_bundled_configuration_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/study.toml");
    let config = StudyConfig::load(&path).unwrap();

    assert_eq!(config.ensemble.batch.n_trials(), 200);
    assert_eq!(config.ensemble.batch.reference_sample(), Some(&[0.7, 0.0][..]));
    assert_eq!(config.case.nodes, 5114);
}
