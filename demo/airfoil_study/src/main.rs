//! Airfoil study CLI
//!
//! Runs one ensemble batch and writes the report as JSON to stdout.

use airfoil_study::prelude::*;
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("airfoil_study=info".parse()?)
                .add_directive("ensemble_engine=info".parse()?),
        )
        .init();

    tracing::info!("Airfoil study starting...");

    let config = StudyConfig::from_env()?;
    tracing::info!(
        n_trials = config.ensemble.batch.n_trials(),
        parameters = config.ensemble.sampler.len(),
        "Configuration loaded"
    );

    let report = run_study(&config)?;
    if !report.failures.is_empty() {
        tracing::warn!(failed = report.failed(), "Some trials failed");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
