//! Study error types.

use ensemble_engine::config::ConfigError;
use ensemble_engine::error::{EngineError, OverrideError};
use thiserror::Error;

/// Errors running an airfoil study.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Reading a file failed.
    #[error("IO error: {0}")]
    Io(String),

    /// A configuration file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid ensemble configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The project parameters are unusable.
    #[error("Flow case error: {0}")]
    Case(#[from] OverrideError),

    /// The batch aborted.
    #[error("Ensemble error: {0}")]
    Engine(#[from] EngineError),
}
