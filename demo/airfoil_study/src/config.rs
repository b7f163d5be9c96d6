//! Study configuration.
//!
//! One TOML file carries both the ensemble settings (`[batch]`,
//! `[[sampler.parameters]]`) and the flow case (`[case]`). The file is
//! located through `AIRFOIL_STUDY_CONFIG`; without it the built-in defaults
//! are used. `ENSEMBLE_*` environment variables override the batch section.

use crate::error::StudyError;
use ensemble_engine::config::EnsembleConfig;
use ensemble_engine::flow_case::FlowCase;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the study configuration file.
pub const CONFIG_ENV: &str = "AIRFOIL_STUDY_CONFIG";

/// Flow-case settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaseConfig {
    /// Name of the root model part.
    pub model_part_name: String,
    /// Solver project parameters (JSON); the built-in NACA 0012 case if absent.
    pub project_parameters: Option<PathBuf>,
    /// Number of mesh nodes.
    pub nodes: usize,
    /// Number of mesh elements.
    pub elements: usize,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            model_part_name: "MainModelPart".to_string(),
            project_parameters: None,
            nodes: 5_114,
            elements: 10_002,
        }
    }
}

impl CaseConfig {
    /// Builds the initialised baseline flow case.
    pub fn baseline(&self) -> Result<FlowCase, StudyError> {
        let mut case = match &self.project_parameters {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| StudyError::Io(format!("{}: {e}", path.display())))?;
                FlowCase::from_json_str(self.model_part_name.clone(), &json)?
            }
            None => FlowCase::airfoil_example(),
        };
        case.initialise(self.nodes, self.elements);
        Ok(case)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CaseSection {
    #[serde(default)]
    case: CaseConfig,
}

/// Complete study configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudyConfig {
    /// Batch and sampler settings.
    pub ensemble: EnsembleConfig,
    /// Flow case.
    pub case: CaseConfig,
}

impl StudyConfig {
    /// Parses a study TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, StudyError> {
        let ensemble = EnsembleConfig::from_toml_str(content)?;
        let section: CaseSection =
            toml::from_str(content).map_err(|e| StudyError::Parse(e.to_string()))?;

        Ok(Self {
            ensemble,
            case: section.case,
        })
    }

    /// Loads a study TOML file.
    pub fn load(path: &Path) -> Result<Self, StudyError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StudyError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Loads from `AIRFOIL_STUDY_CONFIG` if set, otherwise the defaults,
    /// then applies environment overrides.
    pub fn from_env() -> Result<Self, StudyError> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.with_env_override()
    }

    /// Applies `ENSEMBLE_*` overrides to the batch settings.
    pub fn with_env_override(mut self) -> Result<Self, StudyError> {
        self.ensemble = self.ensemble.with_env_override()?;
        Ok(self)
    }
}
