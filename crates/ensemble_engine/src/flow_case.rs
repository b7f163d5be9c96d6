//! Potential-flow case: the baseline state of an airfoil study.
//!
//! A [`FlowCase`] pairs a [`ModelPart`] descriptor with the JSON project
//! parameters of the flow solver. Each trial overrides the free-stream
//! velocity of every far-field boundary condition from its sampled Mach
//! number and angle of attack:
//!
//! ```text
//! |v| = Mach * a_inf            (a_inf = 340 m/s)
//! v   = (|v| cos(alpha), |v| sin(alpha), 0)
//! ```

use crate::error::OverrideError;
use crate::snapshot::TrialState;
use ensemble_core::sampling::generator::{ANGLE_OF_ATTACK, MACH_NUMBER};
use ensemble_core::Sample;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Speed of sound at infinity [m/s].
pub const SPEED_OF_SOUND: f64 = 340.0;

/// `python_module` of the far-field boundary-condition process.
pub const FAR_FIELD_PROCESS: &str = "apply_far_field_process";

const PROCESS_LIST_POINTER: &str = "/processes/boundary_conditions_process_list";
const INPUT_FILENAME_POINTER: &str = "/solver_settings/model_import_settings/input_filename";

/// Descriptor of the computational mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelPart {
    /// Model part name.
    pub name: String,
    /// Mesh file the model part is read from (without extension).
    pub input_filename: String,
    /// Whether the mesh has been read.
    pub loaded: bool,
    /// Number of nodes.
    pub node_count: usize,
    /// Number of elements.
    pub element_count: usize,
}

/// Baseline state of a potential-flow airfoil simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowCase {
    /// Mesh descriptor.
    pub model: ModelPart,
    /// Solver project parameters.
    pub parameters: Value,
    /// Named scalar results written by the solver.
    #[serde(default)]
    pub results: BTreeMap<String, f64>,
}

impl FlowCase {
    /// Builds an uninitialised case from project parameters.
    ///
    /// The mesh file name is read from
    /// `solver_settings.model_import_settings.input_filename`.
    pub fn from_parameters(model_name: impl Into<String>, parameters: Value) -> Result<Self, OverrideError> {
        let input_filename = parameters
            .pointer(INPUT_FILENAME_POINTER)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OverrideError::Malformed(
                    "solver_settings.model_import_settings.input_filename is missing".to_string(),
                )
            })?
            .to_string();

        Ok(Self {
            model: ModelPart {
                name: model_name.into(),
                input_filename,
                loaded: false,
                node_count: 0,
                element_count: 0,
            },
            parameters,
            results: BTreeMap::new(),
        })
    }

    /// Parses project parameters from a JSON document.
    pub fn from_json_str(model_name: impl Into<String>, json: &str) -> Result<Self, OverrideError> {
        let parameters: Value =
            serde_json::from_str(json).map_err(|e| OverrideError::Malformed(e.to_string()))?;
        Self::from_parameters(model_name, parameters)
    }

    /// NACA 0012 airfoil in a far-field box, not yet initialised.
    pub fn airfoil_example() -> Self {
        let parameters = json!({
            "problem_data": {
                "problem_name": "naca0012",
                "echo_level": 0
            },
            "solver_settings": {
                "solver_type": "potential_flow",
                "domain_size": 2,
                "model_part_name": "MainModelPart",
                "model_import_settings": {
                    "input_type": "mdpa",
                    "input_filename": "naca0012_mesh"
                }
            },
            "processes": {
                "boundary_conditions_process_list": [
                    {
                        "python_module": FAR_FIELD_PROCESS,
                        "Parameters": {
                            "model_part_name": "MainModelPart.PotentialWallCondition2D_Far_field_Auto1",
                            "velocity_infinity": [0.0, 0.0, 0.0]
                        }
                    },
                    {
                        "python_module": "define_wake_process_2d",
                        "Parameters": {
                            "model_part_name": "MainModelPart.Body2D_Body"
                        }
                    }
                ]
            }
        });

        Self {
            model: ModelPart {
                name: "MainModelPart".to_string(),
                input_filename: "naca0012_mesh".to_string(),
                loaded: false,
                node_count: 0,
                element_count: 0,
            },
            parameters,
            results: BTreeMap::new(),
        }
    }

    /// Marks the mesh as read with the given sizes.
    pub fn initialise(&mut self, node_count: usize, element_count: usize) {
        self.model.loaded = true;
        self.model.node_count = node_count;
        self.model.element_count = element_count;
    }

    /// Free-stream velocity of the first far-field process, if set.
    pub fn free_stream_velocity(&self) -> Option<[f64; 3]> {
        let process = self
            .parameters
            .pointer(PROCESS_LIST_POINTER)?
            .as_array()?
            .iter()
            .find(|p| p.get("python_module").and_then(Value::as_str) == Some(FAR_FIELD_PROCESS))?;

        let v = process.pointer("/Parameters/velocity_infinity")?.as_array()?;
        match v.as_slice() {
            [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
            _ => None,
        }
    }

    /// Writes `velocity` into every far-field process.
    fn set_free_stream_velocity(&mut self, velocity: [f64; 3]) -> Result<usize, OverrideError> {
        let processes = self
            .parameters
            .pointer_mut(PROCESS_LIST_POINTER)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                OverrideError::MissingTarget("processes.boundary_conditions_process_list".to_string())
            })?;

        let mut applied = 0;
        for process in processes.iter_mut() {
            if process.get("python_module").and_then(Value::as_str) != Some(FAR_FIELD_PROCESS) {
                continue;
            }
            let settings = process
                .get_mut("Parameters")
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    OverrideError::Malformed(format!("{FAR_FIELD_PROCESS} has no Parameters object"))
                })?;
            settings.insert("velocity_infinity".to_string(), json!(velocity));
            applied += 1;
        }

        if applied == 0 {
            return Err(OverrideError::MissingTarget(format!(
                "no {FAR_FIELD_PROCESS} in boundary_conditions_process_list"
            )));
        }
        Ok(applied)
    }
}

impl TrialState for FlowCase {
    fn check_initialised(&self) -> Result<(), String> {
        if !self.model.loaded {
            return Err(format!(
                "model part '{}' has not been read from '{}'",
                self.model.name, self.model.input_filename
            ));
        }
        if self.model.node_count == 0 {
            return Err(format!("model part '{}' has no nodes", self.model.name));
        }
        Ok(())
    }

    fn apply_override(&mut self, sample: &Sample) -> Result<(), OverrideError> {
        let mach = sample
            .get(MACH_NUMBER)
            .ok_or_else(|| OverrideError::MissingParameter(MACH_NUMBER.to_string()))?;
        let alpha = sample
            .get(ANGLE_OF_ATTACK)
            .ok_or_else(|| OverrideError::MissingParameter(ANGLE_OF_ATTACK.to_string()))?;

        let speed = mach * SPEED_OF_SOUND;
        self.set_free_stream_velocity([speed * alpha.cos(), speed * alpha.sin(), 0.0])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use approx::assert_relative_eq;
    use ensemble_core::{Distribution, Domain, ParameterSpec, SampleGenerator, SamplerConfig};

    fn flow_sample(mach: f64, alpha: f64) -> Sample {
        SampleGenerator::new(SamplerConfig::flow_defaults(), 0)
            .unwrap()
            .fixed(&[mach, alpha])
            .unwrap()
    }

    fn ready_case() -> FlowCase {
        let mut case = FlowCase::airfoil_example();
        case.initialise(5_000, 9_800);
        case
    }

    #[test]
    fn test_capture_requires_loaded_mesh() {
        let err = Snapshot::capture(&FlowCase::airfoil_example()).unwrap_err();
        assert!(err.to_string().contains("naca0012_mesh"));

        let mut empty = FlowCase::airfoil_example();
        empty.initialise(0, 0);
        assert!(Snapshot::capture(&empty).is_err());

        assert!(Snapshot::capture(&ready_case()).is_ok());
    }

    #[test]
    fn test_override_sets_far_field_velocity() {
        let mut case = ready_case();
        case.apply_override(&flow_sample(0.7, 0.0)).unwrap();

        let v = case.free_stream_velocity().unwrap();
        assert_relative_eq!(v[0], 238.0, epsilon = 1e-12);
        assert_relative_eq!(v[1], 0.0, epsilon = 1e-12);
        assert_eq!(v[2], 0.0);
    }

    #[test]
    fn test_override_with_angle() {
        let mut case = ready_case();
        case.apply_override(&flow_sample(0.5, 0.1)).unwrap();

        let v = case.free_stream_velocity().unwrap();
        assert_relative_eq!(v[0], 170.0 * 0.1_f64.cos(), epsilon = 1e-12);
        assert_relative_eq!(v[1], 170.0 * 0.1_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_override_leaves_other_processes_untouched() {
        let mut case = ready_case();
        let wake_before = case.parameters.pointer(
            "/processes/boundary_conditions_process_list/1",
        ).cloned();

        case.apply_override(&flow_sample(0.7, 0.01)).unwrap();

        let wake_after = case
            .parameters
            .pointer("/processes/boundary_conditions_process_list/1")
            .cloned();
        assert_eq!(wake_before, wake_after);
    }

    #[test]
    fn test_override_does_not_touch_snapshot() {
        let snapshot = Snapshot::capture(&ready_case()).unwrap();

        let mut trial = snapshot.materialise().unwrap();
        trial.apply_override(&flow_sample(0.72, 0.005)).unwrap();

        let fresh = snapshot.materialise().unwrap();
        assert_eq!(fresh.free_stream_velocity(), Some([0.0, 0.0, 0.0]));
        assert_eq!(fresh, ready_case());
    }

    #[test]
    fn test_override_missing_component() {
        let config = SamplerConfig::new(vec![ParameterSpec::new(
            MACH_NUMBER,
            Distribution::Constant { value: 0.7 },
            Domain::open(0.0, 1.0),
        )]);
        let sample = SampleGenerator::new(config, 0).unwrap().fixed(&[0.7]).unwrap();

        let err = ready_case().apply_override(&sample).unwrap_err();
        assert_eq!(err, OverrideError::MissingParameter(ANGLE_OF_ATTACK.to_string()));
    }

    #[test]
    fn test_override_without_far_field() {
        let mut case = ready_case();
        case.parameters["processes"]["boundary_conditions_process_list"] = json!([]);

        let err = case.apply_override(&flow_sample(0.7, 0.0)).unwrap_err();
        assert!(matches!(err, OverrideError::MissingTarget(_)));
    }

    #[test]
    fn test_from_json_reads_input_filename() {
        let json = r#"{
            "solver_settings": {
                "model_import_settings": { "input_filename": "rae2822" }
            },
            "processes": { "boundary_conditions_process_list": [] }
        }"#;

        let case = FlowCase::from_json_str("MainModelPart", json).unwrap();
        assert_eq!(case.model.input_filename, "rae2822");
        assert!(!case.model.loaded);
    }

    #[test]
    fn test_from_json_missing_filename() {
        let err = FlowCase::from_json_str("MainModelPart", "{}").unwrap_err();
        assert!(matches!(err, OverrideError::Malformed(_)));

        let err = FlowCase::from_json_str("MainModelPart", "{not json").unwrap_err();
        assert!(matches!(err, OverrideError::Malformed(_)));
    }
}
