//! Runtime parameters.
//!
//! Parameters are a plain value type owned by the simulation — there is no
//! global parameter singleton.  They are typically loaded from a
//! `cytodyn.toml` file searched in the working directory and then its parent;
//! a missing file falls back to defaults with a warning, and unknown keys are
//! reported but ignored so configs stay forward-compatible.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Top-level runtime configuration.
#[derive(Clone, Debug, Default, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct Params {
    pub simulation: SimulationParams,
    pub visualization: VisualizationParams,
    pub development: DevelopmentParams,
    pub experimental: ExperimentalParams,

    /// Repeatable `[[visualize_sim_object]]` tables: which agent kinds to
    /// export and which extra data members to include.  `[[visualize_agent]]`
    /// is accepted as an alias.
    #[serde(rename = "visualize_sim_object", alias = "visualize_agent")]
    pub visualize_agents: Vec<VisualizeAgent>,

    /// Repeatable `[[visualize_diffusion]]` tables: which substances to
    /// export, and whether to include the gradient.
    pub visualize_diffusion: Vec<VisualizeDiffusion>,

    #[serde(flatten)]
    unknown: HashMap<String, toml::Value>,
}

/// One `[[visualize_agent]]` entry.
#[derive(Clone, Debug, Default, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct VisualizeAgent {
    /// Agent kind name (e.g. `"Cell"`).
    pub name: String,
    /// Data members exported in addition to the kind's required set.
    pub additional_data_members: Vec<String>,
}

/// One `[[visualize_diffusion]]` entry.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct VisualizeDiffusion {
    /// Substance display name.
    pub name: String,
    /// Export the concentration field.
    pub concentration: bool,
    /// Export the (raw) gradient field.
    pub gradient: bool,
}

impl Default for VisualizeDiffusion {
    fn default() -> Self {
        VisualizeDiffusion {
            name: String::new(),
            concentration: true,
            gradient: false,
        }
    }
}

/// `[simulation]` table.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Backup file path; empty string disables backups.
    pub backup_file: String,
    /// Restore file path; empty string disables restoring.
    pub restore_file: String,
    /// Wall-clock seconds between two backups.
    pub backup_interval: u64,
    /// Duration of one simulation step (hours).
    pub time_step: f64,
    /// Maximum jump a point mass may make in one step.
    pub max_displacement: f64,
    /// Compute mechanical interactions between agents.
    pub run_mechanical_interactions: bool,
    /// Enforce a cubic bound on agent positions.
    pub bound_space: bool,
    /// Lower position bound per axis (only with `bound_space`).
    pub min_bound: f64,
    /// Upper position bound per axis (only with `bound_space`).
    pub max_bound: f64,
    /// Let substances leave the simulation space instead of accumulating
    /// at the edges.
    pub leaking_edges: bool,
    /// Recompute diffusion gradients every diffusion step.
    pub calculate_gradients: bool,

    #[serde(flatten)]
    unknown: HashMap<String, toml::Value>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            backup_file: String::new(),
            restore_file: String::new(),
            backup_interval: 1800,
            time_step: 0.01,
            max_displacement: 3.0,
            run_mechanical_interactions: true,
            bound_space: false,
            min_bound: 0.0,
            max_bound: 100.0,
            leaking_edges: true,
            calculate_gradients: true,
            unknown: HashMap::new(),
        }
    }
}

/// `[visualization]` table.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct VisualizationParams {
    /// Live visualization hook (consumed by external adaptors).
    pub live: bool,
    /// Export agent snapshots for post-hoc visualization.
    pub export: bool,
    /// Export every N steps.
    pub export_interval: u64,
    /// Output directory for exported files.
    pub output_dir: String,

    #[serde(flatten)]
    unknown: HashMap<String, toml::Value>,
}

impl Default for VisualizationParams {
    fn default() -> Self {
        VisualizationParams {
            live: false,
            export: false,
            export_interval: 1,
            output_dir: "output".to_string(),
            unknown: HashMap::new(),
        }
    }
}

/// `[development]` table.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct DevelopmentParams {
    /// Collect and print per-operation wall-clock statistics.
    pub statistics: bool,
    /// Log the current step number while running.
    pub show_simulation_step: bool,
    /// Log every N steps.
    pub simulation_step_freq: u64,

    #[serde(flatten)]
    unknown: HashMap<String, toml::Value>,
}

impl Default for DevelopmentParams {
    fn default() -> Self {
        DevelopmentParams {
            statistics: false,
            show_simulation_step: true,
            simulation_step_freq: 10,
            unknown: HashMap::new(),
        }
    }
}

/// `[experimental]` table.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct ExperimentalParams {
    /// Run the displacement operation on an accelerator when available.
    pub use_gpu: bool,
    /// Prefer OpenCL over CUDA when both are available.
    pub use_opencl: bool,
    /// Index of the preferred GPU.
    pub preferred_gpu: u32,

    #[serde(flatten)]
    unknown: HashMap<String, toml::Value>,
}

impl Default for ExperimentalParams {
    fn default() -> Self {
        ExperimentalParams {
            use_gpu: false,
            use_opencl: false,
            preferred_gpu: 0,
            unknown: HashMap::new(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Default config file name, searched in `./` then `../`.
pub const CONFIG_FILE: &str = "cytodyn.toml";

impl Params {
    /// Parse from TOML text.  Unknown keys are logged as warnings.
    pub fn from_toml_str(text: &str) -> CoreResult<Params> {
        let params: Params =
            toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))?;
        params.warn_unknown();
        Ok(params)
    }

    /// Load from `cytodyn.toml` in the working directory or its parent.
    ///
    /// A missing file is recoverable: defaults are returned with a warning.
    /// A malformed file is a configuration error.
    pub fn load() -> CoreResult<Params> {
        for dir in ["./", "../"] {
            let path = Path::new(dir).join(CONFIG_FILE);
            if path.is_file() {
                let text = std::fs::read_to_string(&path)?;
                return Self::from_toml_str(&text);
            }
        }
        log::warn!(
            "Params: no {CONFIG_FILE} found in ./ or ../ — using default parameters"
        );
        Ok(Params::default())
    }

    fn warn_unknown(&self) {
        for key in self.unknown.keys() {
            log::warn!("Params: unknown configuration key '{key}' ignored");
        }
        let sections: [(&str, &HashMap<String, toml::Value>); 4] = [
            ("simulation", &self.simulation.unknown),
            ("visualization", &self.visualization.unknown),
            ("development", &self.development.unknown),
            ("experimental", &self.experimental.unknown),
        ];
        for (section, unknown) in sections {
            for key in unknown.keys() {
                log::warn!("Params: unknown configuration key '{section}.{key}' ignored");
            }
        }
    }

    /// `true` if any unknown keys were present in the parsed config.
    pub fn has_unknown_keys(&self) -> bool {
        !self.unknown.is_empty()
            || !self.simulation.unknown.is_empty()
            || !self.visualization.unknown.is_empty()
            || !self.development.unknown.is_empty()
            || !self.experimental.unknown.is_empty()
    }
}
