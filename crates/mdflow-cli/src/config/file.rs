use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulationConfig {
    pub timestep: Option<f64>,
    pub steps: Option<u64>,
    pub output_frequency: Option<u64>,
    pub device_id: Option<usize>,
    pub virial: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePotentialConfig {
    pub cutoff: Option<f64>,
    pub method: Option<String>,
    pub include_intramolecular: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConstraintConfig {
    pub shake_tolerance: Option<f64>,
    pub shake_max_iterations: Option<usize>,
    pub rattle_tolerance: Option<f64>,
    pub rattle_max_iterations: Option<usize>,
    pub mshake_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileThermostatConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub target_temperature: Option<f64>,
    pub relaxation_time: Option<f64>,
    pub coupling_frequency: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileManostatConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub target_pressure: Option<f64>,
    pub relaxation_time: Option<f64>,
    pub compressibility: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileVelocityConfig {
    pub temperature: Option<f64>,
    pub seed: Option<u64>,
}

/// Run file as written by the user; every field is optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub system: Option<PathBuf>,
    pub forcefield: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub simulation: Option<FileSimulationConfig>,
    pub potential: Option<FilePotentialConfig>,
    pub constraints: Option<FileConstraintConfig>,
    pub thermostat: Option<FileThermostatConfig>,
    pub manostat: Option<FileManostatConfig>,
    pub initial_velocities: Option<FileVelocityConfig>,
}

impl FileConfig {
    /// Reads a run file. Relative paths inside it are resolved against the
    /// directory that contains the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading run configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let mut config: FileConfig =
            toml::from_str(&content).map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for slot in [
            &mut config.system,
            &mut config.forcefield,
            &mut config.output,
        ] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
        Ok(config)
    }
}
