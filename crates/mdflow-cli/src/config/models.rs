use mdflow::engine::config::SimulationConfig;
use std::path::PathBuf;

/// Fully resolved configuration of one CLI invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub system_path: PathBuf,
    pub forcefield_path: PathBuf,
    pub output_path: PathBuf,
    pub simulation: SimulationConfig,
}
