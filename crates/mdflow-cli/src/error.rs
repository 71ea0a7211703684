use mdflow::core::forcefield::params::ParamLoadError;
use mdflow::core::models::state::StateError;
use mdflow::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    ForceField(#[from] ParamLoadError),

    #[error("Invalid system: {0}")]
    System(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write energies: {0}")]
    Output(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
