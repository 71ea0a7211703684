use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::config::ConfigError;
use super::device::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Shake,
    Rattle,
    MShake,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::Shake => "SHAKE",
            ConstraintKind::Rattle => "RATTLE",
            ConstraintKind::MShake => "M-SHAKE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "{kind} did not converge after {iterations} iterations (tolerance {tolerance:e}, max deviation {max_deviation:e})"
    )]
    Convergence {
        kind: ConstraintKind,
        iterations: usize,
        tolerance: f64,
        max_deviation: f64,
    },

    #[error("{0}")]
    Device(#[from] DeviceError),

    #[error("QM force provider exceeded its time budget of {timeout:?} at step {step}")]
    QmTimeout { step: u64, timeout: Duration },

    #[error("QM force provider failed at step {step}: {message}")]
    QmFailed { step: u64, message: String },

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
