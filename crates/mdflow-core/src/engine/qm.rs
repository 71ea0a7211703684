//! Boundary to an external quantum-mechanical force provider.
//!
//! The provider is called synchronously on the stepping thread while a
//! scoped watchdog thread waits for it. If the time budget expires first, the
//! watchdog sets the [`CancellationToken`] and the step fails with
//! [`EngineError::QmTimeout`]. Cancellation is cooperative: providers are
//! expected to poll the token.

use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::{FlatView, SimulationState};
use crate::engine::error::EngineError;
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Shared stop flag set by the watchdog when the time budget is exhausted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The geometry handed to the provider for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct QmRequest {
    pub step: u64,
    /// Positions in Å, in flat atom order.
    pub positions: Vec<Vector3<f64>>,
    pub atom_names: Vec<String>,
    /// Cell matrix whose columns are the lattice vectors, in Å.
    pub cell: Matrix3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QmResult {
    /// Forces in kcal/(mol·Å), one per atom in request order.
    pub forces: Vec<Vector3<f64>>,
    /// Energy in kcal/mol.
    pub energy: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QmError {
    #[error("QM calculation failed: {0}")]
    Failed(String),
    #[error("QM calculation was cancelled")]
    Cancelled,
    #[error("QM provider returned {found} forces for {expected} atoms")]
    WrongAtomCount { expected: usize, found: usize },
}

/// A "compute forces for this geometry" entry point.
pub trait QmForceProvider: Send {
    fn compute(&mut self, request: &QmRequest, cancel: &CancellationToken) -> Result<QmResult, QmError>;
}

/// Runs a [`QmForceProvider`] under a time budget.
pub struct QmRunner {
    provider: Box<dyn QmForceProvider>,
    timeout: Duration,
    atom_names: Vec<String>,
}

impl std::fmt::Debug for QmRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QmRunner")
            .field("timeout", &self.timeout)
            .field("atoms", &self.atom_names.len())
            .finish()
    }
}

impl QmRunner {
    pub fn new(provider: Box<dyn QmForceProvider>, timeout: Duration, state: &SimulationState) -> Self {
        Self {
            provider,
            timeout,
            atom_names: state.atoms_iter().map(|a| a.name.clone()).collect(),
        }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests forces for the current geometry, adds them to `view` and
    /// returns the QM energy.
    pub fn evaluate(&mut self, step: u64, view: &mut FlatView, sim_box: &SimulationBox) -> Result<f64, EngineError> {
        let request = QmRequest {
            step,
            positions: (0..view.number_of_atoms()).map(|i| view.position(i)).collect(),
            atom_names: self.atom_names.clone(),
            cell: *sim_box.cell(),
        };

        let result = self.run_with_watchdog(&request).map_err(|e| match e {
            QmError::Cancelled => EngineError::QmTimeout {
                step,
                timeout: self.timeout,
            },
            other => EngineError::QmFailed {
                step,
                message: other.to_string(),
            },
        })?;

        if result.forces.len() != view.number_of_atoms() {
            return Err(EngineError::QmFailed {
                step,
                message: QmError::WrongAtomCount {
                    expected: view.number_of_atoms(),
                    found: result.forces.len(),
                }
                .to_string(),
            });
        }
        for (atom, force) in result.forces.iter().enumerate() {
            view.add_force(atom, *force);
        }
        Ok(result.energy)
    }

    fn run_with_watchdog(&mut self, request: &QmRequest) -> Result<QmResult, QmError> {
        let token = CancellationToken::new();
        let timeout = self.timeout;
        let provider = &mut self.provider;
        let started = Instant::now();

        let result = thread::scope(|scope| {
            let (done, finished) = mpsc::channel::<()>();
            let watchdog_token = token.clone();
            scope.spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = finished.recv_timeout(timeout) {
                    warn!(?timeout, "QM provider exceeded its time budget; cancelling.");
                    watchdog_token.cancel();
                }
            });
            let result = provider.compute(request, &token);
            // The watchdog may already have exited; a closed channel is fine.
            let _ = done.send(());
            result
        });

        debug!(step = request.step, elapsed = ?started.elapsed(), "QM call returned.");
        if token.is_cancelled() {
            return Err(QmError::Cancelled);
        }
        result
    }
}
