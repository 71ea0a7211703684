//! Velocity-Verlet integration split into two half steps.
//!
//! The step driver calls [`VelocityVerlet::first_step`], evaluates forces,
//! then calls [`VelocityVerlet::second_step`]. The phase machine rejects any
//! other order.

use super::error::EngineError;
use crate::core::constants::{FS_TO_S, V_VERLET_VELOCITY_FACTOR};
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::{FlatView, KinematicsMut};
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Uninitialized,
    Ready,
    FirstHalfStep,
    ForcesEvaluated,
    SecondHalfStep,
    Finished,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl StepPhase {
    fn can_advance_to(self, next: StepPhase) -> bool {
        use StepPhase::*;
        matches!(
            (self, next),
            (Uninitialized, Ready)
                | (Ready, FirstHalfStep)
                | (FirstHalfStep, ForcesEvaluated)
                | (ForcesEvaluated, SecondHalfStep)
                | (SecondHalfStep, FirstHalfStep)
                | (Ready, Finished)
                | (SecondHalfStep, Finished)
        )
    }
}

#[derive(Debug, Clone)]
pub struct VelocityVerlet {
    phase: StepPhase,
}

impl Default for VelocityVerlet {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityVerlet {
    pub fn new() -> Self {
        Self {
            phase: StepPhase::Uninitialized,
        }
    }

    #[inline]
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    fn advance(&mut self, next: StepPhase) -> Result<(), EngineError> {
        if !self.phase.can_advance_to(next) {
            return Err(EngineError::Internal(format!(
                "illegal integrator transition {} -> {}",
                self.phase, next
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Marks initial forces as available.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        self.advance(StepPhase::Ready)
    }

    /// Half kick, drift, force reset; then molecular centres of mass.
    pub fn first_step(
        &mut self,
        view: &mut FlatView,
        sim_box: &SimulationBox,
        timestep: f64,
    ) -> Result<(), EngineError> {
        self.advance(StepPhase::FirstHalfStep)?;
        kick_and_drift(view.kinematics_mut(), timestep);
        view.recompute_centers_of_mass(sim_box);
        Ok(())
    }

    pub fn forces_evaluated(&mut self) -> Result<(), EngineError> {
        self.advance(StepPhase::ForcesEvaluated)
    }

    /// Second half kick with the freshly computed forces.
    pub fn second_step(&mut self, view: &mut FlatView, timestep: f64) -> Result<(), EngineError> {
        self.advance(StepPhase::SecondHalfStep)?;
        kick(view.kinematics_mut(), timestep);
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), EngineError> {
        self.advance(StepPhase::Finished)
    }
}

fn kick_and_drift(kin: KinematicsMut<'_>, timestep: f64) {
    #[cfg(not(feature = "parallel"))]
    let atoms = kin
        .velocities
        .chunks_exact_mut(3)
        .zip(kin.positions.chunks_exact_mut(3))
        .zip(kin.forces.chunks_exact_mut(3))
        .zip(kin.masses.iter());
    #[cfg(feature = "parallel")]
    let atoms = kin
        .velocities
        .par_chunks_exact_mut(3)
        .zip(kin.positions.par_chunks_exact_mut(3))
        .zip(kin.forces.par_chunks_exact_mut(3))
        .zip(kin.masses.par_iter());

    atoms.for_each(|(((v, x), f), &mass)| {
        for d in 0..3 {
            v[d] += timestep * f[d] / mass * V_VERLET_VELOCITY_FACTOR;
            x[d] += timestep * v[d] * FS_TO_S;
            f[d] = 0.0;
        }
    });
}

fn kick(kin: KinematicsMut<'_>, timestep: f64) {
    #[cfg(not(feature = "parallel"))]
    let atoms = kin
        .velocities
        .chunks_exact_mut(3)
        .zip(kin.forces.chunks_exact(3))
        .zip(kin.masses.iter());
    #[cfg(feature = "parallel")]
    let atoms = kin
        .velocities
        .par_chunks_exact_mut(3)
        .zip(kin.forces.par_chunks_exact(3))
        .zip(kin.masses.par_iter());

    atoms.for_each(|((v, f), &mass)| {
        for d in 0..3 {
            v[d] += timestep * f[d] / mass * V_VERLET_VELOCITY_FACTOR;
        }
    });
}
