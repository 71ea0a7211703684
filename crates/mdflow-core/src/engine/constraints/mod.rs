//! # Constraint Solver
//!
//! Pairwise bond constraints are solved with SHAKE after the position update
//! and RATTLE after the second velocity half step. Rigid molecules declared
//! through an [`MShakeReference`] are fitted to their reference geometry
//! instead (M-Shake), and their velocities are projected onto rigid motion.

pub(crate) mod mshake;
pub(crate) mod shake;

use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::{FlatView, SimulationState};
use crate::engine::config::ConstraintConfig;
use crate::engine::error::EngineError;
use mshake::RigidBody;
use nalgebra::Vector3;
use shake::ResolvedBond;
use tracing::{debug, info};

/// A fixed bond length between two atoms of one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct BondConstraint {
    pub molecule: usize,
    /// Index of the first atom within the molecule.
    pub atom_a: usize,
    /// Index of the second atom within the molecule.
    pub atom_b: usize,
    /// Target length in Å.
    pub length: f64,
}

/// Reference geometry that makes every molecule of a type rigid.
#[derive(Debug, Clone, PartialEq)]
pub struct MShakeReference {
    pub molecule_type: usize,
    pub atom_names: Vec<String>,
    pub positions: Vec<Vector3<f64>>,
}

#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    bonds: Vec<ResolvedBond>,
    rigid_bodies: Vec<RigidBody>,
    config: ConstraintConfig,
    constrained_degrees_of_freedom: usize,
}

impl ConstraintSolver {
    /// Resolves bonds to flat atom indices and binds every reference to the
    /// molecules of its type.
    pub fn new(
        state: &SimulationState,
        bonds: &[BondConstraint],
        references: &[MShakeReference],
        config: &ConstraintConfig,
    ) -> Result<Self, EngineError> {
        let ranges = state.molecule_ranges();
        let masses: Vec<f64> = state.atoms_iter().map(|a| a.mass).collect();

        let mut rigid_bodies = Vec::new();
        for reference in references {
            if reference.atom_names.len() != reference.positions.len() {
                return Err(EngineError::Consistency(format!(
                    "M-Shake reference for molecule type {} lists {} names but {} positions",
                    reference.molecule_type,
                    reference.atom_names.len(),
                    reference.positions.len()
                )));
            }
            if state.molecule_type(reference.molecule_type).is_none() {
                return Err(EngineError::Consistency(format!(
                    "M-Shake reference for unknown molecule type {}",
                    reference.molecule_type
                )));
            }
            if rigid_bodies
                .iter()
                .any(|b: &RigidBody| state.molecules()[b.molecule].molecule_type == reference.molecule_type)
            {
                return Err(EngineError::Consistency(format!(
                    "duplicate M-Shake reference for molecule type {}",
                    reference.molecule_type
                )));
            }

            for (index, molecule) in state.molecules().iter().enumerate() {
                if molecule.molecule_type != reference.molecule_type {
                    continue;
                }
                let names: Vec<&str> = molecule
                    .atoms()
                    .iter()
                    .filter_map(|id| state.atom(*id))
                    .map(|a| a.name.as_str())
                    .collect();
                if names.len() != reference.atom_names.len()
                    || names.iter().zip(&reference.atom_names).any(|(a, b)| *a != b.as_str())
                {
                    return Err(EngineError::Consistency(format!(
                        "atom names of molecule {index} {names:?} do not match the M-Shake reference {:?} of molecule type {}",
                        reference.atom_names, reference.molecule_type
                    )));
                }
                let range = ranges[index].clone();
                rigid_bodies.push(RigidBody::new(
                    index,
                    range.clone(),
                    &reference.positions,
                    &masses[range],
                ));
            }
        }

        let mut resolved = Vec::with_capacity(bonds.len());
        for bond in bonds {
            let range = ranges.get(bond.molecule).ok_or_else(|| {
                EngineError::Consistency(format!(
                    "bond constraint references molecule {} but only {} exist",
                    bond.molecule,
                    ranges.len()
                ))
            })?;
            let size = range.len();
            if bond.atom_a >= size || bond.atom_b >= size || bond.atom_a == bond.atom_b {
                return Err(EngineError::Consistency(format!(
                    "bond constraint ({}, {}) is invalid for molecule {} with {} atoms",
                    bond.atom_a, bond.atom_b, bond.molecule, size
                )));
            }
            if bond.length <= 0.0 || !bond.length.is_finite() {
                return Err(EngineError::Consistency(format!(
                    "bond constraint ({}, {}) of molecule {} has invalid length {}",
                    bond.atom_a, bond.atom_b, bond.molecule, bond.length
                )));
            }
            if rigid_bodies.iter().any(|b| b.molecule == bond.molecule) {
                return Err(EngineError::Consistency(format!(
                    "molecule {} is rigid and cannot carry additional bond constraints",
                    bond.molecule
                )));
            }
            resolved.push(ResolvedBond {
                i: range.start + bond.atom_a,
                j: range.start + bond.atom_b,
                length: bond.length,
                reference: Vector3::zeros(),
            });
        }

        let rigid_dof: usize = rigid_bodies
            .iter()
            .map(|b| b.constrained_degrees_of_freedom(&masses[b.range.clone()]))
            .sum();
        let constrained_degrees_of_freedom = resolved.len() + rigid_dof;

        if !resolved.is_empty() || !rigid_bodies.is_empty() {
            info!(
                bonds = resolved.len(),
                rigid_molecules = rigid_bodies.len(),
                constrained_degrees_of_freedom,
                "Constraints bound."
            );
        }

        Ok(Self {
            bonds: resolved,
            rigid_bodies,
            config: config.clone(),
            constrained_degrees_of_freedom,
        })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.bonds.is_empty() || !self.rigid_bodies.is_empty()
    }

    #[inline]
    pub fn constrained_degrees_of_freedom(&self) -> usize {
        self.constrained_degrees_of_freedom
    }

    /// Flat atom pairs whose non-bonded interaction is replaced by a constraint.
    pub fn excluded_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self.bonds.iter().map(|b| (b.i, b.j)).collect();
        for body in &self.rigid_bodies {
            for i in body.range.clone() {
                for j in i + 1..body.range.end {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Stores the current bond vectors; call before the position update.
    pub fn capture_reference(&mut self, view: &FlatView, sim_box: &SimulationBox) {
        shake::capture_references(&mut self.bonds, view, sim_box);
    }

    /// SHAKE for bonds and a rigid fit for every rigid molecule.
    pub fn apply_positions(
        &self,
        view: &mut FlatView,
        sim_box: &SimulationBox,
        timestep: f64,
    ) -> Result<(), EngineError> {
        if !self.bonds.is_empty() {
            let iterations = shake::shake(
                &self.bonds,
                view,
                sim_box,
                timestep,
                self.config.shake_tolerance,
                self.config.shake_max_iterations,
            )?;
            debug!(iterations, "SHAKE converged.");
        }
        for body in &self.rigid_bodies {
            mshake::fit_positions(body, view, sim_box, timestep, self.config.mshake_tolerance)?;
        }
        Ok(())
    }

    /// RATTLE for bonds and rigid-motion projection for every rigid molecule.
    pub fn apply_velocities(&self, view: &mut FlatView, sim_box: &SimulationBox) -> Result<(), EngineError> {
        if !self.bonds.is_empty() {
            let iterations = shake::rattle(
                &self.bonds,
                view,
                sim_box,
                self.config.rattle_tolerance,
                self.config.rattle_max_iterations,
            )?;
            debug!(iterations, "RATTLE converged.");
        }
        for body in &self.rigid_bodies {
            mshake::project_velocities(body, view, sim_box)?;
        }
        Ok(())
    }
}
