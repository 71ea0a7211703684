//! SHAKE (positions) and RATTLE (velocities) for pairwise bond constraints.

use crate::core::constants::FS_TO_S;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::FlatView;
use crate::engine::error::{ConstraintKind, EngineError};
use nalgebra::Vector3;

/// A bond constraint between two flat atom indices.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedBond {
    pub i: usize,
    pub j: usize,
    pub length: f64,
    /// Bond vector before the position update.
    pub reference: Vector3<f64>,
}

#[inline]
fn bond_vector(view: &FlatView, sim_box: &SimulationBox, bond: &ResolvedBond) -> Vector3<f64> {
    sim_box.minimum_image(&(view.position(bond.i) - view.position(bond.j))).0
}

pub(crate) fn capture_references(bonds: &mut [ResolvedBond], view: &FlatView, sim_box: &SimulationBox) {
    for bond in bonds.iter_mut() {
        bond.reference = bond_vector(view, sim_box, bond);
    }
}

fn max_length_deviation(bonds: &[ResolvedBond], view: &FlatView, sim_box: &SimulationBox) -> f64 {
    bonds
        .iter()
        .map(|bond| {
            let target = bond.length * bond.length;
            (target - bond_vector(view, sim_box, bond).norm_squared()).abs() / (2.0 * target)
        })
        .fold(0.0, f64::max)
}

fn max_velocity_deviation(bonds: &[ResolvedBond], view: &FlatView, sim_box: &SimulationBox) -> f64 {
    bonds
        .iter()
        .map(|bond| {
            let d = bond_vector(view, sim_box, bond);
            (d.dot(&(view.velocity(bond.i) - view.velocity(bond.j)))).abs() / (bond.length * bond.length)
        })
        .fold(0.0, f64::max)
}

/// Iteratively restores bond lengths along the reference bond vectors.
///
/// Returns the number of correction sweeps that were needed.
pub(crate) fn shake(
    bonds: &[ResolvedBond],
    view: &mut FlatView,
    sim_box: &SimulationBox,
    timestep: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<usize, EngineError> {
    let inv_dt = 1.0 / (timestep * FS_TO_S);
    let mut iteration = 0;
    loop {
        let max_deviation = max_length_deviation(bonds, view, sim_box);
        if max_deviation < tolerance {
            return Ok(iteration);
        }
        if iteration >= max_iterations {
            return Err(EngineError::Convergence {
                kind: ConstraintKind::Shake,
                iterations: iteration,
                tolerance,
                max_deviation,
            });
        }

        for bond in bonds {
            let inv_mi = 1.0 / view.masses()[bond.i];
            let inv_mj = 1.0 / view.masses()[bond.j];
            let d = bond_vector(view, sim_box, bond);
            let delta = bond.length * bond.length - d.norm_squared();
            let denominator = 2.0 * (inv_mi + inv_mj) * d.dot(&bond.reference);
            if denominator == 0.0 {
                continue;
            }
            let g = delta / denominator;

            let shift_i = bond.reference * (g * inv_mi);
            let shift_j = bond.reference * (-g * inv_mj);
            view.set_position(bond.i, view.position(bond.i) + shift_i);
            view.set_position(bond.j, view.position(bond.j) + shift_j);
            view.set_velocity(bond.i, view.velocity(bond.i) + shift_i * inv_dt);
            view.set_velocity(bond.j, view.velocity(bond.j) + shift_j * inv_dt);
        }
        iteration += 1;
    }
}

/// Removes velocity components along every constrained bond.
pub(crate) fn rattle(
    bonds: &[ResolvedBond],
    view: &mut FlatView,
    sim_box: &SimulationBox,
    tolerance: f64,
    max_iterations: usize,
) -> Result<usize, EngineError> {
    let mut iteration = 0;
    loop {
        let max_deviation = max_velocity_deviation(bonds, view, sim_box);
        if max_deviation < tolerance {
            return Ok(iteration);
        }
        if iteration >= max_iterations {
            return Err(EngineError::Convergence {
                kind: ConstraintKind::Rattle,
                iterations: iteration,
                tolerance,
                max_deviation,
            });
        }

        for bond in bonds {
            let inv_mi = 1.0 / view.masses()[bond.i];
            let inv_mj = 1.0 / view.masses()[bond.j];
            let d = bond_vector(view, sim_box, bond);
            let target = bond.length * bond.length;
            let tau = d.dot(&(view.velocity(bond.i) - view.velocity(bond.j)));
            let k = -tau / ((inv_mi + inv_mj) * target);

            view.set_velocity(bond.i, view.velocity(bond.i) + d * (k * inv_mi));
            view.set_velocity(bond.j, view.velocity(bond.j) - d * (k * inv_mj));
        }
        iteration += 1;
    }
}
