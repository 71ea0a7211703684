//! Rigid-body constraints: every atom of a rigid molecule follows a reference
//! geometry that may only translate and rotate.

use crate::core::constants::FS_TO_S;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::FlatView;
use crate::engine::error::{ConstraintKind, EngineError};
use nalgebra::{Matrix3, Vector3};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RigidBody {
    pub molecule: usize,
    pub range: Range<usize>,
    /// Reference positions relative to their mass-weighted centre.
    pub reference: Vec<Vector3<f64>>,
}

impl RigidBody {
    pub fn new(molecule: usize, range: Range<usize>, positions: &[Vector3<f64>], masses: &[f64]) -> Self {
        let total: f64 = masses.iter().sum();
        let center = positions
            .iter()
            .zip(masses)
            .map(|(p, &m)| p * m)
            .sum::<Vector3<f64>>()
            / total;
        Self {
            molecule,
            range,
            reference: positions.iter().map(|p| p - center).collect(),
        }
    }

    /// Constraints removed from the free degrees of freedom by this body.
    pub fn constrained_degrees_of_freedom(&self, masses: &[f64]) -> usize {
        let n = self.reference.len();
        match n {
            0 | 1 => 0,
            2 => 1,
            _ if self.is_linear(masses) => 3 * n - 5,
            _ => 3 * n - 6,
        }
    }

    fn is_linear(&self, masses: &[f64]) -> bool {
        let inertia = inertia_tensor(&self.reference, masses);
        let eigen = inertia.symmetric_eigenvalues();
        let largest = eigen.max();
        largest <= 0.0 || eigen.min() / largest < 1e-8
    }
}

fn inertia_tensor(relative: &[Vector3<f64>], masses: &[f64]) -> Matrix3<f64> {
    relative
        .iter()
        .zip(masses)
        .fold(Matrix3::zeros(), |acc, (r, &m)| {
            acc + (Matrix3::identity() * r.norm_squared() - r * r.transpose()) * m
        })
}

/// Unwrapped positions about the first atom, masses and the centre of mass.
fn gather(body: &RigidBody, view: &FlatView, sim_box: &SimulationBox) -> (Vec<Vector3<f64>>, Vec<f64>, Vector3<f64>) {
    let anchor = view.position(body.range.start);
    let positions: Vec<Vector3<f64>> = body
        .range
        .clone()
        .map(|atom| anchor + sim_box.minimum_image(&(view.position(atom) - anchor)).0)
        .collect();
    let masses = view.masses()[body.range.clone()].to_vec();
    let total: f64 = masses.iter().sum();
    let center = positions
        .iter()
        .zip(&masses)
        .map(|(p, &m)| p * m)
        .sum::<Vector3<f64>>()
        / total;
    (positions, masses, center)
}

/// Mass-weighted rotation taking `reference` onto the current geometry.
fn kabsch_rotation(covariance: &Matrix3<f64>, molecule: usize) -> Result<Matrix3<f64>, EngineError> {
    let svd = covariance.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(EngineError::Internal(format!(
            "singular value decomposition for rigid molecule {molecule} returned no singular vectors"
        )));
    };
    let v = v_t.transpose();
    let d = (v * u.transpose()).determinant().signum();
    Ok(v * Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d)) * u.transpose())
}

/// Replaces the molecule's atoms by the best rigid fit of the reference.
///
/// The distortion removed by the fit is the mass-weighted RMS displacement
/// relative to the mass-weighted RMS radius of the reference. A molecule
/// distorted by more than `tolerance` is left untouched and reported.
pub(crate) fn fit_positions(
    body: &RigidBody,
    view: &mut FlatView,
    sim_box: &SimulationBox,
    timestep: f64,
    tolerance: f64,
) -> Result<(), EngineError> {
    let (positions, masses, center) = gather(body, view, sim_box);

    let covariance = body
        .reference
        .iter()
        .zip(&positions)
        .zip(&masses)
        .fold(Matrix3::zeros(), |acc, ((p, y), &m)| {
            acc + p * (y - center).transpose() * m
        });
    let rotation = kabsch_rotation(&covariance, body.molecule)?;

    let displacements: Vec<Vector3<f64>> = body
        .reference
        .iter()
        .zip(&positions)
        .map(|(r, y)| center + rotation * r - y)
        .collect();

    let max_deviation = distortion(&displacements, &body.reference, &masses);
    if max_deviation > tolerance {
        return Err(EngineError::Convergence {
            kind: ConstraintKind::MShake,
            iterations: 1,
            tolerance,
            max_deviation,
        });
    }

    let inv_dt = 1.0 / (timestep * FS_TO_S);
    for (atom, displacement) in body.range.clone().zip(&displacements) {
        view.set_position(atom, view.position(atom) + displacement);
        view.set_velocity(atom, view.velocity(atom) + displacement * inv_dt);
    }
    Ok(())
}

fn distortion(displacements: &[Vector3<f64>], reference: &[Vector3<f64>], masses: &[f64]) -> f64 {
    let weighted = |vectors: &[Vector3<f64>]| -> f64 {
        vectors
            .iter()
            .zip(masses)
            .map(|(v, &m)| v.norm_squared() * m)
            .sum()
    };
    let radius = weighted(reference);
    if radius > 0.0 {
        (weighted(displacements) / radius).sqrt()
    } else {
        0.0
    }
}

/// Projects the molecule's velocities onto rigid motion `v_com + ω × r`.
pub(crate) fn project_velocities(
    body: &RigidBody,
    view: &mut FlatView,
    sim_box: &SimulationBox,
) -> Result<(), EngineError> {
    let (positions, masses, center) = gather(body, view, sim_box);
    let total: f64 = masses.iter().sum();
    let velocities: Vec<Vector3<f64>> = body.range.clone().map(|atom| view.velocity(atom)).collect();

    let v_com = velocities
        .iter()
        .zip(&masses)
        .map(|(v, &m)| v * m)
        .sum::<Vector3<f64>>()
        / total;

    let relative: Vec<Vector3<f64>> = positions.iter().map(|p| p - center).collect();
    let angular_momentum = relative
        .iter()
        .zip(&velocities)
        .zip(&masses)
        .map(|((r, v), &m)| r.cross(&(v - v_com)) * m)
        .sum::<Vector3<f64>>();
    let inertia = inertia_tensor(&relative, &masses);
    let inverse = match inertia.try_inverse() {
        Some(inverse) => inverse,
        None => inertia.pseudo_inverse(1e-12).map_err(|e| {
            EngineError::Internal(format!(
                "inertia tensor of rigid molecule {} cannot be inverted: {e}",
                body.molecule
            ))
        })?,
    };
    let omega = inverse * angular_momentum;

    for (k, atom) in body.range.clone().enumerate() {
        view.set_velocity(atom, v_com + omega.cross(&relative[k]));
    }
    Ok(())
}
