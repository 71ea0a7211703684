use crate::core::constants::{BOLTZMANN_KCAL_PER_MOL, KINETIC_ENERGY_FACTOR};
use crate::core::models::state::FlatView;
use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use super::error::EngineError;
use super::physical_data::kinetics;

/// Draws Maxwell-Boltzmann velocities, removes centre-of-mass drift and
/// rescales to exactly `temperature`.
pub fn start_velocities(
    view: &mut FlatView,
    temperature: f64,
    degrees_of_freedom: f64,
    seed: u64,
) -> Result<(), EngineError> {
    initialise_velocities(view, temperature, seed)?;
    remove_drift(view);
    rescale_to_temperature(view, temperature, degrees_of_freedom);
    Ok(())
}

fn initialise_velocities(view: &mut FlatView, temperature: f64, seed: u64) -> Result<(), EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    for atom in 0..view.number_of_atoms() {
        let mass = view.masses()[atom];
        // m v² KINETIC_ENERGY_FACTOR = ½ kT per component
        let sigma = (BOLTZMANN_KCAL_PER_MOL * temperature / (2.0 * KINETIC_ENERGY_FACTOR * mass)).sqrt();
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| EngineError::Internal(format!("velocity distribution for atom {atom}: {e}")))?;
        let velocity = Vector3::new(
            normal.sample(&mut rng),
            normal.sample(&mut rng),
            normal.sample(&mut rng),
        );
        view.set_velocity(atom, velocity);
    }
    Ok(())
}

/// Subtracts the mass-weighted mean velocity from every atom.
pub fn remove_drift(view: &mut FlatView) {
    let mut total_mass = 0.0;
    let mut total_momentum = Vector3::zeros();
    for atom in 0..view.number_of_atoms() {
        let mass = view.masses()[atom];
        total_mass += mass;
        total_momentum += view.velocity(atom) * mass;
    }
    if total_mass <= 0.0 {
        return;
    }
    let velocity_cm = total_momentum / total_mass;
    for atom in 0..view.number_of_atoms() {
        let v = view.velocity(atom) - velocity_cm;
        view.set_velocity(atom, v);
    }
}

fn rescale_to_temperature(view: &mut FlatView, temperature: f64, degrees_of_freedom: f64) {
    let current = kinetics(view, degrees_of_freedom).temperature;
    if current <= 0.0 {
        return;
    }
    let lambda = (temperature / current).sqrt();
    view.velocities_mut().iter_mut().for_each(|v| *v *= lambda);
    debug!(from = current, to = temperature, "Initial velocities rescaled.");
}
