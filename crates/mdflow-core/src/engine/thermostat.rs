use super::config::ThermostatConfig;
use crate::core::constants::{BOLTZMANN_KCAL_PER_MOL, FS_TO_S, MOMENTUM_TO_FORCE, PS_TO_FS};
use crate::core::models::state::FlatView;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Temperature coupling selected once per run.
#[derive(Debug, Clone, PartialEq)]
pub enum Thermostat {
    None,
    Berendsen {
        target_temperature: f64,
        /// fs
        relaxation_time: f64,
    },
    NoseHoover {
        target_temperature: f64,
        /// 1/s
        coupling_frequency: f64,
        /// Friction state in kcal/mol·s.
        chi: f64,
    },
}

impl Thermostat {
    pub fn from_config(config: &ThermostatConfig) -> Self {
        match *config {
            ThermostatConfig::None => Thermostat::None,
            ThermostatConfig::Berendsen {
                target_temperature,
                relaxation_time,
            } => Thermostat::Berendsen {
                target_temperature,
                relaxation_time: relaxation_time * PS_TO_FS,
            },
            ThermostatConfig::NoseHoover {
                target_temperature,
                coupling_frequency,
            } => Thermostat::NoseHoover {
                target_temperature,
                coupling_frequency: coupling_frequency * 1.0e12,
                chi: 0.0,
            },
        }
    }

    pub fn target_temperature(&self) -> Option<f64> {
        match self {
            Thermostat::None => None,
            Thermostat::Berendsen {
                target_temperature, ..
            }
            | Thermostat::NoseHoover {
                target_temperature, ..
            } => Some(*target_temperature),
        }
    }

    /// Half-step update of the Nose-Hoover friction from the current temperature.
    pub fn apply_half_step(&mut self, temperature: f64, degrees_of_freedom: f64, timestep: f64) {
        if let Thermostat::NoseHoover {
            target_temperature,
            chi,
            ..
        } = self
        {
            *chi += 0.5
                * timestep
                * FS_TO_S
                * degrees_of_freedom
                * BOLTZMANN_KCAL_PER_MOL
                * (temperature - *target_temperature);
            trace!(chi = *chi, "Nose-Hoover friction updated.");
        }
    }

    /// Subtracts the Nose-Hoover drag `factor * m * v` from every force.
    pub fn apply_on_forces(&self, view: &mut FlatView, degrees_of_freedom: f64) {
        let Thermostat::NoseHoover {
            target_temperature,
            coupling_frequency,
            chi,
        } = *self
        else {
            return;
        };
        if degrees_of_freedom <= 0.0 || target_temperature <= 0.0 {
            return;
        }
        let kt_target = BOLTZMANN_KCAL_PER_MOL * target_temperature;
        let factor = chi * coupling_frequency * coupling_frequency / (kt_target * degrees_of_freedom)
            * MOMENTUM_TO_FORCE;

        let kin = view.kinematics_mut();
        #[cfg(not(feature = "parallel"))]
        let atoms = kin
            .forces
            .chunks_exact_mut(3)
            .zip(kin.velocities.chunks_exact(3))
            .zip(kin.masses.iter());
        #[cfg(feature = "parallel")]
        let atoms = kin
            .forces
            .par_chunks_exact_mut(3)
            .zip(kin.velocities.par_chunks_exact(3))
            .zip(kin.masses.par_iter());

        atoms.for_each(|((f, v), &mass)| {
            for d in 0..3 {
                f[d] -= factor * v[d] * mass;
            }
        });
    }

    /// Rescales velocities towards the target; returns whether anything changed.
    pub fn apply_on_velocities(&self, view: &mut FlatView, temperature: f64, timestep: f64) -> bool {
        let Thermostat::Berendsen {
            target_temperature,
            relaxation_time,
        } = *self
        else {
            return false;
        };
        if temperature <= 0.0 {
            return false;
        }
        let lambda = (1.0 + timestep / relaxation_time * (target_temperature / temperature - 1.0))
            .max(0.0)
            .sqrt();
        view.velocities_mut().iter_mut().for_each(|v| *v *= lambda);
        true
    }
}
