use super::config::ManostatConfig;
use super::error::EngineError;
use crate::core::constants::PS_TO_FS;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::FlatView;
use tracing::debug;

/// Pressure coupling selected once per run.
#[derive(Debug, Clone, PartialEq)]
pub enum Manostat {
    None,
    Berendsen {
        /// bar
        target_pressure: f64,
        /// fs
        relaxation_time: f64,
        /// 1/bar
        compressibility: f64,
    },
}

impl Manostat {
    pub fn from_config(config: &ManostatConfig) -> Self {
        match *config {
            ManostatConfig::None => Manostat::None,
            ManostatConfig::Berendsen {
                target_pressure,
                relaxation_time,
                compressibility,
            } => Manostat::Berendsen {
                target_pressure,
                relaxation_time: relaxation_time * PS_TO_FS,
                compressibility,
            },
        }
    }

    /// Scales the box and shifts every molecule rigidly with its centre of mass.
    ///
    /// Returns the scaling factor `mu` (1 when inactive).
    pub fn apply(
        &self,
        view: &mut FlatView,
        sim_box: &mut SimulationBox,
        pressure: f64,
        timestep: f64,
    ) -> Result<f64, EngineError> {
        let Manostat::Berendsen {
            target_pressure,
            relaxation_time,
            compressibility,
        } = *self
        else {
            return Ok(1.0);
        };

        let mu = (1.0 - compressibility * timestep / relaxation_time * (target_pressure - pressure)).cbrt();
        if !mu.is_finite() || mu <= 0.0 {
            return Err(EngineError::Internal(format!(
                "Berendsen manostat produced invalid scaling factor {mu} at pressure {pressure} bar"
            )));
        }

        sim_box.scale(mu);
        for mol in 0..view.number_of_molecules() {
            let shift = view.centers_of_mass()[mol] * (mu - 1.0);
            view.translate_molecule(mol, &shift);
        }
        debug!(mu, volume = sim_box.volume(), "Box rescaled.");
        Ok(mu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::molecule::MoleculeType;
    use crate::core::models::state::{SimulationState, SimulationStateBuilder};
    use nalgebra::Vector3;

    fn dimer_state() -> SimulationState {
        SimulationStateBuilder::new()
            .simulation_box(SimulationBox::orthorhombic(Vector3::new(10.0, 10.0, 10.0)).unwrap())
            .molecule_type(MoleculeType::new(0, "AB", &["A", "B"]))
            .molecule(
                0,
                vec![
                    Atom::new("A", 0, Vector3::new(4.0, 4.0, 4.0)),
                    Atom::new("B", 0, Vector3::new(6.0, 4.0, 4.0)),
                ],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn none_is_a_no_op() {
        let mut state = dimer_state();
        let mu = state
            .with_flattened(|view, sim_box| Manostat::None.apply(view, sim_box, 1.0e4, 1.0))
            .unwrap();
        assert_eq!(mu, 1.0);
        assert!((state.simulation_box().volume() - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn overpressure_expands_box_and_keeps_molecules_rigid() {
        let mut state = dimer_state();
        let manostat = Manostat::from_config(&ManostatConfig::Berendsen {
            target_pressure: 1.0,
            relaxation_time: 1.0,
            compressibility: 4.5e-5,
        });
        let mu = state
            .with_flattened(|view, sim_box| manostat.apply(view, sim_box, 1001.0, 1000.0))
            .unwrap();

        let expected_mu = (1.0_f64 + 4.5e-5 * 1000.0).cbrt();
        assert!((mu - expected_mu).abs() < 1e-12);
        assert!((state.simulation_box().volume() - 1000.0 * mu.powi(3)).abs() < 1e-9);

        let atoms: Vec<_> = state.atoms_iter().collect();
        let bond = atoms[1].position - atoms[0].position;
        assert!((bond.norm() - 2.0).abs() < 1e-12);
        let com = (atoms[0].position + atoms[1].position) / 2.0;
        assert!((com - Vector3::new(5.0, 4.0, 4.0) * mu).norm() < 1e-12);
    }

    #[test]
    fn runaway_scaling_factor_is_an_error() {
        let mut state = dimer_state();
        let manostat = Manostat::Berendsen {
            target_pressure: 1.0e9,
            relaxation_time: 1.0,
            compressibility: 1.0,
        };
        let result = state.with_flattened(|view, sim_box| manostat.apply(view, sim_box, 0.0, 1.0));
        assert!(matches!(result, Err(EngineError::Internal(_))));
    }
}
