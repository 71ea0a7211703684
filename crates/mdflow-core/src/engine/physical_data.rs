use super::error::EngineError;
use crate::core::constants::{
    BOLTZMANN_KCAL_PER_MOL, FS_TO_S, KINETIC_ENERGY_FACTOR, PRESSURE_FACTOR,
};
use crate::core::models::state::FlatView;
use nalgebra::Vector3;

/// Macroscopic observables of one completed step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhysicalData {
    pub step: u64,
    /// K
    pub temperature: f64,
    /// bar
    pub pressure: f64,
    /// kcal/mol
    pub kinetic_energy: f64,
    /// kcal/mol
    pub coulomb_energy: f64,
    /// kcal/mol
    pub non_coulomb_energy: f64,
    /// kcal/mol
    pub qm_energy: f64,
    /// Magnitude of the total momentum in amu·Å/fs.
    pub momentum: f64,
    /// Diagonal of the virial tensor in kcal/mol.
    pub virial: Vector3<f64>,
    /// Å³
    pub volume: f64,
}

impl PhysicalData {
    #[inline]
    pub fn potential_energy(&self) -> f64 {
        self.coulomb_energy + self.non_coulomb_energy + self.qm_energy
    }

    #[inline]
    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy + self.potential_energy()
    }
}

/// Collects the fields of one [`PhysicalData`] as the step stages produce them.
#[derive(Debug, Default)]
pub(crate) struct PhysicalDataAccumulator {
    step: Option<u64>,
    temperature: Option<f64>,
    pressure: Option<f64>,
    kinetic_energy: Option<f64>,
    coulomb_energy: Option<f64>,
    non_coulomb_energy: Option<f64>,
    qm_energy: Option<f64>,
    momentum: Option<f64>,
    virial: Option<Vector3<f64>>,
    volume: Option<f64>,
}

impl PhysicalDataAccumulator {
    pub fn new(step: u64) -> Self {
        Self {
            step: Some(step),
            ..Self::default()
        }
    }

    pub fn set_kinetics(&mut self, kinetics: &Kinetics) {
        self.kinetic_energy = Some(kinetics.kinetic_energy);
        self.temperature = Some(kinetics.temperature);
        self.momentum = Some(kinetics.momentum);
    }

    pub fn set_energies(&mut self, coulomb: f64, non_coulomb: f64, qm: f64) {
        self.coulomb_energy = Some(coulomb);
        self.non_coulomb_energy = Some(non_coulomb);
        self.qm_energy = Some(qm);
    }

    pub fn set_virial(&mut self, virial: Vector3<f64>) {
        self.virial = Some(virial);
    }

    pub fn set_pressure(&mut self, pressure: f64, volume: f64) {
        self.pressure = Some(pressure);
        self.volume = Some(volume);
    }

    /// Returns the snapshot, or an error naming the first field no stage wrote.
    pub fn finish(self) -> Result<PhysicalData, EngineError> {
        fn take<T>(value: Option<T>, name: &str) -> Result<T, EngineError> {
            value.ok_or_else(|| EngineError::Internal(format!("physical data field '{name}' was never set")))
        }
        Ok(PhysicalData {
            step: take(self.step, "step")?,
            temperature: take(self.temperature, "temperature")?,
            pressure: take(self.pressure, "pressure")?,
            kinetic_energy: take(self.kinetic_energy, "kinetic_energy")?,
            coulomb_energy: take(self.coulomb_energy, "coulomb_energy")?,
            non_coulomb_energy: take(self.non_coulomb_energy, "non_coulomb_energy")?,
            qm_energy: take(self.qm_energy, "qm_energy")?,
            momentum: take(self.momentum, "momentum")?,
            virial: take(self.virial, "virial")?,
            volume: take(self.volume, "volume")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinetics {
    pub kinetic_energy: f64,
    pub temperature: f64,
    pub momentum: f64,
}

/// Kinetic energy, instantaneous temperature and total momentum of the view.
pub fn kinetics(view: &FlatView, degrees_of_freedom: f64) -> Kinetics {
    let mut kinetic_energy = 0.0;
    let mut momentum = Vector3::zeros();
    for (atom, &mass) in view.masses().iter().enumerate() {
        let v = view.velocity(atom);
        kinetic_energy += mass * v.norm_squared() * KINETIC_ENERGY_FACTOR;
        momentum += v * mass;
    }
    let temperature = if degrees_of_freedom > 0.0 {
        2.0 * kinetic_energy / (degrees_of_freedom * BOLTZMANN_KCAL_PER_MOL)
    } else {
        0.0
    };
    Kinetics {
        kinetic_energy,
        temperature,
        momentum: momentum.norm() * FS_TO_S,
    }
}

/// `P = (2 Ekin + tr W) / (3 V)` in bar.
pub fn pressure(kinetic_energy: f64, virial: &Vector3<f64>, volume: f64) -> f64 {
    (2.0 * kinetic_energy + virial.sum()) / (3.0 * volume) * PRESSURE_FACTOR
}

/// Running mean of the snapshots handed to the output collaborator.
#[derive(Debug, Clone, Default)]
pub struct PhysicalDataAverager {
    sum: PhysicalData,
    count: u64,
}

impl PhysicalDataAverager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, data: &PhysicalData) {
        let s = &mut self.sum;
        s.step = data.step;
        s.temperature += data.temperature;
        s.pressure += data.pressure;
        s.kinetic_energy += data.kinetic_energy;
        s.coulomb_energy += data.coulomb_energy;
        s.non_coulomb_energy += data.non_coulomb_energy;
        s.qm_energy += data.qm_energy;
        s.momentum += data.momentum;
        s.virial += data.virial;
        s.volume += data.volume;
        self.count += 1;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of everything added so far; `step` is the last step seen.
    pub fn average(&self) -> Option<PhysicalData> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let s = &self.sum;
        Some(PhysicalData {
            step: s.step,
            temperature: s.temperature / n,
            pressure: s.pressure / n,
            kinetic_energy: s.kinetic_energy / n,
            coulomb_energy: s.coulomb_energy / n,
            non_coulomb_energy: s.non_coulomb_energy / n,
            qm_energy: s.qm_energy / n,
            momentum: s.momentum / n,
            virial: s.virial / n,
            volume: s.volume / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::molecule::MoleculeType;
    use crate::core::models::simulation_box::SimulationBox;
    use crate::core::models::state::SimulationStateBuilder;

    fn full_accumulator() -> PhysicalDataAccumulator {
        let mut acc = PhysicalDataAccumulator::new(7);
        acc.set_kinetics(&Kinetics {
            kinetic_energy: 3.0,
            temperature: 300.0,
            momentum: 0.0,
        });
        acc.set_energies(-1.0, 0.5, 0.0);
        acc.set_virial(Vector3::new(1.0, 2.0, 3.0));
        acc.set_pressure(1.0, 1000.0);
        acc
    }

    #[test]
    fn finish_returns_snapshot_when_every_field_is_set() {
        let data = full_accumulator().finish().unwrap();
        assert_eq!(data.step, 7);
        assert_eq!(data.potential_energy(), -0.5);
        assert_eq!(data.total_energy(), 2.5);
    }

    #[test]
    fn finish_fails_when_a_field_is_missing() {
        let mut acc = PhysicalDataAccumulator::new(1);
        acc.set_energies(0.0, 0.0, 0.0);
        let err = acc.finish().unwrap_err();
        assert!(matches!(err, EngineError::Internal(msg) if msg.contains("temperature")));
    }

    #[test]
    fn kinetics_of_two_opposite_atoms_has_zero_momentum() {
        let mut state = SimulationStateBuilder::new()
            .simulation_box(SimulationBox::orthorhombic(Vector3::new(20.0, 20.0, 20.0)).unwrap())
            .molecule_type(MoleculeType::new(0, "Ar", &["Ar"]))
            .molecule(
                0,
                vec![Atom::new("Ar", 0, Vector3::zeros())
                    .with_mass(2.0)
                    .with_velocity(Vector3::new(1.0e12, 0.0, 0.0))],
            )
            .molecule(
                0,
                vec![Atom::new("Ar", 0, Vector3::new(5.0, 0.0, 0.0))
                    .with_mass(2.0)
                    .with_velocity(Vector3::new(-1.0e12, 0.0, 0.0))],
            )
            .build()
            .unwrap();
        let dof = state.degrees_of_freedom();
        let k = state.with_flattened(|view, _| kinetics(view, dof));
        // Each atom: 2 g/mol at 100 m/s carries 10 J/mol.
        assert!((k.kinetic_energy - 20.0 / 4184.0).abs() < 1e-12);
        assert!(k.momentum.abs() < 1e-12);
        let expected_t = 2.0 * k.kinetic_energy / (3.0 * BOLTZMANN_KCAL_PER_MOL);
        assert!((k.temperature - expected_t).abs() < 1e-9);
    }

    #[test]
    fn pressure_of_ideal_gas_term() {
        let p = pressure(1.5, &Vector3::zeros(), 1.0);
        assert!((p - PRESSURE_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn averager_reports_mean_of_added_snapshots() {
        let mut averager = PhysicalDataAverager::new();
        assert!(averager.average().is_none());
        let mut a = full_accumulator().finish().unwrap();
        averager.add(&a);
        a.temperature = 100.0;
        a.step = 8;
        averager.add(&a);
        let mean = averager.average().unwrap();
        assert_eq!(averager.count(), 2);
        assert_eq!(mean.step, 8);
        assert!((mean.temperature - 200.0).abs() < 1e-12);
        assert!((mean.virial - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }
}
