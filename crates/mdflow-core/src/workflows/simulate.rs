use crate::core::forcefield::params::ForceFieldParams;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::state::{FlatView, SimulationState};
use crate::engine::config::{ConfigError, ForceSource, SimulationConfig};
use crate::engine::constraints::{BondConstraint, ConstraintSolver, MShakeReference};
use crate::engine::device::{Device, HostBackend};
use crate::engine::error::EngineError;
use crate::engine::integrator::VelocityVerlet;
use crate::engine::manostat::Manostat;
use crate::engine::physical_data::{
    PhysicalData, PhysicalDataAccumulator, PhysicalDataAverager, kinetics, pressure,
};
use crate::engine::potential::Potential;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::qm::{QmForceProvider, QmRunner};
use crate::engine::thermostat::Thermostat;
use crate::engine::timings::Timings;
use crate::engine::velocities::start_velocities;
use crate::engine::virial::compute_virial;
use tracing::{debug, info, instrument, trace, warn};

/// Where the forces of a step come from.
#[derive(Debug)]
enum ForceEvaluator {
    ForceField(Potential),
    Qm(QmRunner),
}

impl ForceEvaluator {
    /// Adds forces to `view`; returns pair energies and the QM energy.
    fn evaluate(
        &mut self,
        step: u64,
        view: &mut FlatView,
        sim_box: &SimulationBox,
        device: &Device,
    ) -> Result<(EnergyTerm, f64), EngineError> {
        match self {
            ForceEvaluator::ForceField(potential) => Ok((potential.evaluate(view, sim_box, device)?, 0.0)),
            ForceEvaluator::Qm(runner) => Ok((EnergyTerm::default(), runner.evaluate(step, view, sim_box)?)),
        }
    }
}

/// Assembles an [`Engine`] from a system, a configuration and the force source.
pub struct EngineBuilder {
    state: SimulationState,
    config: SimulationConfig,
    device: Option<Device>,
    force_field: Option<ForceFieldParams>,
    qm_provider: Option<Box<dyn QmForceProvider>>,
    bonds: Vec<BondConstraint>,
    references: Vec<MShakeReference>,
}

impl EngineBuilder {
    pub fn new(state: SimulationState, config: SimulationConfig) -> Self {
        Self {
            state,
            config,
            device: None,
            force_field: None,
            qm_provider: None,
            bonds: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Uses an already bound device instead of binding the host backend.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    pub fn force_field(mut self, params: ForceFieldParams) -> Self {
        self.force_field = Some(params);
        self
    }

    pub fn qm_provider(mut self, provider: Box<dyn QmForceProvider>) -> Self {
        self.qm_provider = Some(provider);
        self
    }

    pub fn bond_constraints(mut self, bonds: Vec<BondConstraint>) -> Self {
        self.bonds = bonds;
        self
    }

    pub fn rigid_references(mut self, references: Vec<MShakeReference>) -> Self {
        self.references = references;
        self
    }

    /// Resolves everything against the system and computes the initial forces.
    #[instrument(skip_all, name = "engine_setup")]
    pub fn build(self) -> Result<Engine, EngineError> {
        let Self {
            mut state,
            config,
            device,
            force_field,
            qm_provider,
            bonds,
            references,
        } = self;

        let device = match device {
            Some(device) => device,
            None => match config.device_id {
                Some(id) => Device::with_id(HostBackend::new(), id)?,
                None => Device::new(HostBackend::new())?,
            },
        };

        let constraints = ConstraintSolver::new(&state, &bonds, &references, &config.constraints)?;
        state.set_constrained_degrees_of_freedom(constraints.constrained_degrees_of_freedom());
        let degrees_of_freedom = state.degrees_of_freedom();
        if degrees_of_freedom <= 0.0 {
            warn!("The system has no free degrees of freedom; temperature is reported as zero.");
        }

        let forces = match config.force_source {
            ForceSource::ForceField => {
                let params = force_field.ok_or(ConfigError::MissingParameter("force_field"))?;
                ForceEvaluator::ForceField(Potential::new(
                    &params,
                    &state,
                    &config.potential,
                    &constraints.excluded_pairs(),
                )?)
            }
            ForceSource::Qm { timeout } => {
                let provider = qm_provider.ok_or(ConfigError::MissingParameter("qm_provider"))?;
                ForceEvaluator::Qm(QmRunner::new(provider, timeout, &state))
            }
        };

        let mut engine = Engine {
            thermostat: Thermostat::from_config(&config.thermostat),
            manostat: Manostat::from_config(&config.manostat),
            timings: Timings::new(config.timestep, config.number_of_steps),
            integrator: VelocityVerlet::new(),
            temperature: 0.0,
            last: None,
            state,
            config,
            device,
            forces,
            constraints,
        };
        engine.initialize()?;
        Ok(engine)
    }
}

/// The step driver: owns the state and every stage of the timestep.
#[derive(Debug)]
pub struct Engine {
    state: SimulationState,
    config: SimulationConfig,
    device: Device,
    integrator: VelocityVerlet,
    forces: ForceEvaluator,
    constraints: ConstraintSolver,
    thermostat: Thermostat,
    manostat: Manostat,
    timings: Timings,
    /// Temperature of the previous step, used by the first Nose-Hoover half step.
    temperature: f64,
    last: Option<PhysicalData>,
}

impl Engine {
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn thermostat(&self) -> &Thermostat {
        &self.thermostat
    }

    /// Snapshot of the most recent step, or of the initial state before any step.
    pub fn last_data(&self) -> Option<&PhysicalData> {
        self.last.as_ref()
    }

    /// Initial velocities, forces and observables (step 0).
    fn initialize(&mut self) -> Result<(), EngineError> {
        let Self {
            state,
            config,
            device,
            forces,
            constraints,
            ..
        } = self;
        let degrees_of_freedom = state.degrees_of_freedom();

        let data = state.with_flattened(|view, sim_box| -> Result<PhysicalData, EngineError> {
            view.recompute_centers_of_mass(sim_box);
            if let Some(init) = &config.initial_velocities {
                start_velocities(view, init.temperature, degrees_of_freedom, init.seed)?;
                constraints.apply_velocities(view, sim_box)?;
                debug!(temperature = init.temperature, seed = init.seed, "Initial velocities drawn.");
            }

            view.reset_forces();
            view.reset_shift_forces();
            let (energy, qm_energy) = forces.evaluate(0, view, sim_box, device)?;
            let virial = compute_virial(view, sim_box, config.virial);
            let kin = kinetics(view, degrees_of_freedom);
            let volume = sim_box.volume();

            let mut acc = PhysicalDataAccumulator::new(0);
            acc.set_kinetics(&kin);
            acc.set_energies(energy.coulomb, energy.non_coulomb, qm_energy);
            acc.set_virial(virial);
            acc.set_pressure(pressure(kin.kinetic_energy, &virial, volume), volume);
            acc.finish()
        })?;

        self.integrator.initialize()?;
        self.temperature = data.temperature;
        info!(
            atoms = self.state.number_of_atoms(),
            molecules = self.state.number_of_molecules(),
            degrees_of_freedom,
            temperature = data.temperature,
            total_energy = data.total_energy(),
            "Engine initialized."
        );
        self.last = Some(data);
        Ok(())
    }

    /// Advances the system by one timestep and returns its observables.
    #[instrument(skip_all, name = "md_step")]
    pub fn step(&mut self) -> Result<PhysicalData, EngineError> {
        if self.timings.is_finished() {
            return Err(EngineError::Internal(format!(
                "the run already completed its {} steps",
                self.timings.number_of_steps()
            )));
        }
        self.device.check_errors("pre-step")?;

        let step = self.timings.step() + 1;
        let timestep = self.timings.timestep();
        let degrees_of_freedom = self.state.degrees_of_freedom();
        self.thermostat
            .apply_half_step(self.temperature, degrees_of_freedom, timestep);

        let Self {
            state,
            config,
            device,
            integrator,
            forces,
            constraints,
            thermostat,
            manostat,
            ..
        } = self;

        let data = state.with_flattened(|view, sim_box| -> Result<PhysicalData, EngineError> {
            let mut acc = PhysicalDataAccumulator::new(step);

            constraints.capture_reference(view, sim_box);
            device.install(|| integrator.first_step(view, sim_box, timestep))?;
            constraints.apply_positions(view, sim_box, timestep)?;
            view.recompute_centers_of_mass(sim_box);

            view.reset_shift_forces();
            let (energy, qm_energy) = forces.evaluate(step, view, sim_box, device)?;
            integrator.forces_evaluated()?;
            acc.set_energies(energy.coulomb, energy.non_coulomb, qm_energy);

            let virial = compute_virial(view, sim_box, config.virial);
            acc.set_virial(virial);

            device.install(|| thermostat.apply_on_forces(view, degrees_of_freedom));
            device.install(|| integrator.second_step(view, timestep))?;
            constraints.apply_velocities(view, sim_box)?;

            let mut kin = kinetics(view, degrees_of_freedom);
            if thermostat.apply_on_velocities(view, kin.temperature, timestep) {
                kin = kinetics(view, degrees_of_freedom);
            }
            thermostat.apply_half_step(kin.temperature, degrees_of_freedom, timestep);
            acc.set_kinetics(&kin);

            let volume = sim_box.volume();
            let current_pressure = pressure(kin.kinetic_energy, &virial, volume);
            acc.set_pressure(current_pressure, volume);
            let mu = manostat.apply(view, sim_box, current_pressure, timestep)?;
            if mu != 1.0 {
                trace!(mu, volume = sim_box.volume(), "Box rescaled.");
            }

            acc.finish()
        })?;

        self.timings.increment();
        if self.timings.is_finished() {
            self.integrator.finish()?;
        }
        self.temperature = data.temperature;
        trace!(
            step,
            temperature = data.temperature,
            total_energy = data.total_energy(),
            "Step completed."
        );
        self.last = Some(data.clone());
        Ok(data)
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    /// Observables of the final step (or of the initial state for zero steps).
    pub last: PhysicalData,
    /// Mean over every completed step.
    pub average: Option<PhysicalData>,
}

/// Steps until the configured number of steps is reached.
///
/// `observer` receives the initial snapshot and then every
/// `output_frequency`-th step together with the state after that step; the
/// last step is always observed. Returning an error from it stops the run.
#[instrument(skip_all, name = "simulation_workflow")]
pub fn run<E, F>(engine: &mut Engine, reporter: &ProgressReporter, mut observer: F) -> Result<RunSummary, E>
where
    E: From<EngineError>,
    F: FnMut(&PhysicalData, &SimulationState) -> Result<(), E>,
{
    let total_steps = engine.timings().number_of_steps();
    let output_frequency = engine.config().output_frequency;
    info!(total_steps, output_frequency, "Starting simulation run.");

    if engine.timings().step() == 0 {
        if let Some(initial) = engine.last_data() {
            observer(initial, engine.state())?;
        }
    }

    reporter.report(Progress::RunStart { total_steps });
    let mut averager = PhysicalDataAverager::new();
    let mut last = engine.last_data().cloned();

    while !engine.timings().is_finished() {
        let data = engine.step()?;
        averager.add(&data);

        let step = data.step;
        if step % output_frequency == 0 || engine.timings().is_finished() {
            reporter.report(Progress::StepCompleted {
                step,
                temperature: data.temperature,
                total_energy: data.total_energy(),
            });
            observer(&data, engine.state())?;
        }
        last = Some(data);
    }
    reporter.report(Progress::RunFinish);

    let last = last.ok_or_else(|| EngineError::Internal("no physical data was produced".to_string()))?;
    info!(
        steps = engine.timings().step(),
        temperature = last.temperature,
        total_energy = last.total_energy(),
        "Simulation run finished."
    );
    Ok(RunSummary {
        steps: engine.timings().step(),
        last,
        average: averager.average(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{GlobalParams, PairParam};
    use crate::core::models::atom::Atom;
    use crate::core::models::molecule::MoleculeType;
    use crate::core::models::state::SimulationStateBuilder;
    use crate::engine::config::{
        ManostatConfig, SimulationConfigBuilder, ThermostatConfig,
    };
    use crate::engine::qm::{CancellationToken, QmError, QmRequest, QmResult};
    use nalgebra::Vector3;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const ARGON_MASS: f64 = 39.948;

    fn argon_params() -> ForceFieldParams {
        let (epsilon, sigma): (f64, f64) = (0.238, 3.4);
        let mut params = ForceFieldParams {
            atom_types: vec!["Ar".to_string()],
            globals: GlobalParams {
                dielectric_constant: 1.0,
                non_coulomb: "lennard-jones".to_string(),
            },
            pairs: HashMap::new(),
        };
        params.insert_pair(
            "Ar",
            "Ar",
            PairParam::LennardJones {
                c6: 4.0 * epsilon * sigma.powi(6),
                c12: 4.0 * epsilon * sigma.powi(12),
            },
        );
        params
    }

    fn argon_state(positions: &[Vector3<f64>]) -> SimulationState {
        let mut builder = SimulationStateBuilder::new()
            .simulation_box(SimulationBox::orthorhombic(Vector3::new(30.0, 30.0, 30.0)).unwrap())
            .molecule_type(MoleculeType::new(0, "argon", &["Ar"]));
        for p in positions {
            builder = builder.molecule(0, vec![Atom::new("Ar", 0, *p).with_mass(ARGON_MASS)]);
        }
        builder.build().unwrap()
    }

    fn argon_trimer() -> SimulationState {
        argon_state(&[
            Vector3::new(10.0, 10.0, 10.0),
            Vector3::new(14.0, 10.0, 10.0),
            Vector3::new(12.0, 13.5, 10.0),
        ])
    }

    fn argon_cube() -> SimulationState {
        let mut positions = Vec::new();
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    positions.push(Vector3::new(10.0, 10.0, 10.0) + Vector3::new(x as f64, y as f64, z as f64) * 4.0);
                }
            }
        }
        argon_state(&positions)
    }

    fn base_config(steps: u64) -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
            .timestep(1.0)
            .number_of_steps(steps)
            .cutoff(12.0)
    }

    fn run_quietly(engine: &mut Engine) -> Result<RunSummary, EngineError> {
        run(engine, &ProgressReporter::new(), |_, _| Ok::<(), EngineError>(()))
    }

    #[test]
    fn argon_trimer_conserves_total_energy() {
        let config = base_config(1000).initial_velocities(20.0, 42).build().unwrap();
        let mut engine = EngineBuilder::new(argon_trimer(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        let initial = engine.last_data().unwrap().total_energy();
        assert!(initial < 0.0);

        let mut max_drift: f64 = 0.0;
        run(&mut engine, &ProgressReporter::new(), |data, _| {
            max_drift = max_drift.max(((data.total_energy() - initial) / initial).abs());
            Ok::<(), EngineError>(())
        })
        .unwrap();
        assert!(max_drift < 1e-3, "relative energy drift {max_drift}");
        assert_eq!(engine.timings().step(), 1000);
    }

    #[test]
    fn momentum_stays_zero_without_external_forces() {
        let config = base_config(200).initial_velocities(30.0, 1).build().unwrap();
        let mut engine = EngineBuilder::new(argon_cube(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        let summary = run_quietly(&mut engine).unwrap();
        assert!(summary.last.momentum < 1e-9);
        assert_eq!(summary.steps, 200);
        assert!(summary.average.is_some());
    }

    #[test]
    fn observer_sees_initial_state_and_every_output_step() {
        let config = base_config(10).output_frequency(4).build().unwrap();
        let mut engine = EngineBuilder::new(argon_trimer(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::StepCompleted { step, .. } = event {
                events.lock().unwrap().push(step);
            }
        }));
        let mut observed = Vec::new();
        run(&mut engine, &reporter, |data, state| {
            assert_eq!(state.number_of_atoms(), 3);
            observed.push(data.step);
            Ok::<(), EngineError>(())
        })
        .unwrap();
        assert_eq!(observed, vec![0, 4, 8, 10]);
        assert_eq!(*events.lock().unwrap(), vec![4, 8, 10]);
    }

    #[test]
    fn stepping_past_the_end_is_rejected() {
        let config = base_config(1).build().unwrap();
        let mut engine = EngineBuilder::new(argon_trimer(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        engine.step().unwrap();
        assert!(matches!(engine.step(), Err(EngineError::Internal(_))));
    }

    #[test]
    fn berendsen_thermostat_heats_a_cold_cluster() {
        let config = base_config(600)
            .initial_velocities(10.0, 5)
            .thermostat(ThermostatConfig::Berendsen {
                target_temperature: 120.0,
                relaxation_time: 0.1,
            })
            .build()
            .unwrap();
        let mut engine = EngineBuilder::new(argon_cube(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        let summary = run_quietly(&mut engine).unwrap();
        assert!(summary.last.temperature > 60.0, "temperature {}", summary.last.temperature);
    }

    #[test]
    fn nose_hoover_run_stays_finite() {
        let config = base_config(300)
            .initial_velocities(40.0, 9)
            .thermostat(ThermostatConfig::NoseHoover {
                target_temperature: 80.0,
                coupling_frequency: 5.0,
            })
            .build()
            .unwrap();
        let mut engine = EngineBuilder::new(argon_cube(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        let summary = run_quietly(&mut engine).unwrap();
        assert!(summary.last.total_energy().is_finite());
        assert!(matches!(engine.thermostat(), Thermostat::NoseHoover { chi, .. } if *chi != 0.0));
    }

    #[test]
    fn berendsen_manostat_compresses_towards_higher_target_pressure() {
        let config = base_config(20)
            .manostat(ManostatConfig::Berendsen {
                target_pressure: 5000.0,
                relaxation_time: 1.0,
                compressibility: 4.5e-5,
            })
            .build()
            .unwrap();
        let mut engine = EngineBuilder::new(argon_trimer(), config)
            .force_field(argon_params())
            .build()
            .unwrap();
        let initial_volume = engine.state().simulation_box().volume();
        run_quietly(&mut engine).unwrap();
        assert!(engine.state().simulation_box().volume() < initial_volume);
    }

    #[test]
    fn bond_constraints_hold_during_dynamics() {
        let dimer = |offset: Vector3<f64>| {
            vec![
                Atom::new("A", 0, offset).with_mass(ARGON_MASS),
                Atom::new("B", 0, offset + Vector3::new(2.0, 0.0, 0.0)).with_mass(ARGON_MASS),
            ]
        };
        let state = SimulationStateBuilder::new()
            .simulation_box(SimulationBox::orthorhombic(Vector3::new(30.0, 30.0, 30.0)).unwrap())
            .molecule_type(MoleculeType::new(0, "dimer", &["A", "B"]))
            .molecule(0, dimer(Vector3::new(10.0, 10.0, 10.0)))
            .molecule(0, dimer(Vector3::new(10.0, 14.0, 10.0)))
            .build()
            .unwrap();
        let bonds = (0..2)
            .map(|molecule| BondConstraint {
                molecule,
                atom_a: 0,
                atom_b: 1,
                length: 2.0,
            })
            .collect();
        let config = base_config(200).initial_velocities(50.0, 3).build().unwrap();
        let mut engine = EngineBuilder::new(state, config)
            .force_field(argon_params())
            .bond_constraints(bonds)
            .build()
            .unwrap();
        // 12 coordinates - 3 centre of mass - 2 bonds
        assert_eq!(engine.state().degrees_of_freedom(), 7.0);

        run_quietly(&mut engine).unwrap();
        let positions: Vec<Vector3<f64>> = engine.state().atoms_iter().map(|a| a.position).collect();
        for pair in positions.chunks(2) {
            assert!(((pair[0] - pair[1]).norm() - 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn rigid_molecules_keep_their_shape() {
        let shape = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 2.5, 0.0),
        ];
        let triangle = |offset: Vector3<f64>| {
            ["A", "B", "C"]
                .iter()
                .zip(&shape)
                .map(|(name, p)| Atom::new(name, 0, offset + p).with_mass(ARGON_MASS))
                .collect::<Vec<_>>()
        };
        let state = SimulationStateBuilder::new()
            .simulation_box(SimulationBox::orthorhombic(Vector3::new(30.0, 30.0, 30.0)).unwrap())
            .molecule_type(MoleculeType::new(0, "triangle", &["A", "B", "C"]))
            .molecule(0, triangle(Vector3::new(10.0, 10.0, 10.0)))
            .molecule(0, triangle(Vector3::new(10.0, 10.0, 14.0)))
            .build()
            .unwrap();
        let reference = MShakeReference {
            molecule_type: 0,
            atom_names: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            positions: shape.to_vec(),
        };
        let config = base_config(200).initial_velocities(50.0, 8).build().unwrap();
        let mut engine = EngineBuilder::new(state, config)
            .force_field(argon_params())
            .rigid_references(vec![reference])
            .build()
            .unwrap();
        // 18 coordinates - 3 centre of mass - 2 * 3 internal
        assert_eq!(engine.state().degrees_of_freedom(), 9.0);

        run_quietly(&mut engine).unwrap();
        let positions: Vec<Vector3<f64>> = engine.state().atoms_iter().map(|a| a.position).collect();
        for body in positions.chunks(3) {
            assert!(((body[0] - body[1]).norm() - 2.0).abs() < 1e-6);
            assert!(((body[0] - body[2]).norm() - 2.5).abs() < 1e-6);
            assert!(((body[1] - body[2]).norm() - 41.0_f64.sqrt() / 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_force_source_and_bad_device_fail_setup() {
        let config = base_config(1).build().unwrap();
        let result = EngineBuilder::new(argon_trimer(), config).build();
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::MissingParameter("force_field")))
        ));

        let config = base_config(1).device_id(3).build().unwrap();
        let result = EngineBuilder::new(argon_trimer(), config)
            .force_field(argon_params())
            .build();
        match result {
            Err(EngineError::Device(e)) => {
                assert!(e.to_string().starts_with("Error in Device initialization:"));
            }
            other => panic!("expected a device error, got {other:?}"),
        }
    }

    struct Harmonic;

    impl QmForceProvider for Harmonic {
        fn compute(&mut self, request: &QmRequest, _: &CancellationToken) -> Result<QmResult, QmError> {
            let center = request.positions.iter().sum::<Vector3<f64>>() / request.positions.len() as f64;
            let forces = request.positions.iter().map(|p| (center - p) * 0.1).collect();
            let energy = request
                .positions
                .iter()
                .map(|p| 0.05 * (p - center).norm_squared())
                .sum();
            Ok(QmResult { forces, energy })
        }
    }

    struct Hanging;

    impl QmForceProvider for Hanging {
        fn compute(&mut self, _: &QmRequest, cancel: &CancellationToken) -> Result<QmResult, QmError> {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(QmError::Cancelled)
        }
    }

    #[test]
    fn qm_forces_drive_the_dynamics() {
        let config = base_config(50)
            .force_source(ForceSource::Qm {
                timeout: Duration::from_secs(5),
            })
            .build()
            .unwrap();
        let mut engine = EngineBuilder::new(argon_trimer(), config)
            .qm_provider(Box::new(Harmonic))
            .build()
            .unwrap();
        let initial = engine.last_data().unwrap().clone();
        assert!(initial.qm_energy > 0.0);
        assert_eq!(initial.coulomb_energy, 0.0);
        let summary = run_quietly(&mut engine).unwrap();
        assert!(summary.last.kinetic_energy > 0.0);
        assert!(summary.last.qm_energy < initial.qm_energy);
    }

    #[test]
    fn qm_timeout_fails_the_step() {
        let config = base_config(5)
            .force_source(ForceSource::Qm {
                timeout: Duration::from_millis(20),
            })
            .build()
            .unwrap();
        let result = EngineBuilder::new(argon_trimer(), config)
            .qm_provider(Box::new(Hanging))
            .build();
        assert!(matches!(result, Err(EngineError::QmTimeout { step: 0, .. })));
    }
}
