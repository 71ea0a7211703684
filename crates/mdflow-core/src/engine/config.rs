use crate::core::forcefield::params::NonCoulombLaw;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Parameter '{parameter}' cannot be negative (got {value})")]
    Negative { parameter: &'static str, value: f64 },

    #[error("Parameter '{parameter}' must be positive (got {value})")]
    NotPositive { parameter: &'static str, value: f64 },

    #[error("Non-Coulomb law '{0}' is not implemented")]
    UnknownLaw(String),

    #[error("No pair parameters for atom types '{type_a}' and '{type_b}'")]
    MissingPairParameters { type_a: String, type_b: String },

    #[error(
        "Pair parameters for atom types '{type_a}' and '{type_b}' belong to the {found} law, but the run uses {expected}"
    )]
    WrongLawParameters {
        type_a: String,
        type_b: String,
        expected: NonCoulombLaw,
        found: NonCoulombLaw,
    },

    #[error("Atom type index {index} is not defined in the force field ({count} types)")]
    UnknownAtomType { index: usize, count: usize },

    #[error("Cutoff {cutoff} Å exceeds half the smallest perpendicular box width ({max} Å)")]
    CutoffTooLarge { cutoff: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborMethod {
    #[default]
    BruteForce,
    CellList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PotentialConfig {
    /// Spherical cutoff in Å.
    pub cutoff: f64,
    pub method: NeighborMethod,
    /// Also evaluate non-bonded pairs inside a molecule, minus constrained bonds and exclusions.
    pub include_intramolecular: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintConfig {
    /// Relative bond-length tolerance for SHAKE and the M-Shake fit.
    pub shake_tolerance: f64,
    pub shake_max_iterations: usize,
    /// Relative bond-velocity tolerance for RATTLE, in 1/s.
    pub rattle_tolerance: f64,
    pub rattle_max_iterations: usize,
    /// Largest mass-weighted RMS distortion of a rigid molecule, relative to
    /// its reference radius, that the M-Shake fit accepts.
    pub mshake_tolerance: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            shake_tolerance: 1e-8,
            shake_max_iterations: 20,
            rattle_tolerance: 1e4,
            rattle_max_iterations: 20,
            mshake_tolerance: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ThermostatConfig {
    #[default]
    None,
    /// Velocity rescaling towards the target; relaxation time in ps.
    Berendsen {
        target_temperature: f64,
        relaxation_time: f64,
    },
    /// Friction thermostat; coupling frequency in 1/ps.
    NoseHoover {
        target_temperature: f64,
        coupling_frequency: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ManostatConfig {
    #[default]
    None,
    /// Isotropic box scaling; pressure in bar, relaxation time in ps, compressibility in 1/bar.
    Berendsen {
        target_pressure: f64,
        relaxation_time: f64,
        compressibility: f64,
    },
}

impl ManostatConfig {
    pub const DEFAULT_RELAXATION_TIME: f64 = 1.0;
    pub const DEFAULT_COMPRESSIBILITY: f64 = 4.5e-5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VirialKind {
    #[default]
    Atomic,
    /// Removes the intramolecular contribution relative to each centre of mass.
    Molecular,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ForceSource {
    #[default]
    ForceField,
    Qm { timeout: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VelocityInit {
    pub temperature: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Timestep in fs.
    pub timestep: f64,
    pub number_of_steps: u64,
    pub output_frequency: u64,
    pub potential: PotentialConfig,
    pub constraints: ConstraintConfig,
    pub thermostat: ThermostatConfig,
    pub manostat: ManostatConfig,
    pub virial: VirialKind,
    pub force_source: ForceSource,
    pub device_id: Option<usize>,
    pub initial_velocities: Option<VelocityInit>,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    timestep: Option<f64>,
    number_of_steps: Option<u64>,
    output_frequency: Option<u64>,
    cutoff: Option<f64>,
    neighbor_method: Option<NeighborMethod>,
    include_intramolecular: bool,
    constraints: Option<ConstraintConfig>,
    thermostat: Option<ThermostatConfig>,
    manostat: Option<ManostatConfig>,
    virial: Option<VirialKind>,
    force_source: Option<ForceSource>,
    device_id: Option<usize>,
    initial_velocities: Option<VelocityInit>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestep(mut self, fs: f64) -> Self {
        self.timestep = Some(fs);
        self
    }
    pub fn number_of_steps(mut self, steps: u64) -> Self {
        self.number_of_steps = Some(steps);
        self
    }
    pub fn output_frequency(mut self, every: u64) -> Self {
        self.output_frequency = Some(every);
        self
    }
    pub fn cutoff(mut self, angstrom: f64) -> Self {
        self.cutoff = Some(angstrom);
        self
    }
    pub fn neighbor_method(mut self, method: NeighborMethod) -> Self {
        self.neighbor_method = Some(method);
        self
    }
    pub fn include_intramolecular(mut self, include: bool) -> Self {
        self.include_intramolecular = include;
        self
    }
    pub fn constraints(mut self, constraints: ConstraintConfig) -> Self {
        self.constraints = Some(constraints);
        self
    }
    pub fn thermostat(mut self, thermostat: ThermostatConfig) -> Self {
        self.thermostat = Some(thermostat);
        self
    }
    pub fn manostat(mut self, manostat: ManostatConfig) -> Self {
        self.manostat = Some(manostat);
        self
    }
    pub fn virial(mut self, kind: VirialKind) -> Self {
        self.virial = Some(kind);
        self
    }
    pub fn force_source(mut self, source: ForceSource) -> Self {
        self.force_source = Some(source);
        self
    }
    pub fn device_id(mut self, id: usize) -> Self {
        self.device_id = Some(id);
        self
    }
    pub fn initial_velocities(mut self, temperature: f64, seed: u64) -> Self {
        self.initial_velocities = Some(VelocityInit { temperature, seed });
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let timestep = self
            .timestep
            .ok_or(ConfigError::MissingParameter("timestep"))?;
        positive("timestep", timestep)?;

        let number_of_steps = self
            .number_of_steps
            .ok_or(ConfigError::MissingParameter("number_of_steps"))?;

        let output_frequency = self.output_frequency.unwrap_or(1);
        if output_frequency == 0 {
            return Err(ConfigError::NotPositive {
                parameter: "output_frequency",
                value: 0.0,
            });
        }

        let cutoff = self.cutoff.ok_or(ConfigError::MissingParameter("cutoff"))?;
        positive("cutoff", cutoff)?;

        let constraints = self.constraints.unwrap_or_default();
        non_negative("shake_tolerance", constraints.shake_tolerance)?;
        non_negative("rattle_tolerance", constraints.rattle_tolerance)?;
        non_negative("mshake_tolerance", constraints.mshake_tolerance)?;

        let thermostat = self.thermostat.unwrap_or_default();
        match &thermostat {
            ThermostatConfig::None => {}
            ThermostatConfig::Berendsen {
                target_temperature,
                relaxation_time,
            } => {
                non_negative("target_temperature", *target_temperature)?;
                non_negative("thermostat_relaxation_time", *relaxation_time)?;
                positive("thermostat_relaxation_time", *relaxation_time)?;
            }
            ThermostatConfig::NoseHoover {
                target_temperature,
                coupling_frequency,
            } => {
                non_negative("target_temperature", *target_temperature)?;
                positive("target_temperature", *target_temperature)?;
                non_negative("coupling_frequency", *coupling_frequency)?;
            }
        }

        let manostat = self.manostat.unwrap_or_default();
        if let ManostatConfig::Berendsen {
            target_pressure,
            relaxation_time,
            compressibility,
        } = &manostat
        {
            non_negative("target_pressure", *target_pressure)?;
            non_negative("manostat_relaxation_time", *relaxation_time)?;
            positive("manostat_relaxation_time", *relaxation_time)?;
            non_negative("compressibility", *compressibility)?;
        }

        let force_source = self.force_source.unwrap_or_default();
        if let ForceSource::Qm { timeout } = &force_source {
            if timeout.is_zero() {
                return Err(ConfigError::NotPositive {
                    parameter: "qm_timeout",
                    value: 0.0,
                });
            }
        }

        if let Some(init) = &self.initial_velocities {
            non_negative("initial_temperature", init.temperature)?;
        }

        Ok(SimulationConfig {
            timestep,
            number_of_steps,
            output_frequency,
            potential: PotentialConfig {
                cutoff,
                method: self.neighbor_method.unwrap_or_default(),
                include_intramolecular: self.include_intramolecular,
            },
            constraints,
            thermostat,
            manostat,
            virial: self.virial.unwrap_or_default(),
            force_source,
            device_id: self.device_id,
            initial_velocities: self.initial_velocities,
        })
    }
}

fn non_negative(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value < 0.0 || value.is_nan() {
        return Err(ConfigError::Negative { parameter, value });
    }
    Ok(())
}

fn positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ConfigError::NotPositive { parameter, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
            .timestep(1.0)
            .number_of_steps(100)
            .cutoff(12.0)
    }

    #[test]
    fn build_applies_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.timestep, 1.0);
        assert_eq!(config.output_frequency, 1);
        assert_eq!(config.potential.method, NeighborMethod::BruteForce);
        assert!(!config.potential.include_intramolecular);
        assert_eq!(config.constraints, ConstraintConfig::default());
        assert_eq!(config.thermostat, ThermostatConfig::None);
        assert_eq!(config.manostat, ManostatConfig::None);
        assert_eq!(config.virial, VirialKind::Atomic);
        assert_eq!(config.force_source, ForceSource::ForceField);
        assert_eq!(config.device_id, None);
    }

    #[test]
    fn build_fails_without_required_parameters() {
        let result = SimulationConfigBuilder::new().cutoff(10.0).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("timestep")));

        let result = SimulationConfigBuilder::new()
            .timestep(1.0)
            .number_of_steps(10)
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("cutoff")));
    }

    #[test]
    fn negative_manostat_relaxation_time_is_rejected() {
        let result = minimal()
            .manostat(ManostatConfig::Berendsen {
                target_pressure: 1.0,
                relaxation_time: -1.0,
                compressibility: 4.5e-5,
            })
            .build();
        assert_eq!(
            result,
            Err(ConfigError::Negative {
                parameter: "manostat_relaxation_time",
                value: -1.0
            })
        );
    }

    #[test]
    fn negative_compressibility_is_rejected() {
        let result = minimal()
            .manostat(ManostatConfig::Berendsen {
                target_pressure: 1.0,
                relaxation_time: ManostatConfig::DEFAULT_RELAXATION_TIME,
                compressibility: -4.5e-5,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Negative {
                parameter: "compressibility",
                ..
            })
        ));
    }

    #[test]
    fn negative_constraint_tolerance_is_rejected() {
        let result = minimal()
            .constraints(ConstraintConfig {
                shake_tolerance: -1e-8,
                ..ConstraintConfig::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Negative {
                parameter: "shake_tolerance",
                ..
            })
        ));
    }

    #[test]
    fn negative_mshake_tolerance_is_rejected() {
        let result = minimal()
            .constraints(ConstraintConfig {
                mshake_tolerance: -0.01,
                ..ConstraintConfig::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Negative {
                parameter: "mshake_tolerance",
                ..
            })
        ));
    }

    #[test]
    fn negative_thermostat_parameters_are_rejected() {
        let result = minimal()
            .thermostat(ThermostatConfig::NoseHoover {
                target_temperature: 300.0,
                coupling_frequency: -10.0,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Negative {
                parameter: "coupling_frequency",
                ..
            })
        ));

        let result = minimal()
            .thermostat(ThermostatConfig::Berendsen {
                target_temperature: -300.0,
                relaxation_time: 0.1,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Negative {
                parameter: "target_temperature",
                ..
            })
        ));
    }

    #[test]
    fn non_positive_timestep_and_zero_output_frequency_are_rejected() {
        assert!(matches!(
            minimal().timestep(0.0).build(),
            Err(ConfigError::NotPositive {
                parameter: "timestep",
                ..
            })
        ));
        assert!(matches!(
            minimal().output_frequency(0).build(),
            Err(ConfigError::NotPositive {
                parameter: "output_frequency",
                ..
            })
        ));
    }

    #[test]
    fn zero_qm_timeout_is_rejected() {
        let result = minimal()
            .force_source(ForceSource::Qm {
                timeout: Duration::ZERO,
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::NotPositive {
                parameter: "qm_timeout",
                ..
            })
        ));
    }
}
