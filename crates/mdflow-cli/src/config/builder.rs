use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileManostatConfig, FileThermostatConfig};
use super::models::AppConfig;
use crate::cli::{NeighborMethodArg, RunArgs};
use crate::error::{CliError, Result};
use mdflow::engine::config::{
    self as core_config, ConstraintConfig, ManostatConfig, NeighborMethod, ThermostatConfig,
    VirialKind,
};
use std::str::FromStr;

pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let system_path = file_config
        .system
        .take()
        .ok_or_else(|| CliError::Config("the run file must name a `system` file".to_string()))?;
    let forcefield_path = file_config.forcefield.take().ok_or_else(|| {
        CliError::Config("the run file must name a `forcefield` file".to_string())
    })?;
    let output_path = args
        .output
        .clone()
        .or(file_config.output.take())
        .unwrap_or_else(|| defaults.output_file.into());

    let sim_file = file_config.simulation.take().unwrap_or_default();
    let pot_file = file_config.potential.take().unwrap_or_default();

    let timestep = args
        .timestep
        .or(sim_file.timestep)
        .unwrap_or(defaults.timestep);
    let number_of_steps = args
        .steps
        .or(sim_file.steps)
        .unwrap_or(defaults.number_of_steps);
    let output_frequency = args
        .output_frequency
        .or(sim_file.output_frequency)
        .unwrap_or(defaults.output_frequency);
    let cutoff = args.cutoff.or(pot_file.cutoff).unwrap_or(defaults.cutoff);

    let neighbor_method = match args.neighbor_method {
        Some(NeighborMethodArg::BruteForce) => NeighborMethod::BruteForce,
        Some(NeighborMethodArg::CellList) => NeighborMethod::CellList,
        None => match pot_file.method.as_deref() {
            None | Some("brute-force") => NeighborMethod::BruteForce,
            Some("cell-list") => NeighborMethod::CellList,
            Some(other) => {
                return Err(CliError::Config(format!(
                    "unknown neighbour method '{other}' (expected 'brute-force' or 'cell-list')"
                )));
            }
        },
    };

    let virial = match sim_file.virial.as_deref() {
        None | Some("atomic") => VirialKind::Atomic,
        Some("molecular") => VirialKind::Molecular,
        Some(other) => {
            return Err(CliError::Config(format!(
                "unknown virial kind '{other}' (expected 'atomic' or 'molecular')"
            )));
        }
    };

    let constraints = {
        let file = file_config.constraints.take().unwrap_or_default();
        let base = ConstraintConfig::default();
        ConstraintConfig {
            shake_tolerance: file.shake_tolerance.unwrap_or(base.shake_tolerance),
            shake_max_iterations: file
                .shake_max_iterations
                .unwrap_or(base.shake_max_iterations),
            rattle_tolerance: file.rattle_tolerance.unwrap_or(base.rattle_tolerance),
            rattle_max_iterations: file
                .rattle_max_iterations
                .unwrap_or(base.rattle_max_iterations),
            mshake_tolerance: file.mshake_tolerance.unwrap_or(base.mshake_tolerance),
        }
    };

    let thermostat = merge_thermostat(file_config.thermostat.take(), &defaults)?;
    let manostat = merge_manostat(file_config.manostat.take(), &defaults)?;

    let mut builder = core_config::SimulationConfigBuilder::new()
        .timestep(timestep)
        .number_of_steps(number_of_steps)
        .output_frequency(output_frequency)
        .cutoff(cutoff)
        .neighbor_method(neighbor_method)
        .include_intramolecular(pot_file.include_intramolecular.unwrap_or(false))
        .constraints(constraints)
        .thermostat(thermostat)
        .manostat(manostat)
        .virial(virial);

    if let Some(id) = sim_file.device_id {
        builder = builder.device_id(id);
    }
    if let Some(velocities) = file_config.initial_velocities.take() {
        let temperature = velocities.temperature.ok_or_else(|| {
            CliError::Config("`initial-velocities` requires `temperature`".to_string())
        })?;
        let seed = args
            .seed
            .or(velocities.seed)
            .unwrap_or(defaults.velocity_seed);
        builder = builder.initial_velocities(temperature, seed);
    }

    let simulation = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        system_path,
        forcefield_path,
        output_path,
        simulation,
    })
}

fn merge_thermostat(
    file_val: Option<FileThermostatConfig>,
    defaults: &DefaultsConfig,
) -> Result<ThermostatConfig> {
    let Some(t) = file_val else {
        return Ok(ThermostatConfig::None);
    };
    let kind = t.kind.as_deref().unwrap_or("none");
    if kind == "none" {
        return Ok(ThermostatConfig::None);
    }
    let target_temperature = t.target_temperature.ok_or_else(|| {
        CliError::Config(format!("`{kind}` thermostat requires `target-temperature`"))
    })?;
    match kind {
        "berendsen" => Ok(ThermostatConfig::Berendsen {
            target_temperature,
            relaxation_time: t
                .relaxation_time
                .unwrap_or(defaults.thermostat_relaxation_time),
        }),
        "nose-hoover" => Ok(ThermostatConfig::NoseHoover {
            target_temperature,
            coupling_frequency: t.coupling_frequency.unwrap_or(defaults.coupling_frequency),
        }),
        other => Err(CliError::Config(format!(
            "unknown thermostat type '{other}' (expected 'none', 'berendsen' or 'nose-hoover')"
        ))),
    }
}

fn merge_manostat(
    file_val: Option<FileManostatConfig>,
    defaults: &DefaultsConfig,
) -> Result<ManostatConfig> {
    let Some(m) = file_val else {
        return Ok(ManostatConfig::None);
    };
    match m.kind.as_deref().unwrap_or("none") {
        "none" => Ok(ManostatConfig::None),
        "berendsen" => Ok(ManostatConfig::Berendsen {
            target_pressure: m.target_pressure.ok_or_else(|| {
                CliError::Config("`berendsen` manostat requires `target-pressure`".to_string())
            })?,
            relaxation_time: m
                .relaxation_time
                .unwrap_or(defaults.manostat_relaxation_time),
            compressibility: m.compressibility.unwrap_or(defaults.compressibility),
        }),
        other => Err(CliError::Config(format!(
            "unknown manostat type '{other}' (expected 'none' or 'berendsen')"
        ))),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "simulation.timestep" => {
                config.simulation.get_or_insert_with(Default::default).timestep =
                    Some(parse_value(key, value_str, "float")?);
            }
            "simulation.steps" => {
                config.simulation.get_or_insert_with(Default::default).steps =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.output-frequency" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .output_frequency = Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.device-id" => {
                config.simulation.get_or_insert_with(Default::default).device_id =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.virial" => {
                config.simulation.get_or_insert_with(Default::default).virial =
                    Some(value_str.to_string());
            }
            "potential.cutoff" => {
                config.potential.get_or_insert_with(Default::default).cutoff =
                    Some(parse_value(key, value_str, "float")?);
            }
            "potential.method" => {
                config.potential.get_or_insert_with(Default::default).method =
                    Some(value_str.to_string());
            }
            "potential.include-intramolecular" => {
                config
                    .potential
                    .get_or_insert_with(Default::default)
                    .include_intramolecular = Some(parse_value(key, value_str, "boolean")?);
            }
            "constraints.shake-tolerance" => {
                config
                    .constraints
                    .get_or_insert_with(Default::default)
                    .shake_tolerance = Some(parse_value(key, value_str, "float")?);
            }
            "constraints.rattle-tolerance" => {
                config
                    .constraints
                    .get_or_insert_with(Default::default)
                    .rattle_tolerance = Some(parse_value(key, value_str, "float")?);
            }
            "constraints.mshake-tolerance" => {
                config
                    .constraints
                    .get_or_insert_with(Default::default)
                    .mshake_tolerance = Some(parse_value(key, value_str, "float")?);
            }
            "thermostat.type" => {
                config.thermostat.get_or_insert_with(Default::default).kind =
                    Some(value_str.to_string());
            }
            "thermostat.target-temperature" => {
                config
                    .thermostat
                    .get_or_insert_with(Default::default)
                    .target_temperature = Some(parse_value(key, value_str, "float")?);
            }
            "manostat.type" => {
                config.manostat.get_or_insert_with(Default::default).kind =
                    Some(value_str.to_string());
            }
            "manostat.target-pressure" => {
                config
                    .manostat
                    .get_or_insert_with(Default::default)
                    .target_pressure = Some(parse_value(key, value_str, "float")?);
            }
            "initial-velocities.temperature" => {
                config
                    .initial_velocities
                    .get_or_insert_with(Default::default)
                    .temperature = Some(parse_value(key, value_str, "float")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
