use mdflow::engine::config::ManostatConfig;

pub struct DefaultsConfig {
    pub timestep: f64,
    pub number_of_steps: u64,
    pub output_frequency: u64,
    pub cutoff: f64,
    pub output_file: &'static str,
    pub thermostat_relaxation_time: f64,
    pub coupling_frequency: f64,
    pub manostat_relaxation_time: f64,
    pub compressibility: f64,
    pub velocity_seed: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0,
            number_of_steps: 1000,
            output_frequency: 10,
            cutoff: 10.0,
            output_file: "energies.csv",
            thermostat_relaxation_time: 0.1,
            coupling_frequency: 1.0,
            manostat_relaxation_time: ManostatConfig::DEFAULT_RELAXATION_TIME,
            compressibility: ManostatConfig::DEFAULT_COMPRESSIBILITY,
            velocity_seed: 42,
        }
    }
}
