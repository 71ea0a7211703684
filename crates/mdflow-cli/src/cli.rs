use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The mdflow developers",
    version,
    about = "mdflow CLI - Run molecular-dynamics simulations with pair potentials, bond and rigid-body constraints, thermostats and manostats.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of worker threads of the host device.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a molecular-dynamics simulation.
    Run(RunArgs),
    /// Validate the configuration, force field and system without stepping.
    Check(CheckArgs),
}

/// Neighbour search strategy for the pair potential.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborMethodArg {
    BruteForce,
    CellList,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the per-step energy CSV output path.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    // --- Simulation Overrides ---
    /// Override the number of steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override the timestep in fs.
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub timestep: Option<f64>,

    /// Override how often (in steps) observables are written.
    #[arg(long, value_name = "INT")]
    pub output_frequency: Option<u64>,

    // --- Potential Overrides ---
    /// Override the pair cutoff in Å.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Override the neighbour search strategy.
    #[arg(long, value_enum, value_name = "METHOD")]
    pub neighbor_method: Option<NeighborMethodArg>,

    /// Override the seed for initial velocities.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S thermostat.target-temperature=300
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

impl From<CheckArgs> for RunArgs {
    fn from(args: CheckArgs) -> Self {
        Self {
            config: args.config,
            output: None,
            steps: None,
            timestep: None,
            output_frequency: None,
            cutoff: None,
            neighbor_method: None,
            seed: None,
            set_values: args.set_values,
        }
    }
}
