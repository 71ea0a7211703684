use super::run::prepare_engine;
use crate::cli::{CheckArgs, RunArgs};
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use mdflow::engine::progress::ProgressReporter;
use tracing::info;

/// Validates the run file, force field and system and evaluates the initial
/// forces without advancing time.
pub fn run(args: CheckArgs) -> Result<()> {
    info!("Checking run configuration {:?}", args.config);
    let run_args: RunArgs = args.into();
    let app = config::build_config(&run_args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let engine = prepare_engine(&app, &reporter)?;

    let initial = engine
        .last_data()
        .ok_or_else(|| CliError::Other(anyhow::anyhow!("engine produced no initial data")))?;
    let state = engine.state();
    println!(
        "Configuration is valid: {} atoms in {} molecules, volume {:.3} Å³.",
        state.number_of_atoms(),
        state.number_of_molecules(),
        initial.volume
    );
    println!(
        "  initial: T = {:.3} K   P = {:.3} bar   E_pot = {:.6} kcal/mol",
        initial.temperature,
        initial.pressure,
        initial.potential_energy()
    );
    Ok(())
}
