use crate::cli::RunArgs;
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::output::EnergyWriter;
use crate::system::{self, SystemDescription};
use crate::utils::progress::CliProgressHandler;
use mdflow::core::forcefield::params::ForceFieldParams;
use mdflow::engine::progress::{Progress, ProgressReporter};
use mdflow::workflows::simulate::{self, Engine, EngineBuilder, RunSummary};
use std::time::Instant;
use tracing::{info, warn};

/// Loads the force field and system named by `app` and builds a ready engine.
pub(crate) fn prepare_engine(app: &AppConfig, reporter: &ProgressReporter) -> Result<Engine> {
    reporter.report(Progress::PhaseStart {
        name: "Loading force field",
    });
    let params = ForceFieldParams::load(&app.forcefield_path)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Loading system",
    });
    let SystemDescription {
        state,
        bonds,
        rigid_references,
    } = system::load_system(&app.system_path, &params)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Building engine",
    });
    let engine = EngineBuilder::new(state, app.simulation.clone())
        .force_field(params)
        .bond_constraints(bonds)
        .rigid_references(rigid_references)
        .build()?;
    reporter.report(Progress::PhaseFinish);
    Ok(engine)
}

pub fn run(args: RunArgs) -> Result<()> {
    info!("Starting MD run with config {:?}", args.config);
    let app = config::build_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let mut engine = prepare_engine(&app, &reporter)?;
    let mut writer = EnergyWriter::create(&app.output_path, app.simulation.timestep)?;
    let started = Instant::now();

    let summary = simulate::run::<CliError, _>(&mut engine, &reporter, |data, _state| {
        writer.write(data)
    })?;
    writer.finish()?;

    info!(
        "Energies written to {:?}; {} steps ({:.3} ps simulated) in {:.2?}.",
        app.output_path,
        summary.steps,
        engine.timings().simulation_time(),
        started.elapsed()
    );
    report_summary(&summary);
    Ok(())
}

fn report_summary(summary: &RunSummary) {
    let last = &summary.last;
    println!("Completed {} steps.", summary.steps);
    println!(
        "  final:   T = {:10.3} K   P = {:12.3} bar   E_tot = {:14.6} kcal/mol",
        last.temperature,
        last.pressure,
        last.total_energy()
    );
    match &summary.average {
        Some(avg) => println!(
            "  average: T = {:10.3} K   P = {:12.3} bar   E_tot = {:14.6} kcal/mol",
            avg.temperature,
            avg.pressure,
            avg.total_energy()
        ),
        None => warn!("No steps were run; averages are unavailable."),
    }
}
