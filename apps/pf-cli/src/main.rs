mod case;
mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pf_grid::Mesh;
use pf_solver::{ImpesStepper, PressureController};
use pf_wells::Wells;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use case::CaseFile;
use error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(about = "PorFlow CLI - compressible multi-phase porous media flow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file and build its model
    Validate {
        /// Path to the case YAML file
        case_path: PathBuf,
    },
    /// Run the schedule of a case
    Run {
        /// Path to the case YAML file
        case_path: PathBuf,
        /// Override the number of steps in the schedule
        #[arg(long)]
        steps: Option<usize>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run { case_path, steps } => cmd_run(&case_path, steps),
    }
}

fn cmd_validate(case_path: &Path) -> CliResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = CaseFile::load(case_path)?;
    let model = case.build()?;

    let mut controller = PressureController::new(case.solver.clone())?;
    controller.setup(
        &model.grid,
        &model.rock,
        &model.fluid,
        &model.wells,
        model.gravity,
        &model.bc,
    )?;
    controller.initial_state(case.initial.pressure, &model.initial_composition)?;

    println!("✓ Case is valid");
    println!("  Cells: {}", model.grid.num_cells());
    println!("  Faces: {}", model.grid.num_faces());
    println!("  Wells: {}", model.wells.num_wells());
    Ok(())
}

fn cmd_run(case_path: &Path, steps: Option<usize>) -> CliResult<()> {
    let case = CaseFile::load(case_path)?;
    let model = case.build()?;
    let steps = steps.unwrap_or(case.schedule.steps);
    println!("Running case: {}", case_path.display());
    println!("  dt = {:.3e} s, steps = {}", case.schedule.dt, steps);

    let mut controller = PressureController::new(case.solver.clone())?;
    controller.setup(
        &model.grid,
        &model.rock,
        &model.fluid,
        &model.wells,
        model.gravity,
        &model.bc,
    )?;
    let mut state = controller.initial_state(case.initial.pressure, &model.initial_composition)?;
    let stepper = ImpesStepper::new(case.stepping.clone())?;

    info!(
        cells = model.grid.num_cells(),
        wells = model.wells.num_wells(),
        steps,
        "starting run"
    );

    let mut time = 0.0;
    for step in 0..steps {
        let report = stepper.step(&mut controller, &mut state, &model.sources, case.schedule.dt)?;
        if !report.accepted() {
            warn!(step, outcome = ?report.outcome, "step rejected after cutbacks");
            return Err(CliError::StepFailed {
                step,
                outcome: format!("{:?}", report.outcome),
            });
        }
        time += report.dt;
        info!(
            step,
            time,
            dt = report.dt,
            cutbacks = report.cutbacks,
            "step accepted"
        );

        let mean_p = state.cell_pressure.iter().map(|p| p[0]).sum::<f64>()
            / state.cell_pressure.len() as f64;
        println!(
            "  step {:>4}  t = {:.4e} s  iters = {:>2}  cutbacks = {}  substeps = {:>3}  mean p = {:.6e} Pa",
            step + 1,
            time,
            report.pressure_iterations,
            report.cutbacks,
            report.transport_substeps,
            mean_p
        );
    }

    for (k, (p, q)) in state
        .well_perf_pressure
        .iter()
        .zip(&state.well_perf_flux)
        .enumerate()
    {
        println!("  perforation {k}: p = {p:.6e} Pa, q = {q:.4e} m^3/s");
    }
    println!("✓ Run completed");
    Ok(())
}
