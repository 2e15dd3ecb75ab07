use pf_fluids::FluidError;
use pf_grid::GridError;
use pf_solver::SolverError;
use pf_wells::WellError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Case parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid case: {what}")]
    Invalid { what: String },

    #[error("Step {step} failed: {outcome}")]
    StepFailed { step: usize, outcome: String },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Fluid(#[from] FluidError),

    #[error(transparent)]
    Well(#[from] WellError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

pub type CliResult<T> = Result<T, CliError>;
