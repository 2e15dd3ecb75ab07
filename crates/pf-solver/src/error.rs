//! Error types for the pressure iteration.

use pf_core::CoreError;
use pf_fluids::FluidError;
use pf_grid::GridError;
use pf_pressure::PressureError;
use pf_wells::WellError;
use thiserror::Error;

/// Fatal errors of the pressure controller.
///
/// Excessive volume discrepancy and non-convergence are not errors; they
/// are reported through [`crate::SolveOutcome`].
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Linear solver failed to converge in {iterations} iterations (residual reduction {reduction:e})")]
    LinearSolverFailed { iterations: usize, reduction: f64 },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },

    #[error("Controller used before setup")]
    NotSetUp,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fluid error: {0}")]
    Fluid(#[from] FluidError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Well error: {0}")]
    Well(#[from] WellError),

    #[error("Pressure assembly error: {0}")]
    Pressure(#[from] PressureError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        SolverError::Config { what: what.into() }
    }
}
