//! Pressure assembly errors.

use pf_core::CoreError;
use thiserror::Error;

pub type PressureResult<T> = Result<T, PressureError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PressureError {
    #[error("Assembler used before init")]
    NotInitialized,

    /// Entry outside the sparsity pattern fixed at init.
    #[error("Matrix entry ({row}, {col}) is not in the sparsity pattern")]
    OutsidePattern { row: usize, col: usize },

    #[error("Invalid input: {what}")]
    InvalidInput { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}
