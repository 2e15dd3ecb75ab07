//! Grid-specific error types.

use pf_core::CoreError;
use thiserror::Error;

pub type GridResult<T> = Result<T, GridError>;

/// Grid construction and rock validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Invalid dimensions: {what}")]
    InvalidDimensions { what: &'static str },

    #[error("Invalid rock property for cell {cell}: {what}")]
    InvalidRock { cell: usize, what: &'static str },

    #[error("Boundary id {id} already has a condition")]
    DuplicateBoundary { id: u32 },

    #[error("Boundary id 0 is reserved for interior faces")]
    InteriorBoundaryId,

    #[error(transparent)]
    Core(#[from] CoreError),
}
