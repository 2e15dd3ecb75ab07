//! Fluid property errors.

use pf_core::CoreError;
use thiserror::Error;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors raised while building or evaluating a fluid model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-finite pressure or composition handed to `evaluate`.
    #[error("Non-physical fluid input: {what}")]
    NonPhysical { what: &'static str },

    /// Rejected phase parameters.
    #[error("Invalid fluid parameter: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unsupported fluid layout: {what}")]
    NotSupported { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}
