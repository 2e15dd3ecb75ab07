//! Well definition errors.

use pf_core::CoreError;
use thiserror::Error;

pub type WellResult<T> = Result<T, WellError>;

/// Well construction and validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WellError {
    #[error("Well {well} does not exist")]
    UnknownWell { well: usize },

    #[error("Well {well} has no perforations")]
    NoPerforations { well: usize },

    #[error("Perforation cell {cell} out of range (num_cells={num_cells})")]
    CellOutOfRange { cell: usize, num_cells: usize },

    /// A cell may be perforated by at most one well, once.
    #[error("Cell {cell} is perforated more than once")]
    DuplicatePerforation { cell: usize },

    #[error("Well {well}: well index must be positive and finite")]
    InvalidWellIndex { well: usize },

    #[error("Well {well}: invalid control ({what})")]
    InvalidControl { well: usize, what: &'static str },

    #[error("Injector {well} has no injection mixture")]
    MissingMixture { well: usize },

    #[error("Well {well}: injection mixture has {actual} entries, expected {expected}")]
    MixtureLength {
        well: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
