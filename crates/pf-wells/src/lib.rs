//! pf-wells: well contract and a validated in-memory well set.
//!
//! The solver reads wells through the [`Wells`] trait only. [`WellSet`] is
//! built with [`WellSetBuilder`] (or from serialisable [`WellDef`]s) and
//! rejects cells perforated twice, out-of-range cells and malformed controls.

pub mod error;
pub mod set;
mod validate;
pub mod wells;

pub use error::{WellError, WellResult};
pub use set::{PerforationDef, WellDef, WellSet, WellSetBuilder};
pub use wells::{WellControl, WellType, Wells};
