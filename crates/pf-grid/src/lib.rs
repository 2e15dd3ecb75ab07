//! pf-grid: mesh, rock and boundary-condition contracts for porflow.
//!
//! The pressure solver only talks to the [`Mesh`], [`Rock`] and
//! [`BoundaryConditions`] traits. [`CartesianGrid`], [`RockProperties`] and
//! [`FlowBcSet`] are the in-tree implementations used by tests and the CLI.

pub mod bc;
pub mod cartesian;
pub mod error;
pub mod mesh;
pub mod rock;

pub use bc::{BoundaryConditions, FlowBc, FlowBcSet};
pub use cartesian::CartesianGrid;
pub use error::{GridError, GridResult};
pub use mesh::Mesh;
pub use rock::{Rock, RockProperties};
