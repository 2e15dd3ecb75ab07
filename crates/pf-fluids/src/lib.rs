//! pf-fluids: fluid property contracts for porflow.
//!
//! Provides:
//! - `FluidModel` trait mapping (phase pressures, composition) to a `FluidState`
//! - `ImmiscibleFluid`, a one-component-per-phase compressible model
//! - `FluidSnapshot`, the bulk per-cell/per-face property evaluator
//!
//! # Architecture
//!
//! The pressure solver never inspects a concrete fluid. It calls
//! `FluidModel::compute_state` per entity and reads the cached arrays of a
//! `FluidSnapshot`. Phase-to-component transforms are `nalgebra` matrices with
//! one row per component and one column per phase.

pub mod error;
pub mod immiscible;
pub mod model;
pub mod snapshot;
pub mod state;

// Re-exports for ergonomics
pub use error::{FluidError, FluidResult};
pub use immiscible::{ImmiscibleFluid, PhaseProps};
pub use model::{ComponentKind, FluidModel, PhaseKind};
pub use snapshot::{FluidSnapshot, SnapshotInput};
pub use state::FluidState;
