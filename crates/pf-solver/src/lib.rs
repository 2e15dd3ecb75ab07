//! pf-solver: the outer pressure iteration of a compressible multi-phase
//! flow solver.
//!
//! [`PressureController`] repeatedly re-evaluates fluid properties, assembles
//! and solves the pressure system and updates well perforation pressures until
//! fluxes or pressures stop changing. Compositions are then advanced
//! explicitly (IMPES). [`ImpesStepper`] wraps both with time-step cutback.
//!
//! ```text
//! fluid_bridge -> assembler -> formulation -> well_model -> convergence
//!      ^                                                        |
//!      +-------------------------- next iteration --------------+
//! ```

pub mod config;
pub mod controller;
pub mod convergence;
pub mod error;
pub mod fluid_bridge;
pub mod formulation;
pub mod perforation;
pub mod setup;
pub mod state;
pub mod stepping;
pub mod well_model;

pub use config::{InflowMixture, SolverConfig};
pub use controller::{PressureController, SolveOutcome};
pub use convergence::{RelativeChanges, compute_flux_press_changes, is_converged};
pub use error::{SolverError, SolverResult};
pub use formulation::{
    DirectStep, ResidualJacobianStep, StepContext, StepFormulation, compute_linear_residual,
    relax_in_place,
};
pub use perforation::PerforationTable;
pub use state::ReservoirState;
pub use stepping::{ImpesStepper, StepOptions, StepReport};
pub use well_model::{compute_well_perf_pressures, compute_well_potentials};
