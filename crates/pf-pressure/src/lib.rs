//! pf-pressure: pressure system assembly and linear solvers.
//!
//! - [`PressureAssembler`] builds the linearised pressure system for given
//!   fluid properties and turns its solution into pressures and fluxes.
//! - [`TpfaAssembler`] is the two-point flux implementation.
//! - [`LinearSolver`] solves the CSR system; [`DenseLuSolver`] and
//!   [`BiCgStabSolver`] are selected through [`LinearSolverConfig`].

pub mod assembler;
pub mod csr;
pub mod error;
pub mod linsolve;
pub mod tpfa;

pub use assembler::{AssembleInput, FaceBc, PressureAssembler, PressureFluxOutput};
pub use csr::{CsrMatrix, LinearSystem};
pub use error::{PressureError, PressureResult};
pub use linsolve::{BiCgStabSolver, DenseLuSolver, LinearSolver, LinearSolverConfig, LinearSolverReport};
pub use tpfa::TpfaAssembler;
