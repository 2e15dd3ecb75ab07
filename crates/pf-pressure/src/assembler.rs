//! Pressure assembler contract.

use crate::csr::LinearSystem;
use crate::error::PressureResult;
use nalgebra::{DMatrix, DVector};
use pf_grid::{Mesh, Rock};
use pf_wells::Wells;

/// Boundary condition of a single face as seen by the assembler.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FaceBc {
    /// Interior face, or boundary face without a condition (no flow).
    #[default]
    Unset,
    /// Prescribed pressure [Pa].
    Pressure(f64),
    /// Prescribed outward flux [m^3/s].
    Flux(f64),
}

/// Per-iteration inputs of [`PressureAssembler::assemble`].
///
/// Per-face slices are indexed by face, per-perforation slices by global
/// perforation index (wells in order, perforations in order within a well).
pub struct AssembleInput<'a> {
    /// Volumetric source per cell [m^3/s], positive for injection.
    pub sources: &'a [f64],
    pub bc: &'a [FaceBc],
    pub dt: f64,
    pub total_compressibility: &'a [f64],
    pub volume_discrepancy: &'a [f64],
    pub face_transform: &'a [DMatrix<f64>],
    pub perf_transform: &'a [DMatrix<f64>],
    pub face_mobility: &'a [DVector<f64>],
    pub perf_mobility: &'a [DVector<f64>],
    /// Cell pressure at the start of the time step.
    pub initial_cell_pressure: &'a [f64],
    pub grav_cap_face: &'a [DVector<f64>],
    pub perf_potential: &'a [DVector<f64>],
}

/// Output buffers of [`PressureAssembler::compute_pressures_and_fluxes`].
pub struct PressureFluxOutput<'a> {
    pub cell_pressure: &'a mut [f64],
    pub face_pressure: &'a mut [f64],
    /// Total flux per face, positive from slot 0 to slot 1.
    pub face_flux: &'a mut [f64],
    pub well_bhp: &'a mut [f64],
    /// Total flux per perforation, positive into the reservoir.
    pub perf_flux: &'a mut [f64],
}

/// Builds the linearised pressure system and post-processes its solution.
///
/// Unknowns are ordered as all cell pressures followed by one bottom-hole
/// pressure per well.
pub trait PressureAssembler {
    /// Cache geometry, rock and well topology.
    fn init(&mut self, mesh: &dyn Mesh, wells: &dyn Wells, rock: &dyn Rock) -> PressureResult<()>;

    fn assemble(&mut self, input: &AssembleInput<'_>) -> PressureResult<()>;

    fn linear_system(&self) -> &LinearSystem;

    fn linear_system_mut(&mut self) -> &mut LinearSystem;

    /// Derive pressures and fluxes from the solution buffer of the linear
    /// system and the inputs of the latest `assemble`.
    fn compute_pressures_and_fluxes(&mut self, out: PressureFluxOutput<'_>) -> PressureResult<()>;

    /// Largest stable explicit transport step for the latest fluxes.
    fn explicit_timestep_limit(
        &self,
        face_mobility: &[DVector<f64>],
        face_mobility_deriv: &[DVector<f64>],
    ) -> PressureResult<f64>;

    /// Advance component surface volumes per pore volume by one explicit step.
    fn explicit_transport(&self, dt: f64, cell_z: &mut [DVector<f64>]) -> PressureResult<()>;

    fn face_transmissibilities(&self) -> &[f64];
}
