//! Re-evaluation of fluid properties for cells, faces and perforations.

use nalgebra::{DVector, Vector3};
use pf_fluids::{FluidModel, FluidSnapshot, SnapshotInput};
use pf_grid::{Mesh, Rock};
use pf_wells::{WellType, Wells};

use crate::error::{SolverError, SolverResult};
use crate::perforation::PerforationTable;
use crate::state::ReservoirState;

/// Collaborators needed to evaluate the fluid everywhere.
#[derive(Clone, Copy)]
pub struct FluidContext<'a> {
    pub mesh: &'a dyn Mesh,
    pub rock: &'a dyn Rock,
    pub fluid: &'a dyn FluidModel,
    pub wells: &'a dyn Wells,
    pub gravity: Vector3<f64>,
    pub inflow_mixture: &'a DVector<f64>,
}

/// Refresh the snapshot and the fluid part of the perforation table.
///
/// Injector perforations are evaluated at their own pressure with the
/// injected mixture, all other perforations at the state of their cell.
pub fn compute_fluid_properties(
    ctx: &FluidContext<'_>,
    state: &ReservoirState,
    dt: f64,
    snapshot: &mut FluidSnapshot,
    perfs: &mut PerforationTable,
) -> SolverResult<()> {
    snapshot.compute(&SnapshotInput {
        mesh: ctx.mesh,
        rock: ctx.rock,
        fluid: ctx.fluid,
        gravity: ctx.gravity,
        cell_pressure: &state.cell_pressure,
        face_pressure: &state.face_pressure,
        cell_z: &state.cell_z,
        inflow_mixture: ctx.inflow_mixture,
        dt,
    })?;

    let np = ctx.fluid.num_phases();
    let mut perf = 0;
    for well in 0..ctx.wells.num_wells() {
        let injector = ctx.wells.well_type(well) == WellType::Injector;
        for k in 0..ctx.wells.num_perforations(well) {
            if perf >= perfs.len() {
                return Err(SolverError::Invariant {
                    what: "perforation count mismatch",
                });
            }
            let cell = ctx.wells.well_cell(well, k);
            let fluid_state = if injector {
                let mixture = ctx.wells.injection_mixture(cell).ok_or(SolverError::Invariant {
                    what: "injector perforation without injection mixture",
                })?;
                let p = DVector::from_element(np, perfs.pressure()[perf]);
                ctx.fluid.compute_state(&p, mixture)?
            } else {
                ctx.fluid
                    .compute_state(&state.cell_pressure[cell], &state.cell_z[cell])?
            };
            perfs.set_fluid_state(perf, fluid_state);
            perf += 1;
        }
    }
    perfs.check_len(perf)
}
