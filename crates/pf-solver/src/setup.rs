//! Translation of boundary conditions into per-face assembler input.

use pf_grid::{BoundaryConditions, FlowBc, Mesh};
use pf_pressure::FaceBc;

use crate::error::{SolverError, SolverResult};

/// One [`FaceBc`] per face. Interior faces stay `Unset`.
///
/// Only Dirichlet and zero-flux Neumann conditions are supported.
pub fn build_face_bc(mesh: &dyn Mesh, bc: &dyn BoundaryConditions) -> SolverResult<Vec<FaceBc>> {
    (0..mesh.num_faces())
        .map(|face| {
            let bid = mesh.boundary_id(face);
            if bid == 0 {
                return Ok(FaceBc::Unset);
            }
            match bc.flow_cond(bid) {
                FlowBc::Dirichlet { pressure } => Ok(FaceBc::Pressure(pressure)),
                FlowBc::Neumann { outflux } if outflux == 0.0 => Ok(FaceBc::Flux(0.0)),
                FlowBc::Neumann { outflux } => Err(SolverError::config(format!(
                    "nonzero Neumann condition ({outflux}) on boundary {bid} is not supported"
                ))),
                FlowBc::Periodic => Err(SolverError::config(format!(
                    "unhandled boundary condition type on boundary {bid}"
                ))),
            }
        })
        .collect()
}
