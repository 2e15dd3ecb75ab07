//! Gravity potentials and pressures of well perforations.

use nalgebra::{DVector, Vector3};
use pf_fluids::FluidModel;
use pf_grid::Mesh;
use pf_wells::Wells;
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::perforation::PerforationTable;

/// Per-phase gravity potential `rho_alpha * g_z * (z_cell - z_ref)` of every
/// perforation, using the densities of the current perforation transforms.
///
/// Wells require gravity along z.
pub fn compute_well_potentials(
    mesh: &dyn Mesh,
    wells: &dyn Wells,
    fluid: &dyn FluidModel,
    gravity: Vector3<f64>,
    perfs: &mut PerforationTable,
) -> SolverResult<()> {
    if perfs.is_empty() {
        return Ok(());
    }
    if gravity.x != 0.0 || gravity.y != 0.0 {
        return Err(SolverError::Invariant {
            what: "wells require gravity along the z axis",
        });
    }
    for perf in 0..perfs.len() {
        let depth_delta = mesh.cell_centroid(perfs.cell(perf)).z - wells.reference_depth(perfs.well(perf));
        let gh = gravity.z * depth_delta;
        let rho = fluid.phase_densities(&perfs.transform()[perf]);
        perfs.set_potential(perf, rho * gh);
    }
    Ok(())
}

/// Perforation pressures `bhp + sum_alpha s_alpha * gpot_alpha`, where `s` is
/// the flux-weighted mean saturation of the well's perforations.
///
/// A well without net flux uses the plain mean of its perforation
/// saturations.
pub fn compute_well_perf_pressures(
    num_wells: usize,
    perf_flux: &[f64],
    well_bhp: &[f64],
    perfs: &PerforationTable,
) -> SolverResult<Vec<f64>> {
    perfs.check_len(perf_flux.len())?;
    if well_bhp.len() != num_wells {
        return Err(SolverError::Invariant {
            what: "well count mismatch",
        });
    }
    let np = perfs.saturation().first().map_or(0, |s| s.len());

    let mut total_flux = vec![0.0; num_wells];
    let mut weighted = vec![DVector::zeros(np); num_wells];
    let mut plain = vec![DVector::zeros(np); num_wells];
    let mut count = vec![0usize; num_wells];
    for perf in 0..perfs.len() {
        let w = perfs.well(perf);
        let sat = &perfs.saturation()[perf];
        total_flux[w] += perf_flux[perf];
        weighted[w] += sat * perf_flux[perf];
        plain[w] += sat;
        count[w] += 1;
    }

    let well_sat: Vec<DVector<f64>> = (0..num_wells)
        .map(|w| {
            let q = total_flux[w];
            if q != 0.0 && q.is_finite() {
                &weighted[w] / q
            } else {
                if count[w] > 0 {
                    debug!(well = w, "no net well flux, using mean perforation saturation");
                }
                &plain[w] / (count[w].max(1) as f64)
            }
        })
        .collect();

    Ok((0..perfs.len())
        .map(|perf| {
            let w = perfs.well(perf);
            well_bhp[w] + well_sat[w].dot(&perfs.potential()[perf])
        })
        .collect())
}
