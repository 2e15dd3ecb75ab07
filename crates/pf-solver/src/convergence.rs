//! Convergence and volume-discrepancy criteria.

use pf_core::{extreme_magnitude, inf_norm_diff, relative_ratio};
use pf_fluids::FluidSnapshot;

/// Relative change of fluxes and pressures between two iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RelativeChanges {
    pub flux: f64,
    pub pressure: f64,
}

/// Infinity-norm changes scaled by the largest current magnitude.
///
/// The flux change covers both faces and perforations. With no flux anywhere
/// the flux ratio is infinite, so only the pressure criterion can stop the
/// iteration. A zero pressure change over a zero pressure scale is zero.
pub fn compute_flux_press_changes(
    face_flux: &[f64],
    perf_flux: &[f64],
    cell_press: &[f64],
    prev_face_flux: &[f64],
    prev_perf_flux: &[f64],
    prev_cell_press: &[f64],
) -> RelativeChanges {
    let max_flux = extreme_magnitude(face_flux).max(extreme_magnitude(perf_flux));
    let max_press = extreme_magnitude(cell_press);
    let flux_change =
        inf_norm_diff(face_flux, prev_face_flux).max(inf_norm_diff(perf_flux, prev_perf_flux));
    let press_change = inf_norm_diff(cell_press, prev_cell_press);
    RelativeChanges {
        flux: if max_flux == 0.0 {
            f64::INFINITY
        } else {
            flux_change / max_flux
        },
        pressure: relative_ratio(press_change, max_press),
    }
}

/// Either criterion is enough to stop iterating.
pub fn is_converged(changes: &RelativeChanges, flux_rel_tol: f64, press_rel_tol: f64) -> bool {
    changes.flux < flux_rel_tol || changes.pressure < press_rel_tol
}

pub fn max_relative_discrepancy(snapshot: &FluidSnapshot) -> f64 {
    snapshot.max_relative_discrepancy()
}
