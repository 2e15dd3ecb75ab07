//! Caller-owned reservoir state.

use nalgebra::DVector;

/// Pressures, compositions and fluxes passed in and out of the controller.
///
/// `solve` overwrites every pressure and flux. `cell_z` only changes in
/// `do_step_impes`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReservoirState {
    /// Phase pressures per cell.
    pub cell_pressure: Vec<DVector<f64>>,
    /// Phase pressures per face.
    pub face_pressure: Vec<DVector<f64>>,
    /// Component surface volumes per pore volume, per cell.
    pub cell_z: Vec<DVector<f64>>,
    /// Total flux per face, positive from slot 0 to slot 1.
    pub face_flux: Vec<f64>,
    pub well_perf_pressure: Vec<f64>,
    /// Total flux per perforation, positive for injection.
    pub well_perf_flux: Vec<f64>,
}

impl ReservoirState {
    pub fn num_cells(&self) -> usize {
        self.cell_pressure.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_pressure.len()
    }

    /// Total surface volume of each component, weighted by pore volume.
    pub fn component_totals(&self, pore_volume: &[f64]) -> DVector<f64> {
        let nc = self.cell_z.first().map_or(0, |z| z.len());
        self.cell_z
            .iter()
            .zip(pore_volume)
            .fold(DVector::zeros(nc), |acc, (z, pv)| acc + z * *pv)
    }
}
