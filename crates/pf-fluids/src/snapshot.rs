//! Bulk fluid evaluation over every cell and face of a mesh.

use crate::error::{FluidError, FluidResult};
use crate::model::FluidModel;
use nalgebra::{DMatrix, DVector, Vector3};
use pf_core::ensure_len;
use pf_grid::{Mesh, Rock};

/// Borrowed inputs for [`FluidSnapshot::compute`].
pub struct SnapshotInput<'a> {
    pub mesh: &'a dyn Mesh,
    pub rock: &'a dyn Rock,
    pub fluid: &'a dyn FluidModel,
    pub gravity: Vector3<f64>,
    /// Phase pressures per cell.
    pub cell_pressure: &'a [DVector<f64>],
    /// Phase pressures per face.
    pub face_pressure: &'a [DVector<f64>],
    /// Component surface volumes per pore volume, per cell.
    pub cell_z: &'a [DVector<f64>],
    /// Composition entering through boundary faces with inflow.
    pub inflow_mixture: &'a DVector<f64>,
    pub dt: f64,
}

/// Per-cell and per-face fluid properties for one pressure iteration.
///
/// Buffers are cleared and refilled by [`FluidSnapshot::compute`] so their
/// capacity is reused between iterations.
#[derive(Clone, Debug, Default)]
pub struct FluidSnapshot {
    pub total_compressibility: Vec<f64>,
    /// `(u - 1) * pv / dt`, the rate of volume mismatch per cell.
    pub volume_discrepancy: Vec<f64>,
    /// `|u - 1|`.
    pub relative_volume_discrepancy: Vec<f64>,
    pub total_phase_volume_density: Vec<f64>,
    pub jacobian_term: Vec<f64>,
    pub cell_transform: Vec<DMatrix<f64>>,
    pub cell_saturation: Vec<DVector<f64>>,
    pub face_transform: Vec<DMatrix<f64>>,
    pub face_mobility: Vec<DVector<f64>>,
    pub face_mobility_deriv: Vec<DVector<f64>>,
    /// Per-phase gravity term `rho_alpha * g . (x1 - x0)` on each face.
    pub grav_cap_face: Vec<DVector<f64>>,
}

impl FluidSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_cells(&self) -> usize {
        self.total_phase_volume_density.len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_transform.len()
    }

    /// Largest relative volume discrepancy over all cells.
    pub fn max_relative_discrepancy(&self) -> f64 {
        self.relative_volume_discrepancy
            .iter()
            .fold(0.0, |acc: f64, &v| acc.max(v))
    }

    /// Re-evaluate the fluid everywhere.
    ///
    /// Interior faces take the composition of the upwind cell by the
    /// gravity-corrected scalar potential difference. Boundary faces take the
    /// inflow mixture when fluid enters the domain through them.
    pub fn compute(&mut self, input: &SnapshotInput<'_>) -> FluidResult<()> {
        let SnapshotInput {
            mesh,
            rock,
            fluid,
            gravity,
            cell_pressure,
            face_pressure,
            cell_z,
            inflow_mixture,
            dt,
        } = *input;

        if !(dt.is_finite() && dt > 0.0) {
            return Err(FluidError::InvalidArg {
                what: "time step must be positive",
            });
        }
        let nc = mesh.num_cells();
        let nf = mesh.num_faces();
        ensure_len(cell_pressure.len(), nc, "cell pressure")?;
        ensure_len(cell_z.len(), nc, "cell composition")?;
        ensure_len(face_pressure.len(), nf, "face pressure")?;
        ensure_len(inflow_mixture.len(), fluid.num_components(), "inflow mixture")?;

        let pp = fluid.pressure_phase();

        self.total_compressibility.clear();
        self.volume_discrepancy.clear();
        self.relative_volume_discrepancy.clear();
        self.total_phase_volume_density.clear();
        self.jacobian_term.clear();
        self.cell_transform.clear();
        self.cell_saturation.clear();

        let mut mixture_density = Vec::with_capacity(nc);
        for cell in 0..nc {
            let state = fluid.compute_state(&cell_pressure[cell], &cell_z[cell])?;
            let pv = rock.porosity(cell) * mesh.cell_volume(cell);
            let u = state.total_phase_volume_density;

            let rho = fluid.phase_densities(&state.transform);
            mixture_density.push(state.saturation.dot(&rho));

            self.total_compressibility.push(state.total_compressibility);
            self.volume_discrepancy.push((u - 1.0) * pv / dt);
            self.relative_volume_discrepancy.push((u - 1.0).abs());
            self.total_phase_volume_density.push(u);
            self.jacobian_term.push(state.jacobian_term);
            self.cell_transform.push(state.transform);
            self.cell_saturation.push(state.saturation);
        }

        self.face_transform.clear();
        self.face_mobility.clear();
        self.face_mobility_deriv.clear();
        self.grav_cap_face.clear();

        for face in 0..nf {
            let composition = match mesh.face_cells(face) {
                [Some(a), Some(b)] => {
                    let xa = mesh.cell_centroid(a);
                    let xb = mesh.cell_centroid(b);
                    let rho_avg = 0.5 * (mixture_density[a] + mixture_density[b]);
                    let dphi = (cell_pressure[a][pp] - cell_pressure[b][pp])
                        + rho_avg * gravity.dot(&(xb - xa));
                    if dphi >= 0.0 { &cell_z[a] } else { &cell_z[b] }
                }
                [Some(c), None] | [None, Some(c)] => {
                    let xc = mesh.cell_centroid(c);
                    let xf = mesh.face_centroid(face);
                    let phi_out = (cell_pressure[c][pp] - face_pressure[face][pp])
                        + mixture_density[c] * gravity.dot(&(xf - xc));
                    if phi_out < 0.0 {
                        inflow_mixture
                    } else {
                        &cell_z[c]
                    }
                }
                [None, None] => {
                    return Err(FluidError::InvalidArg {
                        what: "face without neighbouring cells",
                    });
                }
            };

            let state = fluid.compute_state(&face_pressure[face], composition)?;
            let rho = fluid.phase_densities(&state.transform);
            let [x0, x1] = mesh.face_side_positions(face);
            let gdx = gravity.dot(&(x1 - x0));

            self.grav_cap_face.push(rho * gdx);
            self.face_transform.push(state.transform);
            self.face_mobility.push(state.mobility);
            self.face_mobility_deriv.push(state.mobility_deriv);
        }

        Ok(())
    }
}
