//! Two-point flux approximation pressure assembler.

use nalgebra::{DMatrix, DVector};
use pf_core::ensure_len;
use pf_grid::{Mesh, Rock};
use pf_wells::{WellControl, Wells};

use crate::assembler::{AssembleInput, FaceBc, PressureAssembler, PressureFluxOutput};
use crate::csr::{CsrMatrix, LinearSystem};
use crate::error::{PressureError, PressureResult};

fn copy_into<T: Clone>(dst: &mut Vec<T>, src: &[T]) {
    dst.clear();
    dst.extend_from_slice(src);
}

/// TPFA discretisation of the volume-balance pressure equation.
///
/// Cell row `i`:
///
/// ```text
/// pv c_t / dt (p - p0) + sum(outflux) - sum(q_perf) = src + voldiscr
/// ```
///
/// with face flux `T sum_a lambda_a (p0 - p1 + G_a)` and perforation flux
/// `WI sum_a lambda_a (bhp + gpot_a - p_cell)`. Each well adds one row, either
/// `bhp = target` or `sum(q_perf) = target`.
#[derive(Clone, Debug, Default)]
pub struct TpfaAssembler {
    initialized: bool,
    num_cells: usize,
    pore_volume: Vec<f64>,
    face_cells: Vec<[Option<usize>; 2]>,
    half_trans: Vec<[f64; 2]>,
    trans: Vec<f64>,
    perf_cell: Vec<usize>,
    perf_well: Vec<usize>,
    perf_wi: Vec<f64>,
    well_control: Vec<WellControl>,
    system: LinearSystem,

    // Inputs of the latest assemble.
    bc: Vec<FaceBc>,
    face_mobility: Vec<DVector<f64>>,
    grav_cap_face: Vec<DVector<f64>>,
    face_transform: Vec<DMatrix<f64>>,
    perf_mobility: Vec<DVector<f64>>,
    perf_potential: Vec<DVector<f64>>,
    perf_transform: Vec<DMatrix<f64>>,

    // Phase fluxes of the latest compute_pressures_and_fluxes.
    face_phase_flux: Vec<DVector<f64>>,
    perf_phase_flux: Vec<DVector<f64>>,
}

impl TpfaAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pore_volumes(&self) -> &[f64] {
        &self.pore_volume
    }

    fn num_faces(&self) -> usize {
        self.face_cells.len()
    }

    fn num_wells(&self) -> usize {
        self.well_control.len()
    }

    fn num_perfs(&self) -> usize {
        self.perf_cell.len()
    }

    fn ensure_init(&self) -> PressureResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(PressureError::NotInitialized)
        }
    }

    fn check_input(&self, input: &AssembleInput<'_>) -> PressureResult<()> {
        let (nc, nf, np) = (self.num_cells, self.num_faces(), self.num_perfs());
        if !(input.dt.is_finite() && input.dt > 0.0) {
            return Err(PressureError::InvalidInput {
                what: "time step must be positive",
            });
        }
        ensure_len(input.sources.len(), nc, "sources")?;
        ensure_len(input.total_compressibility.len(), nc, "total compressibility")?;
        ensure_len(input.volume_discrepancy.len(), nc, "volume discrepancy")?;
        ensure_len(input.initial_cell_pressure.len(), nc, "initial cell pressure")?;
        ensure_len(input.bc.len(), nf, "face boundary conditions")?;
        ensure_len(input.face_mobility.len(), nf, "face mobility")?;
        ensure_len(input.face_transform.len(), nf, "face transform")?;
        ensure_len(input.grav_cap_face.len(), nf, "face gravity term")?;
        ensure_len(input.perf_mobility.len(), np, "perforation mobility")?;
        ensure_len(input.perf_transform.len(), np, "perforation transform")?;
        ensure_len(input.perf_potential.len(), np, "perforation potential")?;
        Ok(())
    }

    /// Pressure on each side of a face, `None` for a missing side without a
    /// prescribed pressure.
    fn side_pressures(&self, face: usize, x: &[f64]) -> [Option<f64>; 2] {
        let cells = self.face_cells[face];
        let bc_p = match self.bc[face] {
            FaceBc::Pressure(p) => Some(p),
            _ => None,
        };
        [
            cells[0].map(|c| x[c]).or(bc_p),
            cells[1].map(|c| x[c]).or(bc_p),
        ]
    }
}

/// `A (n . K d) / |d|^2` for the half face between a cell and a face.
fn half_transmissibility(mesh: &dyn Mesh, rock: &dyn Rock, cell: usize, face: usize) -> PressureResult<f64> {
    let d = mesh.face_centroid(face) - mesh.cell_centroid(cell);
    let d2 = d.norm_squared();
    if !(d2 > 0.0) {
        return Err(PressureError::InvalidInput {
            what: "face centroid coincides with cell centroid",
        });
    }
    let kd = rock.permeability(cell) * d;
    Ok(mesh.face_area(face) * mesh.face_normal(face).dot(&kd).abs() / d2)
}

impl PressureAssembler for TpfaAssembler {
    fn init(&mut self, mesh: &dyn Mesh, wells: &dyn Wells, rock: &dyn Rock) -> PressureResult<()> {
        let nc = mesh.num_cells();
        let nf = mesh.num_faces();
        let nw = wells.num_wells();

        self.num_cells = nc;
        self.pore_volume = (0..nc)
            .map(|c| rock.porosity(c) * mesh.cell_volume(c))
            .collect();

        self.face_cells.clear();
        self.half_trans.clear();
        self.trans.clear();
        for face in 0..nf {
            let cells = mesh.face_cells(face);
            let mut ht = [0.0; 2];
            for (slot, cell) in cells.iter().enumerate() {
                if let Some(c) = *cell {
                    ht[slot] = half_transmissibility(mesh, rock, c, face)?;
                }
            }
            let t = match cells {
                [Some(_), Some(_)] if ht[0] + ht[1] > 0.0 => ht[0] * ht[1] / (ht[0] + ht[1]),
                [Some(_), Some(_)] => 0.0,
                _ => ht[0] + ht[1],
            };
            self.face_cells.push(cells);
            self.half_trans.push(ht);
            self.trans.push(t);
        }

        self.perf_cell.clear();
        self.perf_well.clear();
        self.perf_wi.clear();
        self.well_control = (0..nw).map(|w| wells.control(w)).collect();
        for w in 0..nw {
            for k in 0..wells.num_perforations(w) {
                let cell = wells.well_cell(w, k);
                if cell >= nc {
                    return Err(PressureError::InvalidInput {
                        what: "perforation cell out of range",
                    });
                }
                self.perf_cell.push(cell);
                self.perf_well.push(w);
                self.perf_wi.push(wells.well_index(w, k));
            }
        }

        let n = nc + nw;
        let mut rows: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        for cells in &self.face_cells {
            if let [Some(a), Some(b)] = *cells {
                rows[a].push(b);
                rows[b].push(a);
            }
        }
        for (&c, &w) in self.perf_cell.iter().zip(&self.perf_well) {
            rows[c].push(nc + w);
            rows[nc + w].push(c);
        }
        self.system = LinearSystem::with_pattern(CsrMatrix::from_pattern(n, &rows));

        self.face_phase_flux.clear();
        self.perf_phase_flux.clear();
        self.initialized = true;
        Ok(())
    }

    fn assemble(&mut self, input: &AssembleInput<'_>) -> PressureResult<()> {
        self.ensure_init()?;
        self.check_input(input)?;
        let nc = self.num_cells;
        let dt = input.dt;

        copy_into(&mut self.bc, input.bc);
        copy_into(&mut self.face_mobility, input.face_mobility);
        copy_into(&mut self.grav_cap_face, input.grav_cap_face);
        copy_into(&mut self.face_transform, input.face_transform);
        copy_into(&mut self.perf_mobility, input.perf_mobility);
        copy_into(&mut self.perf_potential, input.perf_potential);
        copy_into(&mut self.perf_transform, input.perf_transform);

        let sys = &mut self.system;
        sys.reset();

        for c in 0..nc {
            let acc = self.pore_volume[c] * input.total_compressibility[c] / dt;
            sys.matrix.add(c, c, acc)?;
            sys.rhs[c] += acc * input.initial_cell_pressure[c]
                + input.sources[c]
                + input.volume_discrepancy[c];
        }

        for face in 0..self.face_cells.len() {
            let mob = &input.face_mobility[face];
            let tl = self.trans[face] * mob.sum();
            let tg = self.trans[face] * mob.dot(&input.grav_cap_face[face]);
            match self.face_cells[face] {
                [Some(a), Some(b)] => {
                    sys.matrix.add(a, a, tl)?;
                    sys.matrix.add(a, b, -tl)?;
                    sys.matrix.add(b, b, tl)?;
                    sys.matrix.add(b, a, -tl)?;
                    sys.rhs[a] -= tg;
                    sys.rhs[b] += tg;
                }
                [Some(c), None] | [None, Some(c)] => {
                    let sign = if self.face_cells[face][0].is_some() { 1.0 } else { -1.0 };
                    match input.bc[face] {
                        FaceBc::Pressure(pb) => {
                            sys.matrix.add(c, c, tl)?;
                            sys.rhs[c] += tl * pb - sign * tg;
                        }
                        FaceBc::Flux(v) => sys.rhs[c] -= v,
                        FaceBc::Unset => {}
                    }
                }
                [None, None] => {}
            }
        }

        for k in 0..self.perf_cell.len() {
            let (c, w) = (self.perf_cell[k], self.perf_well[k]);
            let mob = &input.perf_mobility[k];
            let wl = self.perf_wi[k] * mob.sum();
            let wg = self.perf_wi[k] * mob.dot(&input.perf_potential[k]);
            sys.matrix.add(c, c, wl)?;
            sys.matrix.add(c, nc + w, -wl)?;
            sys.rhs[c] += wg;
            if let WellControl::Rate(_) = self.well_control[w] {
                sys.matrix.add(nc + w, nc + w, wl)?;
                sys.matrix.add(nc + w, c, -wl)?;
                sys.rhs[nc + w] -= wg;
            }
        }

        for (w, control) in self.well_control.iter().enumerate() {
            match *control {
                WellControl::Bhp(p) => {
                    sys.matrix.add(nc + w, nc + w, 1.0)?;
                    sys.rhs[nc + w] = p;
                }
                WellControl::Rate(q) => sys.rhs[nc + w] += q,
            }
        }

        Ok(())
    }

    fn linear_system(&self) -> &LinearSystem {
        &self.system
    }

    fn linear_system_mut(&mut self) -> &mut LinearSystem {
        &mut self.system
    }

    fn compute_pressures_and_fluxes(&mut self, out: PressureFluxOutput<'_>) -> PressureResult<()> {
        self.ensure_init()?;
        let (nc, nf, nw, np) = (self.num_cells, self.num_faces(), self.num_wells(), self.num_perfs());
        ensure_len(out.cell_pressure.len(), nc, "cell pressure")?;
        ensure_len(out.face_pressure.len(), nf, "face pressure")?;
        ensure_len(out.face_flux.len(), nf, "face flux")?;
        ensure_len(out.well_bhp.len(), nw, "well bhp")?;
        ensure_len(out.perf_flux.len(), np, "perforation flux")?;
        if self.face_mobility.len() != nf || self.perf_mobility.len() != np {
            return Err(PressureError::InvalidInput {
                what: "pressures requested before assemble",
            });
        }

        let x = &self.system.x;
        out.cell_pressure.copy_from_slice(&x[..nc]);
        out.well_bhp.copy_from_slice(&x[nc..nc + nw]);

        self.face_phase_flux.clear();
        for face in 0..nf {
            let mob = &self.face_mobility[face];
            let grav = &self.grav_cap_face[face];
            let t = self.trans[face];
            let cells = self.face_cells[face];
            let phase_flux = match self.side_pressures(face, x) {
                [Some(p0), Some(p1)] => DVector::from_iterator(
                    mob.len(),
                    mob.iter().zip(grav.iter()).map(|(l, g)| t * l * (p0 - p1 + g)),
                ),
                [Some(_), None] | [None, Some(_)] => match self.bc[face] {
                    FaceBc::Flux(v) => {
                        let sign = if cells[0].is_some() { 1.0 } else { -1.0 };
                        let lt = mob.sum();
                        if lt > 0.0 {
                            mob * (sign * v / lt)
                        } else {
                            DVector::zeros(mob.len())
                        }
                    }
                    _ => DVector::zeros(mob.len()),
                },
                [None, None] => DVector::zeros(mob.len()),
            };
            let flux = phase_flux.sum();

            out.face_pressure[face] = match cells {
                [Some(a), Some(b)] => {
                    let [ha, hb] = self.half_trans[face];
                    if ha + hb > 0.0 {
                        (ha * x[a] + hb * x[b]) / (ha + hb)
                    } else {
                        0.5 * (x[a] + x[b])
                    }
                }
                [Some(c), None] | [None, Some(c)] => match self.bc[face] {
                    FaceBc::Pressure(pb) => pb,
                    FaceBc::Flux(v) => {
                        let tl = t * mob.sum();
                        if tl > 0.0 { x[c] - v / tl } else { x[c] }
                    }
                    FaceBc::Unset => x[c],
                },
                [None, None] => 0.0,
            };
            out.face_flux[face] = flux;
            self.face_phase_flux.push(phase_flux);
        }

        self.perf_phase_flux.clear();
        for k in 0..np {
            let (c, w) = (self.perf_cell[k], self.perf_well[k]);
            let dp = x[nc + w] - x[c];
            let wi = self.perf_wi[k];
            let phase_flux = DVector::from_iterator(
                self.perf_mobility[k].len(),
                self.perf_mobility[k]
                    .iter()
                    .zip(self.perf_potential[k].iter())
                    .map(|(l, g)| wi * l * (dp + g)),
            );
            out.perf_flux[k] = phase_flux.sum();
            self.perf_phase_flux.push(phase_flux);
        }

        Ok(())
    }

    fn explicit_timestep_limit(
        &self,
        face_mobility: &[DVector<f64>],
        face_mobility_deriv: &[DVector<f64>],
    ) -> PressureResult<f64> {
        self.ensure_init()?;
        let nf = self.num_faces();
        ensure_len(face_mobility.len(), nf, "face mobility")?;
        ensure_len(face_mobility_deriv.len(), nf, "face mobility derivative")?;
        if self.face_phase_flux.len() != nf {
            return Err(PressureError::InvalidInput {
                what: "time step limit requested before fluxes were computed",
            });
        }

        let mut outflow = vec![0.0; self.num_cells];
        for face in 0..nf {
            let lt = face_mobility[face].sum();
            let weight = if lt > 0.0 {
                face_mobility_deriv[face]
                    .iter()
                    .fold(1.0_f64, |acc, d| acc.max(d / lt))
            } else {
                1.0
            };
            let [c0, c1] = self.face_cells[face];
            for &v in self.face_phase_flux[face].iter() {
                let (upstream, rate) = if v > 0.0 { (c0, v) } else { (c1, -v) };
                if let Some(c) = upstream {
                    outflow[c] += rate * weight;
                }
            }
        }
        for (k, flux) in self.perf_phase_flux.iter().enumerate() {
            let c = self.perf_cell[k];
            outflow[c] -= flux.iter().filter(|&&v| v < 0.0).sum::<f64>();
        }

        Ok(outflow
            .iter()
            .zip(&self.pore_volume)
            .filter(|(out, _)| **out > 0.0)
            .map(|(out, pv)| pv / out)
            .fold(f64::INFINITY, f64::min))
    }

    fn explicit_transport(&self, dt: f64, cell_z: &mut [DVector<f64>]) -> PressureResult<()> {
        self.ensure_init()?;
        ensure_len(cell_z.len(), self.num_cells, "cell composition")?;
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(PressureError::InvalidInput {
                what: "transport step must be non-negative",
            });
        }
        if self.face_phase_flux.len() != self.num_faces()
            || self.perf_phase_flux.len() != self.num_perfs()
        {
            return Err(PressureError::InvalidInput {
                what: "transport requested before fluxes were computed",
            });
        }

        let mut change: Vec<DVector<f64>> = cell_z
            .iter()
            .map(|z| DVector::zeros(z.len()))
            .collect();

        for face in 0..self.num_faces() {
            let component_flux = &self.face_transform[face] * &self.face_phase_flux[face];
            let [c0, c1] = self.face_cells[face];
            if let Some(c) = c0 {
                ensure_len(component_flux.len(), change[c].len(), "face component flux")?;
                change[c] -= &component_flux;
            }
            if let Some(c) = c1 {
                ensure_len(component_flux.len(), change[c].len(), "face component flux")?;
                change[c] += &component_flux;
            }
        }
        for k in 0..self.num_perfs() {
            let c = self.perf_cell[k];
            let component_flux = &self.perf_transform[k] * &self.perf_phase_flux[k];
            ensure_len(component_flux.len(), change[c].len(), "perforation component flux")?;
            change[c] += &component_flux;
        }

        for ((z, dz), pv) in cell_z.iter_mut().zip(&change).zip(&self.pore_volume) {
            *z += dz * (dt / pv);
        }
        Ok(())
    }

    fn face_transmissibilities(&self) -> &[f64] {
        &self.trans
    }
}
