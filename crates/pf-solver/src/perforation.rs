//! Flat per-perforation data, indexed by global perforation number.

use nalgebra::{DMatrix, DVector};
use pf_fluids::FluidState;
use pf_wells::Wells;

use crate::error::{SolverError, SolverResult};

/// Struct-of-arrays table of every well perforation.
///
/// Topology (`wells`, `cells`) is fixed at construction; pressures and fluid
/// data are refreshed every iteration.
#[derive(Clone, Debug, Default)]
pub struct PerforationTable {
    wells: Vec<usize>,
    cells: Vec<usize>,
    pressure: Vec<f64>,
    transform: Vec<DMatrix<f64>>,
    mobility: Vec<DVector<f64>>,
    saturation: Vec<DVector<f64>>,
    potential: Vec<DVector<f64>>,
}

impl PerforationTable {
    /// Walk the wells in order and record each perforation, with the initial
    /// pressure reported by the well set.
    pub fn from_wells(wells: &dyn Wells, num_phases: usize, num_components: usize) -> Self {
        let mut table = Self::default();
        for well in 0..wells.num_wells() {
            for perf in 0..wells.num_perforations(well) {
                let cell = wells.well_cell(well, perf);
                table.wells.push(well);
                table.cells.push(cell);
                table.pressure.push(wells.perforation_pressure(cell));
            }
        }
        let n = table.wells.len();
        table.transform = vec![DMatrix::zeros(num_components, num_phases); n];
        table.mobility = vec![DVector::zeros(num_phases); n];
        table.saturation = vec![DVector::zeros(num_phases); n];
        table.potential = vec![DVector::zeros(num_phases); n];
        table
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    pub fn well(&self, perf: usize) -> usize {
        self.wells[perf]
    }

    pub fn cell(&self, perf: usize) -> usize {
        self.cells[perf]
    }

    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    pub fn set_pressures(&mut self, pressures: &[f64]) -> SolverResult<()> {
        self.check_len(pressures.len())?;
        self.pressure.copy_from_slice(pressures);
        Ok(())
    }

    pub fn transform(&self) -> &[DMatrix<f64>] {
        &self.transform
    }

    pub fn mobility(&self) -> &[DVector<f64>] {
        &self.mobility
    }

    pub fn saturation(&self) -> &[DVector<f64>] {
        &self.saturation
    }

    pub fn potential(&self) -> &[DVector<f64>] {
        &self.potential
    }

    pub fn set_potential(&mut self, perf: usize, potential: DVector<f64>) {
        self.potential[perf] = potential;
    }

    /// Store the fluid evaluated for perforation `perf`.
    pub fn set_fluid_state(&mut self, perf: usize, state: FluidState) {
        self.transform[perf] = state.transform;
        self.mobility[perf] = state.mobility;
        self.saturation[perf] = state.saturation;
    }

    /// Error unless `count` equals the number of perforations.
    pub fn check_len(&self, count: usize) -> SolverResult<()> {
        if count == self.len() {
            Ok(())
        } else {
            Err(SolverError::Invariant {
                what: "perforation count mismatch",
            })
        }
    }
}
