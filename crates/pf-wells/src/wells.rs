//! Well contract consumed by the pressure solver.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellType {
    Injector,
    Producer,
}

/// Well operating constraint.
///
/// Rates are total reservoir volume rates [m^3/s], positive into the
/// reservoir, so producers carry negative rate targets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum WellControl {
    /// Bottom-hole pressure [Pa].
    Bhp(f64),
    Rate(f64),
}

impl WellControl {
    pub fn target(&self) -> f64 {
        match *self {
            WellControl::Bhp(v) | WellControl::Rate(v) => v,
        }
    }
}

/// Wells and their perforations.
///
/// Perforations are numbered globally by walking the wells in order and
/// each well's perforations in order.
pub trait Wells {
    fn num_wells(&self) -> usize;

    fn num_perforations(&self, well: usize) -> usize;

    /// Cell perforated by perforation `perf` of `well`.
    fn well_cell(&self, well: usize, perf: usize) -> usize;

    fn well_type(&self, well: usize) -> WellType;

    fn control(&self, well: usize) -> WellControl;

    /// Connection factor between the wellbore and the cell [m^3].
    fn well_index(&self, well: usize, perf: usize) -> f64;

    /// Depth at which the bottom-hole pressure is measured.
    fn reference_depth(&self, well: usize) -> f64;

    /// Composition injected into `cell`, if an injector perforates it.
    fn injection_mixture(&self, cell: usize) -> Option<&DVector<f64>>;

    /// Initial pressure guess for a perforation in `cell`.
    fn perforation_pressure(&self, cell: usize) -> f64;

    fn total_perforations(&self) -> usize {
        (0..self.num_wells())
            .map(|w| self.num_perforations(w))
            .sum()
    }
}
