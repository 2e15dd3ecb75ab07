//! Fluid state at a single cell, face or perforation.

use nalgebra::{DMatrix, DVector};

/// Result of evaluating a fluid model at given phase pressures and composition.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidState {
    /// Phase saturations (fractions of the total phase volume).
    pub saturation: DVector<f64>,
    /// Phase mobilities `kr / mu` [1/(Pa s)].
    pub mobility: DVector<f64>,
    /// Derivative of each phase mobility with respect to its own saturation.
    pub mobility_deriv: DVector<f64>,
    /// Phase-to-component transform, `num_components x num_phases`.
    /// Column `alpha` holds the surface volume of each component per
    /// reservoir volume of phase `alpha`.
    pub transform: DMatrix<f64>,
    /// Total reservoir phase volume per pore volume.
    pub total_phase_volume_density: f64,
    /// Linearised total compressibility, `-du/dp` at fixed composition.
    pub total_compressibility: f64,
    /// Exact pressure derivative of `1 - u` used by the residual formulation.
    pub jacobian_term: f64,
}

impl FluidState {
    pub fn num_phases(&self) -> usize {
        self.saturation.len()
    }

    /// Total mobility summed over phases.
    pub fn total_mobility(&self) -> f64 {
        self.mobility.sum()
    }
}
