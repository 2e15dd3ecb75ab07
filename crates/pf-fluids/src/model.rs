//! Fluid property model trait and validation helpers.

use crate::error::FluidResult;
use crate::state::FluidState;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Fluid phase. Phases are ordered as listed by the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Aqua,
    Liquid,
    Vapour,
}

/// Chemical component tracked in surface volumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Water,
    Oil,
    Gas,
}

/// Fluid model used by the pressure solver.
///
/// Implementations must be deterministic functions of their inputs; the
/// solver re-evaluates every cell, face and perforation each iteration.
pub trait FluidModel {
    fn num_phases(&self) -> usize;

    fn num_components(&self) -> usize;

    /// Component kinds in the order used by composition vectors.
    fn component_kinds(&self) -> &[ComponentKind];

    /// Phase whose pressure is used as the scalar pressure unknown.
    fn pressure_phase(&self) -> usize {
        0
    }

    /// Component densities at surface conditions [kg/m^3].
    fn surface_densities(&self) -> &DVector<f64>;

    /// Evaluate the fluid at the given phase pressures and component
    /// surface volumes per pore volume.
    fn compute_state(
        &self,
        pressure: &DVector<f64>,
        composition: &DVector<f64>,
    ) -> FluidResult<FluidState>;

    /// Reservoir phase densities implied by a transform matrix,
    /// `rho_alpha = sum_c A[c, alpha] * rho_surface[c]`.
    fn phase_densities(&self, transform: &DMatrix<f64>) -> DVector<f64> {
        transform.tr_mul(self.surface_densities())
    }
}

/// Validation helpers for fluid inputs.
pub mod validation {
    use crate::error::{FluidError, FluidResult};
    use nalgebra::DVector;

    /// Ensure every phase pressure is finite.
    pub fn validate_pressures(p: &DVector<f64>) -> FluidResult<()> {
        if p.iter().any(|v| !v.is_finite()) {
            return Err(FluidError::NonPhysical {
                what: "pressure must be finite",
            });
        }
        Ok(())
    }

    /// Ensure every composition entry is finite.
    pub fn validate_composition(z: &DVector<f64>) -> FluidResult<()> {
        if z.iter().any(|v| !v.is_finite()) {
            return Err(FluidError::NonPhysical {
                what: "composition must be finite",
            });
        }
        Ok(())
    }

    /// Ensure a model parameter is positive and finite.
    pub fn validate_positive(v: f64, what: &'static str) -> FluidResult<()> {
        if !v.is_finite() || v <= 0.0 {
            return Err(FluidError::InvalidArg { what });
        }
        Ok(())
    }
}
