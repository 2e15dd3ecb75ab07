//! Immiscible compressible fluid: one component per phase.

use crate::error::{FluidError, FluidResult};
use crate::model::validation::{validate_composition, validate_positive, validate_pressures};
use crate::model::{ComponentKind, FluidModel, PhaseKind};
use crate::state::FluidState;
use nalgebra::{DMatrix, DVector};
use pf_core::{ensure_finite, ensure_len};
use serde::{Deserialize, Serialize};

fn default_b_ref() -> f64 {
    1.0
}

fn default_corey() -> f64 {
    2.0
}

fn default_p_ref() -> f64 {
    1.0e5
}

/// Parameters of a single phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseProps {
    pub kind: PhaseKind,
    /// Density at surface conditions [kg/m^3].
    pub surface_density: f64,
    /// Dynamic viscosity [Pa s].
    pub viscosity: f64,
    /// Inverse formation volume factor at `p_ref`.
    #[serde(default = "default_b_ref")]
    pub b_ref: f64,
    /// Compressibility of the inverse formation volume factor [1/Pa].
    #[serde(default)]
    pub compressibility: f64,
    #[serde(default = "default_p_ref")]
    pub p_ref: f64,
    /// Corey exponent for the relative permeability `kr = s^n`.
    #[serde(default = "default_corey")]
    pub corey_exponent: f64,
}

impl PhaseProps {
    /// Incompressible phase with default reference values.
    pub fn incompressible(kind: PhaseKind, surface_density: f64, viscosity: f64) -> Self {
        Self {
            kind,
            surface_density,
            viscosity,
            b_ref: default_b_ref(),
            compressibility: 0.0,
            p_ref: default_p_ref(),
            corey_exponent: default_corey(),
        }
    }

    pub fn with_compressibility(mut self, compressibility: f64, p_ref: f64) -> Self {
        self.compressibility = compressibility;
        self.p_ref = p_ref;
        self
    }

    pub fn with_corey_exponent(mut self, n: f64) -> Self {
        self.corey_exponent = n;
        self
    }

    fn component(&self) -> ComponentKind {
        match self.kind {
            PhaseKind::Aqua => ComponentKind::Water,
            PhaseKind::Liquid => ComponentKind::Oil,
            PhaseKind::Vapour => ComponentKind::Gas,
        }
    }

    /// Inverse formation volume factor `b(p) = b_ref * exp(c (p - p_ref))`.
    fn b(&self, p: f64) -> f64 {
        self.b_ref * (self.compressibility * (p - self.p_ref)).exp()
    }
}

/// Fluid where water, oil and gas each live only in their own phase.
///
/// Component `c` and phase `c` share an index, so the transform matrix is
/// diagonal with the inverse formation volume factors on the diagonal.
#[derive(Clone, Debug)]
pub struct ImmiscibleFluid {
    phases: Vec<PhaseProps>,
    components: Vec<ComponentKind>,
    surface_densities: DVector<f64>,
    pressure_phase: usize,
}

impl ImmiscibleFluid {
    /// Create a fluid from one to three distinct phases.
    pub fn new(phases: Vec<PhaseProps>) -> FluidResult<Self> {
        if phases.is_empty() || phases.len() > 3 {
            return Err(FluidError::NotSupported {
                what: "immiscible fluid needs one to three phases",
            });
        }
        for (i, phase) in phases.iter().enumerate() {
            if phases[..i].iter().any(|p| p.kind == phase.kind) {
                return Err(FluidError::InvalidArg {
                    what: "duplicate phase kind",
                });
            }
            validate_positive(phase.surface_density, "surface density")?;
            validate_positive(phase.viscosity, "viscosity")?;
            validate_positive(phase.b_ref, "reference inverse formation volume factor")?;
            if !phase.compressibility.is_finite() || phase.compressibility < 0.0 {
                return Err(FluidError::InvalidArg {
                    what: "compressibility must be non-negative",
                });
            }
            ensure_finite(phase.p_ref, "reference pressure")?;
            if !(phase.corey_exponent >= 1.0) {
                return Err(FluidError::InvalidArg {
                    what: "corey exponent must be >= 1",
                });
            }
        }

        let components = phases.iter().map(PhaseProps::component).collect();
        let surface_densities =
            DVector::from_iterator(phases.len(), phases.iter().map(|p| p.surface_density));
        let pressure_phase = phases
            .iter()
            .position(|p| p.kind == PhaseKind::Liquid)
            .unwrap_or(0);

        Ok(Self {
            phases,
            components,
            surface_densities,
            pressure_phase,
        })
    }

    pub fn phases(&self) -> &[PhaseProps] {
        &self.phases
    }
}

impl FluidModel for ImmiscibleFluid {
    fn num_phases(&self) -> usize {
        self.phases.len()
    }

    fn num_components(&self) -> usize {
        self.phases.len()
    }

    fn component_kinds(&self) -> &[ComponentKind] {
        &self.components
    }

    fn pressure_phase(&self) -> usize {
        self.pressure_phase
    }

    fn surface_densities(&self) -> &DVector<f64> {
        &self.surface_densities
    }

    fn compute_state(
        &self,
        pressure: &DVector<f64>,
        composition: &DVector<f64>,
    ) -> FluidResult<FluidState> {
        let np = self.phases.len();
        ensure_len(pressure.len(), np, "phase pressure")?;
        ensure_len(composition.len(), np, "composition")?;
        validate_pressures(pressure)?;
        validate_composition(composition)?;

        let b = DVector::from_iterator(
            np,
            self.phases.iter().enumerate().map(|(i, ph)| ph.b(pressure[i])),
        );
        // Reservoir volume of each phase per pore volume. Small negative
        // compositions left by explicit transport are treated as empty.
        let volume = DVector::from_iterator(np, (0..np).map(|i| composition[i].max(0.0) / b[i]));
        let total = volume.sum();

        let saturation = if total > 0.0 {
            &volume / total
        } else {
            DVector::zeros(np)
        };

        let mut mobility = DVector::zeros(np);
        let mut mobility_deriv = DVector::zeros(np);
        for (i, ph) in self.phases.iter().enumerate() {
            let s = saturation[i];
            let n = ph.corey_exponent;
            mobility[i] = s.powf(n) / ph.viscosity;
            mobility_deriv[i] = n * s.powf(n - 1.0) / ph.viscosity;
        }

        let compressibility: f64 = self
            .phases
            .iter()
            .zip(volume.iter())
            .map(|(ph, v)| ph.compressibility * v)
            .sum();

        Ok(FluidState {
            saturation,
            mobility,
            mobility_deriv,
            transform: DMatrix::from_diagonal(&b),
            total_phase_volume_density: total,
            total_compressibility: compressibility,
            jacobian_term: compressibility,
        })
    }
}
