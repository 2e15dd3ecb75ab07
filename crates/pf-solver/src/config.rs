//! Solver parameters.

use std::path::{Path, PathBuf};

use nalgebra::DVector;
use pf_fluids::ComponentKind;
use pf_pressure::LinearSolverConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Composition entering the domain through inflow boundary faces, given as
/// surface-volume fractions per component kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InflowMixture {
    pub water: f64,
    pub oil: f64,
    pub gas: f64,
}

impl Default for InflowMixture {
    fn default() -> Self {
        Self {
            water: 0.0,
            oil: 0.0,
            gas: 1.0,
        }
    }
}

impl InflowMixture {
    /// Composition vector ordered like `kinds`.
    ///
    /// A single-component fluid always receives its only component.
    pub fn resolve(&self, kinds: &[ComponentKind]) -> SolverResult<DVector<f64>> {
        match kinds.len() {
            1 => Ok(DVector::from_element(1, 1.0)),
            2 | 3 => Ok(DVector::from_iterator(
                kinds.len(),
                kinds.iter().map(|k| match k {
                    ComponentKind::Water => self.water,
                    ComponentKind::Oil => self.oil,
                    ComponentKind::Gas => self.gas,
                }),
            )),
            n => Err(SolverError::config(format!(
                "unhandled number of components: {n}"
            ))),
        }
    }
}

/// Parameters of the pressure iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub inflow_mixture: InflowMixture,
    pub linear_solver: LinearSolverConfig,
    /// Converged when the relative flux change drops below this...
    pub flux_rel_tol: f64,
    /// ...or the relative pressure change drops below this.
    pub press_rel_tol: f64,
    pub max_num_iter: usize,
    /// Largest accepted `|u - 1|` at the start of a solve.
    pub max_relative_voldiscr: f64,
    /// Relaxation time for the volume discrepancy correction. Zero applies
    /// the full correction every step.
    pub relax_time_voldiscr: f64,
    pub relax_weight_pressure_iteration: f64,
    /// Solve for Newton corrections of the exact volume balance instead of
    /// the linearised pressure equation.
    pub experimental_jacobian: bool,
    /// Write the residual of every Newton iteration to `residual_dir`.
    pub output_residual: bool,
    pub residual_dir: PathBuf,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            inflow_mixture: InflowMixture::default(),
            linear_solver: LinearSolverConfig::default(),
            flux_rel_tol: 1e-5,
            press_rel_tol: 1e-5,
            max_num_iter: 15,
            max_relative_voldiscr: 0.15,
            relax_time_voldiscr: 0.0,
            relax_weight_pressure_iteration: 1.0,
            experimental_jacobian: false,
            output_residual: false,
            residual_dir: PathBuf::from("."),
        }
    }
}

impl SolverConfig {
    pub fn from_yaml_str(s: &str) -> SolverResult<Self> {
        let cfg: Self = serde_yaml::from_str(s)
            .map_err(|e| SolverError::config(format!("invalid solver config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SolverResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> SolverResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.flux_rel_tol) || !positive(self.press_rel_tol) {
            return Err(SolverError::config("relative tolerances must be positive"));
        }
        if self.max_num_iter == 0 {
            return Err(SolverError::config("max_num_iter must be at least 1"));
        }
        if !positive(self.max_relative_voldiscr) {
            return Err(SolverError::config("max_relative_voldiscr must be positive"));
        }
        if !(self.relax_time_voldiscr.is_finite() && self.relax_time_voldiscr >= 0.0) {
            return Err(SolverError::config("relax_time_voldiscr must be non-negative"));
        }
        let w = self.relax_weight_pressure_iteration;
        if !(w > 0.0 && w <= 1.0) {
            return Err(SolverError::config(
                "relax_weight_pressure_iteration must lie in (0, 1]",
            ));
        }
        let mix = &self.inflow_mixture;
        if [mix.water, mix.oil, mix.gas]
            .iter()
            .any(|v| !(v.is_finite() && *v >= 0.0))
        {
            return Err(SolverError::config("inflow mixture must be non-negative"));
        }
        if let LinearSolverConfig::BiCgStab {
            tol,
            max_iterations,
        } = self.linear_solver
        {
            if !positive(tol) || max_iterations == 0 {
                return Err(SolverError::config("invalid bicgstab parameters"));
            }
        }
        Ok(())
    }
}
