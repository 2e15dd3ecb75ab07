//! IMPES time stepping with cutback on failed pressure solves.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::controller::{PressureController, SolveOutcome};
use crate::error::{SolverError, SolverResult};
use crate::state::ReservoirState;

/// Step control parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepOptions {
    /// Factor applied to dt after a recoverable failure.
    pub cutback_factor: f64,
    pub max_cutbacks: usize,
    /// Smallest dt a cutback may produce.
    pub min_dt: f64,
    /// Advance compositions after each converged pressure solve.
    pub transport: bool,
    /// Most explicit substeps one transport step may take.
    pub max_transport_substeps: usize,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            cutback_factor: 0.5,
            max_cutbacks: 4,
            min_dt: 1e-6,
            transport: true,
            max_transport_substeps: 10_000,
        }
    }
}

impl StepOptions {
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.cutback_factor > 0.0 && self.cutback_factor < 1.0) {
            return Err(SolverError::config("cutback_factor must lie in (0, 1)"));
        }
        if !(self.min_dt.is_finite() && self.min_dt > 0.0) {
            return Err(SolverError::config("min_dt must be positive"));
        }
        if self.max_transport_substeps == 0 {
            return Err(SolverError::config(
                "max_transport_substeps must be at least 1",
            ));
        }
        Ok(())
    }
}

/// What one call to [`ImpesStepper::step`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Time actually advanced. Smaller than the requested dt after cutbacks.
    pub dt: f64,
    pub cutbacks: usize,
    pub pressure_iterations: usize,
    /// Explicit transport substeps taken.
    pub transport_substeps: usize,
    /// Outcome of the final pressure solve.
    pub outcome: SolveOutcome,
}

impl StepReport {
    pub fn accepted(&self) -> bool {
        self.outcome.is_converged()
    }
}

/// Runs pressure solve then transport for one global step.
#[derive(Clone, Debug, Default)]
pub struct ImpesStepper {
    pub options: StepOptions,
}

impl ImpesStepper {
    pub fn new(options: StepOptions) -> SolverResult<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Try `dt`, cutting back on recoverable outcomes.
    ///
    /// On an accepted step `state` holds the new pressures, fluxes and
    /// compositions. When every attempt fails `state` is left as it was
    /// passed in and the last outcome is reported. Transport needing more
    /// than `max_transport_substeps` substeps is a `Config` error, also
    /// with `state` restored.
    pub fn step(
        &self,
        controller: &mut PressureController<'_>,
        state: &mut ReservoirState,
        src: &[f64],
        dt: f64,
    ) -> SolverResult<StepReport> {
        let saved = state.clone();
        let mut dt_try = dt;
        let mut cutbacks = 0;

        loop {
            let outcome = controller.solve(state, src, dt_try)?;
            if let SolveOutcome::Converged { iterations } = outcome {
                let transport_substeps = if self.options.transport {
                    match self.transport(controller, state, dt_try) {
                        Ok(n) => n,
                        Err(e) => {
                            *state = saved;
                            return Err(e);
                        }
                    }
                } else {
                    0
                };
                return Ok(StepReport {
                    dt: dt_try,
                    cutbacks,
                    pressure_iterations: iterations,
                    transport_substeps,
                    outcome,
                });
            }

            *state = saved.clone();
            let next = dt_try * self.options.cutback_factor;
            if cutbacks >= self.options.max_cutbacks || next < self.options.min_dt {
                warn!(dt = dt_try, cutbacks, ?outcome, "step failed, no cutback left");
                return Ok(StepReport {
                    dt: 0.0,
                    cutbacks,
                    pressure_iterations: 0,
                    transport_substeps: 0,
                    outcome,
                });
            }
            warn!(dt = dt_try, next_dt = next, ?outcome, "cutting back time step");
            dt_try = next;
            cutbacks += 1;
        }
    }

    fn transport(
        &self,
        controller: &mut PressureController<'_>,
        state: &mut ReservoirState,
        dt: f64,
    ) -> SolverResult<usize> {
        let stable = controller.stable_step_impes()?;
        let substeps = if stable.is_finite() && stable > 0.0 {
            let needed = (dt / stable).ceil();
            let limit = self.options.max_transport_substeps;
            if needed > limit as f64 {
                return Err(SolverError::config(format!(
                    "explicit transport over {dt:e} s needs {needed} substeps of at most {stable:e} s, limit is {limit}"
                )));
            }
            (needed as usize).max(1)
        } else {
            1
        };
        let sub_dt = dt / substeps as f64;
        debug!(dt, stable, substeps, "explicit transport");
        for _ in 0..substeps {
            controller.do_step_impes(state, sub_dt)?;
        }
        Ok(substeps)
    }
}
