//! Strategies for turning an assembled pressure system into new unknowns.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use pf_fluids::FluidSnapshot;
use pf_pressure::{LinearSolver, LinearSolverReport, LinearSystem};
use tracing::debug;

use crate::error::{SolverError, SolverResult};

/// Per-iteration data a strategy may need besides the assembled system.
pub struct StepContext<'a> {
    pub iteration: usize,
    pub dt: f64,
    pub pore_volume: &'a [f64],
    pub snapshot: &'a FluidSnapshot,
    pub initial_cell_pressure: &'a [f64],
    /// Current scalar cell pressures.
    pub cell_pressure: &'a [f64],
    pub well_bhp: &'a [f64],
    /// Discrepancy term that was handed to the assembler.
    pub volume_discrepancy: &'a [f64],
}

/// Solves the assembled system, leaving `[p, bhp]` in `system.x`.
pub trait StepFormulation {
    fn name(&self) -> &'static str;

    fn solve_step(
        &mut self,
        system: &mut LinearSystem,
        solver: &mut dyn LinearSolver,
        ctx: &StepContext<'_>,
    ) -> SolverResult<LinearSolverReport>;
}

/// `A x - b` of the system's current `x`.
pub fn compute_linear_residual(system: &LinearSystem) -> Vec<f64> {
    system.residual()
}

/// `new = w * new + (1 - w) * prev`. A weight of one leaves `new` untouched.
pub fn relax_in_place(new: &mut [f64], prev: &[f64], weight: f64) {
    if weight == 1.0 {
        return;
    }
    for (n, p) in new.iter_mut().zip(prev) {
        *n = weight * *n + (1.0 - weight) * p;
    }
}

fn load_unknowns(system: &mut LinearSystem, ctx: &StepContext<'_>) -> SolverResult<()> {
    let nc = ctx.cell_pressure.len();
    if nc + ctx.well_bhp.len() != system.size() {
        return Err(SolverError::Invariant {
            what: "linear system size does not match cells and wells",
        });
    }
    system.x[..nc].copy_from_slice(ctx.cell_pressure);
    system.x[nc..].copy_from_slice(ctx.well_bhp);
    Ok(())
}

/// Solve the linearised pressure equation `A x = b` directly.
#[derive(Debug, Default)]
pub struct DirectStep;

impl StepFormulation for DirectStep {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn solve_step(
        &mut self,
        system: &mut LinearSystem,
        solver: &mut dyn LinearSolver,
        ctx: &StepContext<'_>,
    ) -> SolverResult<LinearSolverReport> {
        load_unknowns(system, ctx)?;
        let LinearSystem { matrix, rhs, x } = system;
        Ok(solver.solve(matrix, rhs, x))
    }
}

/// Writes residual vectors to `residual-<solve>-<iteration>.dat`.
#[derive(Debug)]
pub struct ResidualWriter {
    dir: PathBuf,
    next_solve: usize,
    current_solve: usize,
}

impl ResidualWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_solve: 0,
            current_solve: 0,
        }
    }

    /// Advances the solve counter on iteration zero.
    pub fn write(&mut self, iteration: usize, residual: &[f64]) -> SolverResult<PathBuf> {
        if iteration == 0 {
            self.current_solve = self.next_solve;
            self.next_solve += 1;
        }
        let path = self
            .dir
            .join(format!("residual-{}-{}.dat", self.current_solve, iteration));
        let mut out = BufWriter::new(fs::File::create(&path)?);
        for r in residual {
            writeln!(out, "{r:e}")?;
        }
        out.flush()?;
        debug!(path = %path.display(), "wrote residual");
        Ok(path)
    }
}

/// Newton correction of the exact volume balance.
///
/// The assembled system is reused as the Jacobian: its linearised
/// accumulation and frozen discrepancy are swapped for the exact term
/// `pv/dt (1 - u)` on the residual side and for `pv/dt jac` on the diagonal.
#[derive(Debug, Default)]
pub struct ResidualJacobianStep {
    writer: Option<ResidualWriter>,
}

impl ResidualJacobianStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_residual_output(dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: Some(ResidualWriter::new(dir)),
        }
    }
}

impl StepFormulation for ResidualJacobianStep {
    fn name(&self) -> &'static str {
        "residual-jacobian"
    }

    fn solve_step(
        &mut self,
        system: &mut LinearSystem,
        solver: &mut dyn LinearSolver,
        ctx: &StepContext<'_>,
    ) -> SolverResult<LinearSolverReport> {
        load_unknowns(system, ctx)?;
        let mut residual = compute_linear_residual(system);

        let snap = ctx.snapshot;
        let nc = ctx.cell_pressure.len();
        if snap.num_cells() != nc
            || ctx.pore_volume.len() != nc
            || ctx.initial_cell_pressure.len() != nc
            || ctx.volume_discrepancy.len() != nc
        {
            return Err(SolverError::Invariant {
                what: "cell data length mismatch",
            });
        }
        for c in 0..nc {
            let scale = ctx.pore_volume[c] / ctx.dt;
            let ct = snap.total_compressibility[c];
            let u = snap.total_phase_volume_density[c];
            let dp = ctx.cell_pressure[c] - ctx.initial_cell_pressure[c];
            residual[c] -= scale * (ct * dp - (1.0 - u)) - ctx.volume_discrepancy[c];
            system
                .matrix
                .add(c, c, scale * (snap.jacobian_term[c] - ct))?;
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write(ctx.iteration, &residual)?;
        }

        let mut delta = vec![0.0; system.size()];
        let report = solver.solve(&system.matrix, &residual, &mut delta);
        for (x, d) in system.x.iter_mut().zip(&delta) {
            *x -= d;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_weight_is_identity() {
        let mut new = vec![1.0, f64::MAX, -3.5];
        let before = new.clone();
        relax_in_place(&mut new, &[7.0, 8.0, f64::NAN], 1.0);
        assert_eq!(new, before);
    }

    #[test]
    fn half_weight_averages() {
        let mut new = vec![2.0, 4.0];
        relax_in_place(&mut new, &[0.0, 2.0], 0.5);
        assert_eq!(new, vec![1.0, 3.0]);
    }

    fn unique_temp_dir(prefix: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{nanos}"))
    }

    #[test]
    fn writer_numbers_files_per_solve_and_iteration() {
        let dir = unique_temp_dir("pf_residual_writer");
        std::fs::create_dir_all(&dir).unwrap();
        let mut w = ResidualWriter::new(&dir);
        let a = w.write(0, &[1.0, -2.0]).unwrap();
        let b = w.write(1, &[0.5]).unwrap();
        let c = w.write(0, &[0.0]).unwrap();
        assert!(a.ends_with("residual-0-0.dat"));
        assert!(b.ends_with("residual-0-1.dat"));
        assert!(c.ends_with("residual-1-0.dat"));
        let text = std::fs::read_to_string(a).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.lines().next().unwrap().parse::<f64>().unwrap(), 1.0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
