//! Linear solvers for the CSR pressure system.

use crate::csr::CsrMatrix;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of one linear solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearSolverReport {
    pub converged: bool,
    pub iterations: usize,
    /// Final residual norm over initial residual norm.
    pub reduction: f64,
}

/// Sparse linear solver. `x` holds the initial guess on entry and the
/// solution on exit.
pub trait LinearSolver {
    fn solve(&mut self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> LinearSolverReport;
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn residual(matrix: &CsrMatrix, rhs: &[f64], x: &[f64]) -> Vec<f64> {
    let mut r = vec![0.0; rhs.len()];
    matrix.mul_vec(x, &mut r);
    for (ri, bi) in r.iter_mut().zip(rhs) {
        *ri = bi - *ri;
    }
    r
}

/// Direct solve through a dense LU factorisation. Meant for small systems.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseLuSolver;

impl LinearSolver for DenseLuSolver {
    fn solve(&mut self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> LinearSolverReport {
        let r0 = norm(&residual(matrix, rhs, x));
        let b = DVector::from_column_slice(rhs);
        match matrix.to_dense().lu().solve(&b) {
            Some(sol) => {
                x.copy_from_slice(sol.as_slice());
                let r = norm(&residual(matrix, rhs, x));
                LinearSolverReport {
                    converged: sol.iter().all(|v| v.is_finite()),
                    iterations: 1,
                    reduction: if r0 > 0.0 { r / r0 } else { 0.0 },
                }
            }
            None => {
                debug!("dense LU: singular matrix");
                LinearSolverReport {
                    converged: false,
                    iterations: 1,
                    reduction: f64::INFINITY,
                }
            }
        }
    }
}

/// Jacobi-preconditioned BiCGSTAB.
#[derive(Clone, Copy, Debug)]
pub struct BiCgStabSolver {
    /// Required residual reduction.
    pub tol: f64,
    pub max_iterations: usize,
}

impl Default for BiCgStabSolver {
    fn default() -> Self {
        Self {
            tol: 1e-12,
            max_iterations: 1000,
        }
    }
}

impl LinearSolver for BiCgStabSolver {
    fn solve(&mut self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> LinearSolverReport {
        let n = rhs.len();
        let inv_diag: Vec<f64> = matrix
            .diagonal()
            .into_iter()
            .map(|d| if d != 0.0 { 1.0 / d } else { 1.0 })
            .collect();
        let precond = |v: &[f64], out: &mut [f64]| {
            for ((o, vi), m) in out.iter_mut().zip(v).zip(&inv_diag) {
                *o = vi * m;
            }
        };

        let mut r = residual(matrix, rhs, x);
        let r0_norm = norm(&r);
        if r0_norm == 0.0 {
            return LinearSolverReport {
                converged: true,
                iterations: 0,
                reduction: 0.0,
            };
        }
        let r_hat = r.clone();

        let (mut rho_old, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut p = vec![0.0; n];
        let mut v = vec![0.0; n];
        let mut y = vec![0.0; n];
        let mut z = vec![0.0; n];
        let mut s = vec![0.0; n];
        let mut t = vec![0.0; n];
        let mut reduction = 1.0;
        let mut iterations = 0;

        for iter in 1..=self.max_iterations {
            iterations = iter;
            let rho = dot(&r_hat, &r);
            if rho == 0.0 || !rho.is_finite() {
                debug!(iter, "bicgstab breakdown: rho = {rho}");
                break;
            }
            let beta = (rho / rho_old) * (alpha / omega);
            for i in 0..n {
                p[i] = r[i] + beta * (p[i] - omega * v[i]);
            }

            precond(&p, &mut y);
            matrix.mul_vec(&y, &mut v);
            let rv = dot(&r_hat, &v);
            if rv == 0.0 {
                debug!(iter, "bicgstab breakdown: r_hat . v = 0");
                break;
            }
            alpha = rho / rv;
            for i in 0..n {
                s[i] = r[i] - alpha * v[i];
            }

            let s_norm = norm(&s);
            if s_norm / r0_norm <= self.tol {
                for i in 0..n {
                    x[i] += alpha * y[i];
                }
                return LinearSolverReport {
                    converged: true,
                    iterations: iter,
                    reduction: s_norm / r0_norm,
                };
            }

            precond(&s, &mut z);
            matrix.mul_vec(&z, &mut t);
            let tt = dot(&t, &t);
            if tt == 0.0 {
                debug!(iter, "bicgstab breakdown: t = 0");
                break;
            }
            omega = dot(&t, &s) / tt;
            for i in 0..n {
                x[i] += alpha * y[i] + omega * z[i];
                r[i] = s[i] - omega * t[i];
            }

            reduction = norm(&r) / r0_norm;
            if reduction <= self.tol {
                return LinearSolverReport {
                    converged: true,
                    iterations: iter,
                    reduction,
                };
            }
            if omega == 0.0 {
                debug!(iter, "bicgstab breakdown: omega = 0");
                break;
            }
            rho_old = rho;
        }

        LinearSolverReport {
            converged: false,
            iterations,
            reduction,
        }
    }
}

/// Serialisable choice of linear solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinearSolverConfig {
    DenseLu,
    #[serde(rename = "bicgstab")]
    BiCgStab {
        #[serde(default = "default_tol")]
        tol: f64,
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    },
}

fn default_tol() -> f64 {
    1e-12
}

fn default_max_iterations() -> usize {
    1000
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        LinearSolverConfig::BiCgStab {
            tol: default_tol(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl LinearSolverConfig {
    pub fn build(&self) -> Box<dyn LinearSolver> {
        match *self {
            LinearSolverConfig::DenseLu => Box::new(DenseLuSolver),
            LinearSolverConfig::BiCgStab {
                tol,
                max_iterations,
            } => Box::new(BiCgStabSolver {
                tol,
                max_iterations,
            }),
        }
    }
}
