#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use nalgebra::DVector;
use pf_fluids::{ImmiscibleFluid, PhaseKind, PhaseProps};
use pf_grid::{FlowBc, FlowBcSet, Mesh, Rock};
use pf_pressure::{
    AssembleInput, CsrMatrix, DenseLuSolver, LinearSolver, LinearSolverConfig, LinearSolverReport,
    LinearSystem, PressureAssembler, PressureFluxOutput, PressureResult, TpfaAssembler,
};
use pf_solver::SolverConfig;
use pf_wells::Wells;

/// Dense LU that counts how often it is called.
pub struct CountingSolver {
    pub calls: Rc<Cell<usize>>,
}

impl LinearSolver for CountingSolver {
    fn solve(&mut self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> LinearSolverReport {
        self.calls.set(self.calls.get() + 1);
        DenseLuSolver.solve(matrix, rhs, x)
    }
}

/// Never converges.
pub struct StallingSolver;

impl LinearSolver for StallingSolver {
    fn solve(&mut self, _matrix: &CsrMatrix, _rhs: &[f64], _x: &mut [f64]) -> LinearSolverReport {
        LinearSolverReport {
            converged: false,
            iterations: 7,
            reduction: 0.5,
        }
    }
}

/// What a [`RecordingAssembler`] saw.
#[derive(Debug, Default)]
pub struct AssembleLog {
    /// Volume discrepancy handed to each `assemble` call.
    pub volume_discrepancy: Vec<Vec<f64>>,
}

impl AssembleLog {
    pub fn calls(&self) -> usize {
        self.volume_discrepancy.len()
    }
}

/// TPFA assembler that records its inputs.
pub struct RecordingAssembler {
    pub inner: TpfaAssembler,
    pub log: Rc<RefCell<AssembleLog>>,
}

impl RecordingAssembler {
    pub fn new() -> Self {
        Self {
            inner: TpfaAssembler::new(),
            log: Rc::new(RefCell::new(AssembleLog::default())),
        }
    }
}

impl PressureAssembler for RecordingAssembler {
    fn init(&mut self, mesh: &dyn Mesh, wells: &dyn Wells, rock: &dyn Rock) -> PressureResult<()> {
        self.inner.init(mesh, wells, rock)
    }

    fn assemble(&mut self, input: &AssembleInput<'_>) -> PressureResult<()> {
        self.log
            .borrow_mut()
            .volume_discrepancy
            .push(input.volume_discrepancy.to_vec());
        self.inner.assemble(input)
    }

    fn linear_system(&self) -> &LinearSystem {
        self.inner.linear_system()
    }

    fn linear_system_mut(&mut self) -> &mut LinearSystem {
        self.inner.linear_system_mut()
    }

    fn compute_pressures_and_fluxes(&mut self, out: PressureFluxOutput<'_>) -> PressureResult<()> {
        self.inner.compute_pressures_and_fluxes(out)
    }

    fn explicit_timestep_limit(
        &self,
        face_mobility: &[DVector<f64>],
        face_mobility_deriv: &[DVector<f64>],
    ) -> PressureResult<f64> {
        self.inner
            .explicit_timestep_limit(face_mobility, face_mobility_deriv)
    }

    fn explicit_transport(&self, dt: f64, cell_z: &mut [DVector<f64>]) -> PressureResult<()> {
        self.inner.explicit_transport(dt, cell_z)
    }

    fn face_transmissibilities(&self) -> &[f64] {
        self.inner.face_transmissibilities()
    }
}

pub fn lu_config() -> SolverConfig {
    SolverConfig {
        linear_solver: LinearSolverConfig::DenseLu,
        ..SolverConfig::default()
    }
}

pub fn oil() -> ImmiscibleFluid {
    ImmiscibleFluid::new(vec![PhaseProps::incompressible(PhaseKind::Liquid, 800.0, 1e-3)]).unwrap()
}

pub fn compressible_oil(c: f64) -> ImmiscibleFluid {
    ImmiscibleFluid::new(vec![
        PhaseProps::incompressible(PhaseKind::Liquid, 800.0, 1e-3).with_compressibility(c, 1e5),
    ])
    .unwrap()
}

pub fn water_oil() -> ImmiscibleFluid {
    ImmiscibleFluid::new(vec![
        PhaseProps::incompressible(PhaseKind::Aqua, 1000.0, 1e-3),
        PhaseProps::incompressible(PhaseKind::Liquid, 800.0, 2e-3),
    ])
    .unwrap()
}

pub fn all_dirichlet(pressure: f64) -> FlowBcSet {
    FlowBcSet::uniform(1..=6, FlowBc::Dirichlet { pressure }).unwrap()
}

/// Pressure on the x- and x+ ends, no flow elsewhere.
pub fn x_ends(left: f64, right: f64) -> FlowBcSet {
    FlowBcSet::new()
        .with(1, FlowBc::Dirichlet { pressure: left })
        .unwrap()
        .with(2, FlowBc::Dirichlet { pressure: right })
        .unwrap()
}

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}
