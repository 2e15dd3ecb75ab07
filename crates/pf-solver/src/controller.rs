//! Outer Picard/Newton pressure iteration.

use nalgebra::{DVector, Vector3};
use pf_core::ensure_len;
use pf_fluids::{FluidModel, FluidSnapshot};
use pf_grid::{BoundaryConditions, Mesh, Rock};
use pf_pressure::{
    AssembleInput, FaceBc, LinearSolver, PressureAssembler, PressureFluxOutput, TpfaAssembler,
};
use pf_wells::Wells;
use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::convergence::{
    RelativeChanges, compute_flux_press_changes, is_converged, max_relative_discrepancy,
};
use crate::error::{SolverError, SolverResult};
use crate::fluid_bridge::{FluidContext, compute_fluid_properties};
use crate::formulation::{
    DirectStep, ResidualJacobianStep, StepContext, StepFormulation, relax_in_place,
};
use crate::perforation::PerforationTable;
use crate::setup::build_face_bc;
use crate::state::ReservoirState;
use crate::well_model::{compute_well_perf_pressures, compute_well_potentials};

/// Result of one pressure solve that did not fail outright.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SolveOutcome {
    Converged {
        iterations: usize,
    },
    /// The initial state was too far from filling the pore volume. No linear
    /// solve was attempted.
    VolumeDiscrepancyTooLarge {
        max_relative: f64,
    },
    FailedToConverge {
        iterations: usize,
        last_changes: RelativeChanges,
    },
}

impl SolveOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolveOutcome::Converged { .. })
    }
}

/// Collaborators and derived tables bound by `setup`.
struct Bound<'a> {
    mesh: &'a dyn Mesh,
    rock: &'a dyn Rock,
    fluid: &'a dyn FluidModel,
    wells: &'a dyn Wells,
    gravity: Vector3<f64>,
    face_bc: Vec<FaceBc>,
    perfs: PerforationTable,
    inflow_mixture: DVector<f64>,
    pore_volume: Vec<f64>,
}

impl Bound<'_> {
    /// Refresh the snapshot and the perforation fluid state for `state`.
    fn refresh_fluid(
        &mut self,
        state: &ReservoirState,
        dt: f64,
        snapshot: &mut FluidSnapshot,
    ) -> SolverResult<()> {
        let ctx = FluidContext {
            mesh: self.mesh,
            rock: self.rock,
            fluid: self.fluid,
            wells: self.wells,
            gravity: self.gravity,
            inflow_mixture: &self.inflow_mixture,
        };
        compute_fluid_properties(&ctx, state, dt, snapshot, &mut self.perfs)
    }

    fn check_state(&self, state: &ReservoirState) -> SolverResult<()> {
        ensure_len(state.cell_pressure.len(), self.mesh.num_cells(), "cell pressure")?;
        ensure_len(state.cell_z.len(), self.mesh.num_cells(), "cell composition")?;
        ensure_len(state.face_pressure.len(), self.mesh.num_faces(), "face pressure")?;
        ensure_len(state.face_flux.len(), self.mesh.num_faces(), "face flux")?;
        ensure_len(state.well_perf_pressure.len(), self.perfs.len(), "perforation pressure")?;
        ensure_len(state.well_perf_flux.len(), self.perfs.len(), "perforation flux")?;
        Ok(())
    }
}

/// Scalar work vectors reused across solves.
#[derive(Debug, Default)]
struct Scratch {
    initial_cell_pressure: Vec<f64>,
    cell_pressure: Vec<f64>,
    face_pressure: Vec<f64>,
    well_bhp: Vec<f64>,
    volume_discrepancy: Vec<f64>,
    prev_cell_pressure: Vec<f64>,
    prev_face_pressure: Vec<f64>,
    prev_face_flux: Vec<f64>,
    prev_perf_flux: Vec<f64>,
}

fn copy_into(dst: &mut Vec<f64>, src: &[f64]) {
    dst.clear();
    dst.extend_from_slice(src);
}

fn discrepancy_verdict(max_relative: f64, limit: f64) -> bool {
    if max_relative <= limit {
        info!(max_relative, limit, "volume discrepancy acceptable");
        true
    } else {
        info!(max_relative, limit, "volume discrepancy too large");
        false
    }
}

/// Drives the pressure iteration for one time step.
///
/// Build with [`PressureController::new`], bind the reservoir description with
/// [`PressureController::setup`], then call [`PressureController::solve`] once
/// per step.
pub struct PressureController<'a> {
    config: SolverConfig,
    formulation: Box<dyn StepFormulation>,
    linear_solver: Box<dyn LinearSolver>,
    assembler: Box<dyn PressureAssembler>,
    snapshot: FluidSnapshot,
    bound: Option<Bound<'a>>,
    scratch: Scratch,
}

impl<'a> PressureController<'a> {
    pub fn new(config: SolverConfig) -> SolverResult<Self> {
        config.validate()?;
        let formulation: Box<dyn StepFormulation> = match (
            config.experimental_jacobian,
            config.output_residual,
        ) {
            (true, true) => Box::new(ResidualJacobianStep::with_residual_output(
                config.residual_dir.clone(),
            )),
            (true, false) => Box::new(ResidualJacobianStep::new()),
            (false, output) => {
                if output {
                    debug!("residual output only applies to the jacobian formulation");
                }
                Box::new(DirectStep)
            }
        };
        Ok(Self {
            linear_solver: config.linear_solver.build(),
            assembler: Box::new(TpfaAssembler::new()),
            formulation,
            config,
            snapshot: FluidSnapshot::new(),
            bound: None,
            scratch: Scratch::default(),
        })
    }

    /// Replace the linear solver chosen by the configuration.
    pub fn with_linear_solver(mut self, solver: Box<dyn LinearSolver>) -> Self {
        self.linear_solver = solver;
        self
    }

    /// Replace the TPFA assembler. Must be called before `setup`.
    pub fn with_assembler(mut self, assembler: Box<dyn PressureAssembler>) -> Self {
        self.assembler = assembler;
        self.bound = None;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Bind the reservoir description and initialise the assembler.
    pub fn setup(
        &mut self,
        mesh: &'a dyn Mesh,
        rock: &'a dyn Rock,
        fluid: &'a dyn FluidModel,
        wells: &'a dyn Wells,
        gravity: Vector3<f64>,
        bc: &dyn BoundaryConditions,
    ) -> SolverResult<()> {
        let face_bc = build_face_bc(mesh, bc)?;
        let inflow_mixture = self.config.inflow_mixture.resolve(fluid.component_kinds())?;
        let perfs = PerforationTable::from_wells(wells, fluid.num_phases(), fluid.num_components());
        self.assembler.init(mesh, wells, rock)?;
        let pore_volume = (0..mesh.num_cells())
            .map(|c| rock.porosity(c) * mesh.cell_volume(c))
            .collect();

        info!(
            cells = mesh.num_cells(),
            faces = mesh.num_faces(),
            wells = wells.num_wells(),
            perforations = perfs.len(),
            formulation = self.formulation.name(),
            "pressure controller set up"
        );

        self.bound = Some(Bound {
            mesh,
            rock,
            fluid,
            wells,
            gravity,
            face_bc,
            perfs,
            inflow_mixture,
            pore_volume,
        });
        Ok(())
    }

    /// Solve for pressures and fluxes at the end of a step of length `dt`.
    ///
    /// Overwrites every pressure and flux in `state`. `src` holds one total
    /// volumetric source per cell.
    pub fn solve(
        &mut self,
        state: &mut ReservoirState,
        src: &[f64],
        dt: f64,
    ) -> SolverResult<SolveOutcome> {
        let Self {
            config,
            formulation,
            linear_solver,
            assembler,
            snapshot,
            bound,
            scratch: s,
        } = self;
        let bound = bound.as_mut().ok_or(SolverError::NotSetUp)?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::config("time step must be positive"));
        }
        bound.check_state(state)?;
        ensure_len(src.len(), bound.mesh.num_cells(), "cell sources")?;

        bound.perfs.set_pressures(&state.well_perf_pressure)?;
        let pp = bound.fluid.pressure_phase();
        s.initial_cell_pressure.clear();
        s.initial_cell_pressure
            .extend(state.cell_pressure.iter().map(|p| p[pp]));
        copy_into(&mut s.cell_pressure, &s.initial_cell_pressure);
        s.face_pressure.clear();
        s.face_pressure.resize(bound.mesh.num_faces(), 0.0);
        s.well_bhp.clear();
        s.well_bhp.resize(bound.wells.num_wells(), 0.0);
        state.face_flux.fill(0.0);

        let weight = config.relax_weight_pressure_iteration;
        let mut changes = RelativeChanges::default();

        for iteration in 0..config.max_num_iter {
            copy_into(&mut s.prev_face_flux, &state.face_flux);
            copy_into(&mut s.prev_face_pressure, &s.face_pressure);
            copy_into(&mut s.prev_cell_pressure, &s.cell_pressure);
            copy_into(&mut s.prev_perf_flux, &state.well_perf_flux);

            bound.refresh_fluid(state, dt, snapshot)?;

            if iteration == 0 {
                let max_relative = max_relative_discrepancy(snapshot);
                if !discrepancy_verdict(max_relative, config.max_relative_voldiscr) {
                    return Ok(SolveOutcome::VolumeDiscrepancyTooLarge { max_relative });
                }
                copy_into(&mut s.volume_discrepancy, &snapshot.volume_discrepancy);
                if config.relax_time_voldiscr > 0.0 {
                    let damping = (dt / config.relax_time_voldiscr).min(1.0);
                    s.volume_discrepancy.iter_mut().for_each(|v| *v *= damping);
                }
                compute_well_potentials(
                    bound.mesh,
                    bound.wells,
                    bound.fluid,
                    bound.gravity,
                    &mut bound.perfs,
                )?;
            }

            assembler.assemble(&AssembleInput {
                sources: src,
                bc: &bound.face_bc,
                dt,
                total_compressibility: &snapshot.total_compressibility,
                volume_discrepancy: &s.volume_discrepancy,
                face_transform: &snapshot.face_transform,
                perf_transform: bound.perfs.transform(),
                face_mobility: &snapshot.face_mobility,
                perf_mobility: bound.perfs.mobility(),
                initial_cell_pressure: &s.initial_cell_pressure,
                grav_cap_face: &snapshot.grav_cap_face,
                perf_potential: bound.perfs.potential(),
            })?;

            let report = formulation.solve_step(
                assembler.linear_system_mut(),
                &mut **linear_solver,
                &StepContext {
                    iteration,
                    dt,
                    pore_volume: &bound.pore_volume,
                    snapshot,
                    initial_cell_pressure: &s.initial_cell_pressure,
                    cell_pressure: &s.cell_pressure,
                    well_bhp: &s.well_bhp,
                    volume_discrepancy: &s.volume_discrepancy,
                },
            )?;
            if !report.converged {
                return Err(SolverError::LinearSolverFailed {
                    iterations: report.iterations,
                    reduction: report.reduction,
                });
            }

            assembler.compute_pressures_and_fluxes(PressureFluxOutput {
                cell_pressure: &mut s.cell_pressure,
                face_pressure: &mut s.face_pressure,
                face_flux: &mut state.face_flux,
                well_bhp: &mut s.well_bhp,
                perf_flux: &mut state.well_perf_flux,
            })?;

            relax_in_place(&mut s.cell_pressure, &s.prev_cell_pressure, weight);
            if iteration > 0 {
                relax_in_place(&mut s.face_pressure, &s.prev_face_pressure, weight);
                relax_in_place(&mut state.face_flux, &s.prev_face_flux, weight);
            }

            for (phase_p, p) in state.cell_pressure.iter_mut().zip(&s.cell_pressure) {
                phase_p.fill(*p);
            }
            for (phase_p, p) in state.face_pressure.iter_mut().zip(&s.face_pressure) {
                phase_p.fill(*p);
            }

            let perf_pressure = compute_well_perf_pressures(
                bound.wells.num_wells(),
                &state.well_perf_flux,
                &s.well_bhp,
                &bound.perfs,
            )?;
            bound.perfs.set_pressures(&perf_pressure)?;
            state.well_perf_pressure.copy_from_slice(&perf_pressure);

            changes = compute_flux_press_changes(
                &state.face_flux,
                &state.well_perf_flux,
                &s.cell_pressure,
                &s.prev_face_flux,
                &s.prev_perf_flux,
                &s.prev_cell_pressure,
            );
            info!(
                iteration,
                flux_change = changes.flux,
                pressure_change = changes.pressure,
                "pressure iteration"
            );
            if is_converged(&changes, config.flux_rel_tol, config.press_rel_tol) {
                info!(iterations = iteration + 1, "pressure solve converged");
                return Ok(SolveOutcome::Converged {
                    iterations: iteration + 1,
                });
            }
        }

        info!(
            iterations = config.max_num_iter,
            "pressure solve failed to converge"
        );
        Ok(SolveOutcome::FailedToConverge {
            iterations: config.max_num_iter,
            last_changes: changes,
        })
    }

    /// Whether the fluid in `state` fills the pore volume closely enough to
    /// start a pressure solve. Uses the same threshold as `solve`.
    pub fn volume_discrepancy_acceptable(
        &mut self,
        state: &ReservoirState,
        dt: f64,
    ) -> SolverResult<bool> {
        let bound = self.bound.as_mut().ok_or(SolverError::NotSetUp)?;
        bound.check_state(state)?;
        bound.perfs.set_pressures(&state.well_perf_pressure)?;
        bound.refresh_fluid(state, dt, &mut self.snapshot)?;
        Ok(discrepancy_verdict(
            max_relative_discrepancy(&self.snapshot),
            self.config.max_relative_voldiscr,
        ))
    }

    /// Largest stable explicit transport step for the latest solve.
    pub fn stable_step_impes(&self) -> SolverResult<f64> {
        if self.bound.is_none() {
            return Err(SolverError::NotSetUp);
        }
        Ok(self.assembler.explicit_timestep_limit(
            &self.snapshot.face_mobility,
            &self.snapshot.face_mobility_deriv,
        )?)
    }

    /// Advance the cell compositions explicitly with the latest fluxes.
    pub fn do_step_impes(&mut self, state: &mut ReservoirState, dt: f64) -> SolverResult<()> {
        if self.bound.is_none() {
            return Err(SolverError::NotSetUp);
        }
        self.assembler.explicit_transport(dt, &mut state.cell_z)?;
        Ok(())
    }

    pub fn inflow_mixture(&self) -> SolverResult<&DVector<f64>> {
        self.bound
            .as_ref()
            .map(|b| &b.inflow_mixture)
            .ok_or(SolverError::NotSetUp)
    }

    pub fn volume_discrepancy_limit(&self) -> f64 {
        self.config.max_relative_voldiscr
    }

    pub fn face_transmissibilities(&self) -> &[f64] {
        self.assembler.face_transmissibilities()
    }

    pub fn pore_volumes(&self) -> SolverResult<&[f64]> {
        self.bound
            .as_ref()
            .map(|b| b.pore_volume.as_slice())
            .ok_or(SolverError::NotSetUp)
    }

    /// A uniform state with every phase at `pressure` and every cell holding
    /// composition `z`. Perforations start at the pressures given by the
    /// well set.
    pub fn initial_state(&self, pressure: f64, z: &DVector<f64>) -> SolverResult<ReservoirState> {
        let bound = self.bound.as_ref().ok_or(SolverError::NotSetUp)?;
        let np = bound.fluid.num_phases();
        if z.len() != bound.fluid.num_components() {
            return Err(SolverError::config(format!(
                "initial composition has {} entries, fluid has {} components",
                z.len(),
                bound.fluid.num_components()
            )));
        }
        let nc = bound.mesh.num_cells();
        let nf = bound.mesh.num_faces();
        Ok(ReservoirState {
            cell_pressure: vec![DVector::from_element(np, pressure); nc],
            face_pressure: vec![DVector::from_element(np, pressure); nf],
            cell_z: vec![z.clone(); nc],
            face_flux: vec![0.0; nf],
            well_perf_pressure: bound.perfs.pressure().to_vec(),
            well_perf_flux: vec![0.0; bound.perfs.len()],
        })
    }
}
