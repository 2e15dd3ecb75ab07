//! YAML case files and the objects built from them.

use std::path::Path;

use nalgebra::{DVector, Vector3};
use pf_fluids::{FluidModel, ImmiscibleFluid, PhaseProps};
use pf_grid::{CartesianGrid, FlowBc, FlowBcSet, Mesh, RockProperties};
use pf_solver::{SolverConfig, StepOptions};
use pf_wells::{WellDef, WellSet};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridDef {
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RockDef {
    pub porosity: f64,
    /// Isotropic permeability [m^2].
    pub permeability: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FluidDef {
    pub phases: Vec<PhaseProps>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundaryDef {
    pub id: u32,
    #[serde(flatten)]
    pub condition: FlowBc,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitialDef {
    pub pressure: f64,
    pub composition: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceDef {
    pub cell: usize,
    /// Total volumetric rate [m^3/s], positive into the cell.
    pub rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleDef {
    pub dt: f64,
    pub steps: usize,
    #[serde(default)]
    pub sources: Vec<SourceDef>,
}

/// A complete simulation case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseFile {
    pub grid: GridDef,
    pub rock: RockDef,
    pub fluid: FluidDef,
    #[serde(default)]
    pub gravity: [f64; 3],
    #[serde(default)]
    pub boundaries: Vec<BoundaryDef>,
    #[serde(default)]
    pub wells: Vec<WellDef>,
    pub initial: InitialDef,
    pub schedule: ScheduleDef,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub stepping: StepOptions,
}

impl CaseFile {
    pub fn from_yaml_str(s: &str) -> CliResult<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Build every collaborator, validating the case along the way.
    pub fn build(&self) -> CliResult<Model> {
        let grid = CartesianGrid::new(self.grid.dims, self.grid.spacing)?;
        let nc = grid.num_cells();
        let rock = RockProperties::uniform(nc, self.rock.porosity, self.rock.permeability)?;
        let fluid = ImmiscibleFluid::new(self.fluid.phases.clone())?;
        let wells = WellSet::from_defs(&self.wells, nc, fluid.num_components())?;

        let mut bc = FlowBcSet::new();
        for b in &self.boundaries {
            bc.set(b.id, b.condition)?;
        }

        if self.initial.composition.len() != fluid.num_components() {
            return Err(invalid(format!(
                "initial composition has {} entries, fluid has {} components",
                self.initial.composition.len(),
                fluid.num_components()
            )));
        }
        if !(self.schedule.dt.is_finite() && self.schedule.dt > 0.0) {
            return Err(invalid("schedule dt must be positive"));
        }

        let mut sources = vec![0.0; nc];
        for s in &self.schedule.sources {
            let slot = sources
                .get_mut(s.cell)
                .ok_or_else(|| invalid(format!("source cell {} out of range", s.cell)))?;
            *slot += s.rate;
        }

        self.solver.validate()?;
        self.stepping.validate()?;

        Ok(Model {
            grid,
            rock,
            fluid,
            wells,
            bc,
            gravity: Vector3::from(self.gravity),
            initial_composition: DVector::from_column_slice(&self.initial.composition),
            sources,
        })
    }
}

fn invalid(what: impl Into<String>) -> CliError {
    CliError::Invalid { what: what.into() }
}

/// Collaborators of one case.
pub struct Model {
    pub grid: CartesianGrid,
    pub rock: RockProperties,
    pub fluid: ImmiscibleFluid,
    pub wells: WellSet,
    pub bc: FlowBcSet,
    pub gravity: Vector3<f64>,
    pub initial_composition: DVector<f64>,
    pub sources: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_wells::Wells;

    const WATERFLOOD: &str = include_str!("../../../demos/waterflood.yaml");

    #[test]
    fn demo_case_builds() {
        let case = CaseFile::from_yaml_str(WATERFLOOD).unwrap();
        let model = case.build().unwrap();
        assert_eq!(model.grid.num_cells(), 10);
        assert_eq!(model.wells.num_wells(), 2);
        assert_eq!(model.initial_composition.len(), 2);
        assert_eq!(case.schedule.steps, 5);
    }

    #[test]
    fn minimal_case_uses_defaults() {
        let yaml = r#"
grid: { dims: [2, 1, 1], spacing: [1.0, 1.0, 1.0] }
rock: { porosity: 0.2, permeability: 1.0e-12 }
fluid:
  phases:
    - { kind: liquid, surface_density: 800.0, viscosity: 1.0e-3 }
boundaries:
  - { id: 1, type: dirichlet, pressure: 2.0e5 }
initial: { pressure: 1.0e5, composition: [1.0] }
schedule: { dt: 1.0, steps: 1, sources: [{ cell: 1, rate: 1.0e-6 }] }
"#;
        let case = CaseFile::from_yaml_str(yaml).unwrap();
        assert_eq!(case.solver, SolverConfig::default());
        assert_eq!(case.gravity, [0.0; 3]);
        let model = case.build().unwrap();
        assert_eq!(model.sources, vec![0.0, 1.0e-6]);
    }

    #[test]
    fn composition_length_is_checked() {
        let mut case = CaseFile::from_yaml_str(WATERFLOOD).unwrap();
        case.initial.composition = vec![1.0];
        assert!(matches!(case.build(), Err(CliError::Invalid { .. })));
    }
}
