//! In-memory well set and its builder.

use std::collections::HashMap;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{WellError, WellResult};
use crate::validate;
use crate::wells::{WellControl, WellType, Wells};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Perforation {
    pub(crate) cell: usize,
    pub(crate) well_index: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WellData {
    pub(crate) name: String,
    pub(crate) kind: WellType,
    pub(crate) control: WellControl,
    pub(crate) reference_depth: f64,
    pub(crate) perforations: Vec<Perforation>,
    pub(crate) injection_mixture: Option<DVector<f64>>,
    pub(crate) initial_pressure: Option<f64>,
}

/// Immutable, validated set of wells.
#[derive(Clone, Debug)]
pub struct WellSet {
    wells: Vec<WellData>,
    cell_well: HashMap<usize, usize>,
    initial_pressure: Vec<f64>,
}

impl WellSet {
    /// A set without wells.
    pub fn empty() -> Self {
        Self {
            wells: Vec::new(),
            cell_well: HashMap::new(),
            initial_pressure: Vec::new(),
        }
    }

    /// Build from serialisable definitions.
    pub fn from_defs(defs: &[WellDef], num_cells: usize, num_components: usize) -> WellResult<Self> {
        let mut builder = WellSetBuilder::new();
        for def in defs {
            let w = builder.add_well(&def.name, def.kind, def.control, def.reference_depth);
            for perf in &def.perforations {
                builder.perforate(w, perf.cell, perf.well_index)?;
            }
            if let Some(mix) = &def.injection_mixture {
                builder.set_injection_mixture(w, DVector::from_column_slice(mix))?;
            }
            if let Some(p) = def.initial_pressure {
                builder.set_initial_pressure(w, p)?;
            }
        }
        builder.build(num_cells, num_components)
    }

    pub fn name(&self, well: usize) -> &str {
        &self.wells[well].name
    }

    /// Well perforating `cell`, if any.
    pub fn well_of_cell(&self, cell: usize) -> Option<usize> {
        self.cell_well.get(&cell).copied()
    }
}

impl Wells for WellSet {
    fn num_wells(&self) -> usize {
        self.wells.len()
    }

    fn num_perforations(&self, well: usize) -> usize {
        self.wells[well].perforations.len()
    }

    fn well_cell(&self, well: usize, perf: usize) -> usize {
        self.wells[well].perforations[perf].cell
    }

    fn well_type(&self, well: usize) -> WellType {
        self.wells[well].kind
    }

    fn control(&self, well: usize) -> WellControl {
        self.wells[well].control
    }

    fn well_index(&self, well: usize, perf: usize) -> f64 {
        self.wells[well].perforations[perf].well_index
    }

    fn reference_depth(&self, well: usize) -> f64 {
        self.wells[well].reference_depth
    }

    fn injection_mixture(&self, cell: usize) -> Option<&DVector<f64>> {
        let well = &self.wells[self.well_of_cell(cell)?];
        match well.kind {
            WellType::Injector => well.injection_mixture.as_ref(),
            WellType::Producer => None,
        }
    }

    /// Zero for cells without a perforation.
    fn perforation_pressure(&self, cell: usize) -> f64 {
        self.well_of_cell(cell)
            .map_or(0.0, |w| self.initial_pressure[w])
    }
}

/// Incremental builder for [`WellSet`].
///
/// Wells are added first and perforated afterwards; `build()` validates the
/// whole set against the mesh size and the fluid's component count.
#[derive(Debug, Default)]
pub struct WellSetBuilder {
    wells: Vec<WellData>,
}

impl WellSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a well and return its index.
    pub fn add_well(
        &mut self,
        name: impl Into<String>,
        kind: WellType,
        control: WellControl,
        reference_depth: f64,
    ) -> usize {
        self.wells.push(WellData {
            name: name.into(),
            kind,
            control,
            reference_depth,
            perforations: Vec::new(),
            injection_mixture: None,
            initial_pressure: None,
        });
        self.wells.len() - 1
    }

    fn well_mut(&mut self, well: usize) -> WellResult<&mut WellData> {
        self.wells
            .get_mut(well)
            .ok_or(WellError::UnknownWell { well })
    }

    pub fn perforate(&mut self, well: usize, cell: usize, well_index: f64) -> WellResult<&mut Self> {
        self.well_mut(well)?
            .perforations
            .push(Perforation { cell, well_index });
        Ok(self)
    }

    pub fn set_injection_mixture(&mut self, well: usize, mixture: DVector<f64>) -> WellResult<&mut Self> {
        self.well_mut(well)?.injection_mixture = Some(mixture);
        Ok(self)
    }

    /// Initial perforation pressure. Defaults to the target of a BHP control.
    pub fn set_initial_pressure(&mut self, well: usize, pressure: f64) -> WellResult<&mut Self> {
        self.well_mut(well)?.initial_pressure = Some(pressure);
        Ok(self)
    }

    /// Validate and freeze the set.
    pub fn build(self, num_cells: usize, num_components: usize) -> WellResult<WellSet> {
        validate::validate_wells(&self.wells, num_cells, num_components)?;

        let mut cell_well = HashMap::new();
        let mut initial_pressure = Vec::with_capacity(self.wells.len());
        for (w, well) in self.wells.iter().enumerate() {
            for perf in &well.perforations {
                cell_well.insert(perf.cell, w);
            }
            let p0 = match (well.initial_pressure, well.control) {
                (Some(p), _) => p,
                (None, WellControl::Bhp(bhp)) => bhp,
                (None, WellControl::Rate(_)) => {
                    return Err(WellError::InvalidControl {
                        well: w,
                        what: "rate-controlled well needs an initial pressure",
                    });
                }
            };
            initial_pressure.push(p0);
        }

        Ok(WellSet {
            wells: self.wells,
            cell_well,
            initial_pressure,
        })
    }
}

/// Serialisable well definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellDef {
    pub name: String,
    pub kind: WellType,
    pub control: WellControl,
    #[serde(default)]
    pub reference_depth: f64,
    pub perforations: Vec<PerforationDef>,
    #[serde(default)]
    pub injection_mixture: Option<Vec<f64>>,
    #[serde(default)]
    pub initial_pressure: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerforationDef {
    pub cell: usize,
    pub well_index: f64,
}
