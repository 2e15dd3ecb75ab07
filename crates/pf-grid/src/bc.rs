//! Boundary conditions keyed by boundary id.

use crate::error::{GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flow condition on a group of boundary faces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowBc {
    /// Prescribed pressure [Pa].
    Dirichlet { pressure: f64 },
    /// Prescribed total outward flux [m^3/s].
    Neumann { outflux: f64 },
    /// Periodic pairing with another boundary.
    Periodic,
}

impl FlowBc {
    /// Zero-flux Neumann condition.
    pub fn no_flow() -> Self {
        FlowBc::Neumann { outflux: 0.0 }
    }

    pub fn is_dirichlet(&self) -> bool {
        matches!(self, FlowBc::Dirichlet { .. })
    }

    pub fn is_neumann(&self) -> bool {
        matches!(self, FlowBc::Neumann { .. })
    }
}

/// Lookup of flow conditions by boundary id.
pub trait BoundaryConditions {
    fn flow_cond(&self, boundary_id: u32) -> FlowBc;
}

/// Explicit table of flow conditions. Ids without an entry are no-flow.
#[derive(Clone, Debug, Default)]
pub struct FlowBcSet {
    conditions: BTreeMap<u32, FlowBc>,
}

impl FlowBcSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a condition to a boundary id.
    pub fn set(&mut self, boundary_id: u32, bc: FlowBc) -> GridResult<()> {
        if boundary_id == 0 {
            return Err(GridError::InteriorBoundaryId);
        }
        if self.conditions.contains_key(&boundary_id) {
            return Err(GridError::DuplicateBoundary { id: boundary_id });
        }
        self.conditions.insert(boundary_id, bc);
        Ok(())
    }

    /// Builder-style variant of [`FlowBcSet::set`].
    pub fn with(mut self, boundary_id: u32, bc: FlowBc) -> GridResult<Self> {
        self.set(boundary_id, bc)?;
        Ok(self)
    }

    /// Same condition on every id in `ids`.
    pub fn uniform(ids: impl IntoIterator<Item = u32>, bc: FlowBc) -> GridResult<Self> {
        let mut set = Self::new();
        for id in ids {
            set.set(id, bc)?;
        }
        Ok(set)
    }
}

impl BoundaryConditions for FlowBcSet {
    fn flow_cond(&self, boundary_id: u32) -> FlowBc {
        self.conditions
            .get(&boundary_id)
            .copied()
            .unwrap_or_else(FlowBc::no_flow)
    }
}
