//! Rock property contract and tabulated implementation.

use crate::error::{GridError, GridResult};
use nalgebra::Matrix3;
use pf_core::ensure_len;

/// Per-cell porosity and permeability.
pub trait Rock {
    fn porosity(&self, cell: usize) -> f64;

    /// Full permeability tensor [m^2].
    fn permeability(&self, cell: usize) -> Matrix3<f64>;
}

/// Cell-wise rock properties stored as plain arrays.
#[derive(Clone, Debug)]
pub struct RockProperties {
    porosity: Vec<f64>,
    permeability: Vec<Matrix3<f64>>,
}

impl RockProperties {
    /// Build from explicit arrays, validating every cell.
    pub fn new(porosity: Vec<f64>, permeability: Vec<Matrix3<f64>>) -> GridResult<Self> {
        ensure_len(permeability.len(), porosity.len(), "permeability")?;
        for (cell, (&phi, k)) in porosity.iter().zip(&permeability).enumerate() {
            if !(phi > 0.0 && phi <= 1.0) {
                return Err(GridError::InvalidRock {
                    cell,
                    what: "porosity must lie in (0, 1]",
                });
            }
            if (k - k.transpose()).abs().max() > 1e-12 * k.abs().max() {
                return Err(GridError::InvalidRock {
                    cell,
                    what: "permeability must be symmetric",
                });
            }
            if (0..3).any(|d| !(k[(d, d)] > 0.0)) {
                return Err(GridError::InvalidRock {
                    cell,
                    what: "permeability diagonal must be positive",
                });
            }
        }
        Ok(Self {
            porosity,
            permeability,
        })
    }

    /// Homogeneous, isotropic rock.
    pub fn uniform(num_cells: usize, porosity: f64, permeability: f64) -> GridResult<Self> {
        Self::new(
            vec![porosity; num_cells],
            vec![Matrix3::from_diagonal_element(permeability); num_cells],
        )
    }

    pub fn num_cells(&self) -> usize {
        self.porosity.len()
    }
}

impl Rock for RockProperties {
    fn porosity(&self, cell: usize) -> f64 {
        self.porosity[cell]
    }

    fn permeability(&self, cell: usize) -> Matrix3<f64> {
        self.permeability[cell]
    }
}
