//! Structured box grid.

use crate::error::{GridError, GridResult};
use crate::mesh::Mesh;
use nalgebra::Vector3;

/// Logically Cartesian box of `nx * ny * nz` hexahedral cells.
///
/// The z axis points downwards, so a cell's z centroid is its depth. Boundary
/// faces get ids 1..=6 in the order x-, x+, y-, y+, z-, z+.
#[derive(Clone, Debug)]
pub struct CartesianGrid {
    dims: [usize; 3],
    spacing: [f64; 3],
    cell_faces: Vec<[usize; 6]>,
    face_cells: Vec<[Option<usize>; 2]>,
    face_axis: Vec<usize>,
    face_centroid: Vec<Vector3<f64>>,
    face_bid: Vec<u32>,
}

impl CartesianGrid {
    /// Build a grid with the given cell counts and cell sizes.
    pub fn new(dims: [usize; 3], spacing: [f64; 3]) -> GridResult<Self> {
        if dims.iter().any(|&n| n == 0) {
            return Err(GridError::InvalidDimensions {
                what: "cell counts must be positive",
            });
        }
        if spacing.iter().any(|&h| !(h.is_finite() && h > 0.0)) {
            return Err(GridError::InvalidDimensions {
                what: "cell sizes must be positive and finite",
            });
        }

        let [nx, ny, nz] = dims;
        let num_cells = nx * ny * nz;
        let mut grid = Self {
            dims,
            spacing,
            cell_faces: vec![[0; 6]; num_cells],
            face_cells: Vec::new(),
            face_axis: Vec::new(),
            face_centroid: Vec::new(),
            face_bid: Vec::new(),
        };

        for axis in 0..3 {
            let mut fdims = dims;
            fdims[axis] += 1;
            for k in 0..fdims[2] {
                for j in 0..fdims[1] {
                    for i in 0..fdims[0] {
                        let ijk = [i, j, k];
                        let layer = ijk[axis];
                        let face = grid.face_cells.len();

                        let lower = if layer > 0 {
                            let mut c = ijk;
                            c[axis] -= 1;
                            Some(grid.cell_index(c))
                        } else {
                            None
                        };
                        let upper = if layer < dims[axis] {
                            Some(grid.cell_index(ijk))
                        } else {
                            None
                        };
                        if let Some(c) = lower {
                            grid.cell_faces[c][2 * axis + 1] = face;
                        }
                        if let Some(c) = upper {
                            grid.cell_faces[c][2 * axis] = face;
                        }

                        let bid = if layer == 0 {
                            2 * axis as u32 + 1
                        } else if layer == dims[axis] {
                            2 * axis as u32 + 2
                        } else {
                            0
                        };

                        let mut centroid = Vector3::zeros();
                        for d in 0..3 {
                            let offset = if d == axis { 0.0 } else { 0.5 };
                            centroid[d] = (ijk[d] as f64 + offset) * spacing[d];
                        }

                        grid.face_cells.push([lower, upper]);
                        grid.face_axis.push(axis);
                        grid.face_centroid.push(centroid);
                        grid.face_bid.push(bid);
                    }
                }
            }
        }

        Ok(grid)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Linear cell index of logical position `[i, j, k]`.
    pub fn cell_index(&self, ijk: [usize; 3]) -> usize {
        ijk[0] + self.dims[0] * (ijk[1] + self.dims[1] * ijk[2])
    }
}

impl Mesh for CartesianGrid {
    fn num_cells(&self) -> usize {
        self.cell_faces.len()
    }

    fn num_faces(&self) -> usize {
        self.face_cells.len()
    }

    fn cell_volume(&self, _cell: usize) -> f64 {
        self.spacing.iter().product()
    }

    fn cell_centroid(&self, cell: usize) -> Vector3<f64> {
        let nx = self.dims[0];
        let ny = self.dims[1];
        let ijk = [cell % nx, (cell / nx) % ny, cell / (nx * ny)];
        Vector3::new(
            (ijk[0] as f64 + 0.5) * self.spacing[0],
            (ijk[1] as f64 + 0.5) * self.spacing[1],
            (ijk[2] as f64 + 0.5) * self.spacing[2],
        )
    }

    fn cell_faces(&self, cell: usize) -> &[usize] {
        &self.cell_faces[cell]
    }

    fn face_area(&self, face: usize) -> f64 {
        let axis = self.face_axis[face];
        (0..3)
            .filter(|&d| d != axis)
            .map(|d| self.spacing[d])
            .product()
    }

    fn face_normal(&self, face: usize) -> Vector3<f64> {
        let mut n = Vector3::zeros();
        n[self.face_axis[face]] = 1.0;
        n
    }

    fn face_centroid(&self, face: usize) -> Vector3<f64> {
        self.face_centroid[face]
    }

    fn face_cells(&self, face: usize) -> [Option<usize>; 2] {
        self.face_cells[face]
    }

    fn boundary_id(&self, face: usize) -> u32 {
        self.face_bid[face]
    }
}
