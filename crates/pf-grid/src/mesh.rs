//! Mesh contract consumed by the pressure solver.

use nalgebra::Vector3;

/// Cell/face topology and geometry.
///
/// Faces carry two cell slots. Flux across a face is positive when it goes
/// from slot 0 to slot 1, which is also the direction of `face_normal`. A
/// boundary face has exactly one occupied slot.
pub trait Mesh {
    fn num_cells(&self) -> usize;

    fn num_faces(&self) -> usize;

    fn cell_volume(&self, cell: usize) -> f64;

    fn cell_centroid(&self, cell: usize) -> Vector3<f64>;

    /// Faces bounding `cell`.
    fn cell_faces(&self, cell: usize) -> &[usize];

    fn face_area(&self, face: usize) -> f64;

    /// Unit normal pointing from slot 0 towards slot 1.
    fn face_normal(&self, face: usize) -> Vector3<f64>;

    fn face_centroid(&self, face: usize) -> Vector3<f64>;

    fn face_cells(&self, face: usize) -> [Option<usize>; 2];

    /// Boundary identifier, 0 for interior faces.
    fn boundary_id(&self, face: usize) -> u32;

    /// Position used as the "cell" on each side of a face: the cell centroid
    /// when the slot is occupied, the face centroid otherwise.
    fn face_side_positions(&self, face: usize) -> [Vector3<f64>; 2] {
        let cells = self.face_cells(face);
        let fc = self.face_centroid(face);
        [
            cells[0].map_or(fc, |c| self.cell_centroid(c)),
            cells[1].map_or(fc, |c| self.cell_centroid(c)),
        ]
    }
}
