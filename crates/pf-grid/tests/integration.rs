//! Integration tests for pf-grid.

use pf_grid::{BoundaryConditions, CartesianGrid, FlowBc, FlowBcSet, Mesh, Rock, RockProperties};

#[test]
fn every_cell_face_lists_the_cell() {
    let grid = CartesianGrid::new([3, 2, 2], [10.0, 10.0, 5.0]).unwrap();
    for cell in 0..grid.num_cells() {
        let faces = grid.cell_faces(cell);
        assert_eq!(faces.len(), 6);
        for &face in faces {
            assert!(grid.face_cells(face).contains(&Some(cell)));
        }
    }
}

#[test]
fn boundary_faces_have_exactly_one_cell() {
    let grid = CartesianGrid::new([2, 2, 3], [1.0, 2.0, 3.0]).unwrap();
    for face in 0..grid.num_faces() {
        let occupied = grid.face_cells(face).iter().flatten().count();
        if grid.boundary_id(face) == 0 {
            assert_eq!(occupied, 2, "interior face {face}");
        } else {
            assert_eq!(occupied, 1, "boundary face {face}");
        }
    }
}

#[test]
fn face_side_positions_use_face_centroid_outside() {
    let grid = CartesianGrid::new([1, 1, 2], [1.0, 1.0, 1.0]).unwrap();
    let top = (0..grid.num_faces())
        .find(|&f| grid.boundary_id(f) == 5)
        .unwrap();
    let [outside, inside] = grid.face_side_positions(top);
    assert_eq!(outside[2], 0.0);
    assert_eq!(inside[2], 0.5);
}

#[test]
fn total_volume_matches_box() {
    let grid = CartesianGrid::new([4, 3, 2], [2.0, 1.0, 0.5]).unwrap();
    let rock = RockProperties::uniform(grid.num_cells(), 0.25, 1e-12).unwrap();
    let pore_volume: f64 = (0..grid.num_cells())
        .map(|c| grid.cell_volume(c) * rock.porosity(c))
        .sum();
    assert!((pore_volume - 8.0 * 3.0 * 1.0 * 0.25).abs() < 1e-12);
}

#[test]
fn bc_set_roundtrips_through_trait() {
    let set = FlowBcSet::uniform(1..=2, FlowBc::Dirichlet { pressure: 1e5 }).unwrap();
    let bc: &dyn BoundaryConditions = &set;
    assert!(bc.flow_cond(1).is_dirichlet());
    assert!(bc.flow_cond(2).is_dirichlet());
    assert!(bc.flow_cond(3).is_neumann());
}
