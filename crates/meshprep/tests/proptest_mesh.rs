//! Property-based tests for validation, repair and STL encoding.
//!
//! Run with: cargo test -p meshprep --test proptest_mesh

use meshprep::{
    IssueCode, Mesh, RepairLog, Repairer, Severity, StlFormat, Validator, Vertex, read_stl,
    stl_to_bytes, validate_mesh_data,
};
use nalgebra::Vector3;
use proptest::prelude::*;
use std::io::Cursor;

// =============================================================================
// Strategies
// =============================================================================

fn arb_position() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-100.0..100.0f64)
}

/// Arbitrary triangle soup with in-range indices.
fn arb_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = Mesh> {
    (3..=max_vertices).prop_flat_map(move |num_vertices| {
        let vertices = prop::collection::vec(
            arb_position().prop_map(|[x, y, z]| Vertex::from_coords(x, y, z)),
            num_vertices,
        );
        let face = prop::array::uniform3(0..num_vertices as u32);
        let faces = prop::collection::vec(face, 1..=max_faces);
        (vertices, faces).prop_map(|(vertices, faces)| Mesh { vertices, faces })
    })
}

fn cube(size: f64, offset: Vector3<f64>) -> Mesh {
    let s = size;
    let mut mesh = Mesh::from_raw(
        &[
            [0.0, 0.0, 0.0],
            [s, 0.0, 0.0],
            [s, s, 0.0],
            [0.0, s, 0.0],
            [0.0, 0.0, s],
            [s, 0.0, s],
            [s, s, s],
            [0.0, s, s],
        ],
        &[
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ],
    );
    mesh.translate(offset);
    mesh
}

fn arb_offset() -> impl Strategy<Value = Vector3<f64>> {
    arb_position().prop_map(|[x, y, z]| Vector3::new(x, y, z))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_validation_invariants(mesh in arb_mesh(12, 24)) {
        let result = Validator::default().validate(&mesh);

        let has_error = result.issues.iter().any(|i| i.severity == Severity::Error);
        prop_assert_eq!(result.is_valid, !has_error);
        prop_assert_eq!(result.is_printable, result.is_watertight && result.is_valid);
        prop_assert_eq!(result.volume.is_some(), result.is_watertight);
        prop_assert_eq!(result.triangle_count, mesh.face_count());
        prop_assert_eq!(result.has_issue(IssueCode::NotWatertight), !result.is_watertight);
    }

    #[test]
    fn proptest_validation_is_deterministic(mesh in arb_mesh(10, 16)) {
        let validator = Validator::default();
        let a = validator.validate(&mesh);
        let b = validator.validate(&mesh);
        prop_assert_eq!(a.issues, b.issues);
        prop_assert_eq!(a.volume, b.volume);
    }

    #[test]
    fn proptest_repair_never_breaks_structure(mesh in arb_mesh(12, 20)) {
        let original = mesh.clone();
        let result = Repairer::default().repair(&mesh);

        prop_assert_eq!(&mesh, &original);
        prop_assert_eq!(result.log.len(), 4);
        prop_assert_eq!(result.was_modified, result.log.iter().any(RepairLog::modified));
        prop_assert!(validate_mesh_data(&result.mesh).is_ok());
    }

    #[test]
    fn proptest_cube_is_printable(size in 1.0..200.0f64, offset in arb_offset()) {
        let mesh = cube(size, offset);
        let result = Validator::default().validate(&mesh);

        prop_assert!(result.is_printable);
        let volume = result.volume.unwrap_or_default();
        prop_assert!((volume - size.powi(3)).abs() < 1e-6 * size.powi(3));
    }

    #[test]
    fn proptest_open_cube_repair_is_idempotent(size in 1.0..100.0f64, offset in arb_offset()) {
        let mut open = cube(size, offset);
        open.faces.drain(2..4);

        let first = Repairer::default().repair(&open);
        prop_assert!(Validator::default().validate(&first.mesh).is_watertight);

        let second = Repairer::default().repair(&first.mesh);
        prop_assert!(!second.was_modified);
        prop_assert_eq!(second.mesh, first.mesh);
    }

    #[test]
    fn proptest_binary_stl_preserves_face_count(mesh in arb_mesh(12, 24)) {
        let bytes = stl_to_bytes(&mesh, StlFormat::Binary, "soup").unwrap();
        prop_assert_eq!(bytes.len() as u64, StlFormat::Binary.estimate_size(mesh.face_count()));

        let reloaded = read_stl(Cursor::new(bytes)).unwrap();
        prop_assert_eq!(reloaded.face_count(), mesh.face_count());
        prop_assert!(reloaded.vertex_count() <= mesh.vertex_count());
    }

    #[test]
    fn proptest_binary_smaller_than_ascii(mesh in arb_mesh(8, 12)) {
        let binary = stl_to_bytes(&mesh, StlFormat::Binary, "soup").unwrap();
        let ascii = stl_to_bytes(&mesh, StlFormat::Ascii, "soup").unwrap();
        prop_assert!(binary.len() < ascii.len());
    }
}
