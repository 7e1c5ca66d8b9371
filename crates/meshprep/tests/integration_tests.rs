//! End-to-end tests over the public API: validate, repair, export.
//!
//! Run with: cargo test -p meshprep --test integration_tests

use approx::assert_relative_eq;
use meshprep::{
    Cuboid, Cylinder, ExportQuality, ExportSettings, Exporter, IssueCode, IssueDetails, Mesh,
    MeshSolid, Model, ModelMetadata, RepairAction, Repairer, Severity, StlFormat, Validator,
    ValidatorConfig, read_stl, stl_to_bytes,
};
use nalgebra::Vector3;
use std::io::Cursor;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

fn create_cube(size: f64) -> Mesh {
    let s = size;
    Mesh::from_raw(
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
            [0, 3, 2], // bottom
            [4, 5, 6],
            [4, 6, 7], // top
            [0, 1, 5],
            [0, 5, 4], // front
            [3, 7, 6],
            [3, 6, 2], // back
            [0, 4, 7],
            [0, 7, 3], // left
            [1, 2, 6],
            [1, 6, 5], // right
        ],
    )
}

fn create_open_top_cube(size: f64) -> Mesh {
    let mut mesh = create_cube(size);
    mesh.faces.drain(2..4);
    mesh
}

fn create_two_cubes() -> Mesh {
    let mut mesh = create_cube(10.0);
    let mut other = create_cube(10.0);
    other.translate(Vector3::new(50.0, 0.0, 0.0));
    mesh.append(&other);
    mesh
}

// =============================================================================
// Validation scenarios
// =============================================================================

#[test]
fn test_cube_is_printable() {
    let result = Validator::default().validate(&create_cube(10.0));

    assert!(result.is_watertight);
    assert!(result.is_valid);
    assert!(result.is_printable);
    assert_relative_eq!(result.volume.unwrap(), 1000.0, epsilon = 1e-6);
    assert_relative_eq!(result.surface_area, 600.0, epsilon = 1e-6);
    assert_eq!(result.error_count(), 0);
    assert_eq!(result.triangle_count, 12);
    assert_eq!(result.vertex_count, 8);
}

#[test]
fn test_two_cubes_are_rejected() {
    let result = Validator::default().validate(&create_two_cubes());

    assert!(!result.is_valid);
    assert!(!result.is_printable);
    let issue = result.issue(IssueCode::DisconnectedParts).unwrap();
    assert_eq!(issue.severity, Severity::Error);
    match &issue.details {
        Some(IssueDetails::Components {
            component_count,
            volumes_mm3,
        }) => {
            assert_eq!(*component_count, 2);
            assert_eq!(volumes_mm3.len(), 2);
            assert_relative_eq!(volumes_mm3[0], 1000.0, epsilon = 1e-6);
        }
        other => panic!("unexpected details: {:?}", other),
    }
}

#[test]
fn test_open_cube_not_watertight() {
    let result = Validator::default().validate(&create_open_top_cube(10.0));

    assert!(!result.is_watertight);
    assert!(result.volume.is_none());
    assert!(result.has_issue(IssueCode::NotWatertight));
    assert!(result.has_issue(IssueCode::BoundaryEdges));
}

#[test]
fn test_build_volume_overflow() {
    let config = ValidatorConfig::for_build_volume(100.0, 100.0, 100.0);
    let result = Validator::new(config).validate(&create_cube(150.0));

    let overflows: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.code == IssueCode::ExceedsBuildVolume)
        .collect();
    assert_eq!(overflows.len(), 3);
    assert!(overflows.iter().all(|i| i.severity == Severity::Warning));
    // Warnings alone keep the mesh valid
    assert!(result.is_valid);
}

// =============================================================================
// Repair scenarios
// =============================================================================

#[test]
fn test_repair_open_cube_to_watertight() {
    let open = create_open_top_cube(10.0);
    let result = Repairer::default().repair(&open);

    let actions: Vec<RepairAction> = result.log.iter().map(|e| e.action).collect();
    assert_eq!(actions, RepairAction::DEFAULT_PIPELINE.to_vec());
    assert!(result.was_modified);

    let after = Validator::default().validate(&result.mesh);
    assert!(after.is_watertight);
    assert!(after.is_printable);
    assert_relative_eq!(after.volume.unwrap(), 1000.0, epsilon = 1e-6);
}

#[test]
fn test_repair_idempotent() {
    let first = Repairer::default().repair(&create_open_top_cube(10.0));
    let second = Repairer::default().repair(&first.mesh);

    assert!(!second.was_modified);
    assert_eq!(second.mesh, first.mesh);
    assert!(second.summary().contains("No repairs needed"));
}

#[test]
fn test_repair_never_touches_input() {
    let mut mesh = create_cube(5.0);
    for face in &mut mesh.faces {
        face.swap(1, 2);
    }
    let snapshot = mesh.clone();
    let result = mesh.repair();

    assert!(result.was_modified);
    assert_eq!(mesh, snapshot);
    assert!(result.mesh.signed_volume() > 0.0);
}

#[test]
fn test_aggressive_without_backend_reports_missing_dependency() {
    let result = Repairer::default()
        .without_backend()
        .repair_aggressive(&create_open_top_cube(10.0));

    assert!(!result.was_modified);
    assert_eq!(result.log.len(), 1);
    assert!(!result.log[0].success);
    assert!(result.log[0].description.contains("meshfix"));
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn test_binary_round_trip_preserves_counts() {
    let mesh = create_cube(10.0);
    let bytes = stl_to_bytes(&mesh, StlFormat::Binary, "cube").unwrap();
    let reloaded = read_stl(Cursor::new(bytes)).unwrap();

    assert_eq!(reloaded.vertex_count(), mesh.vertex_count());
    assert_eq!(reloaded.face_count(), mesh.face_count());
    let (min, max) = reloaded.bounds().unwrap();
    assert_relative_eq!(min.x, 0.0);
    assert_relative_eq!(max.z, 10.0, epsilon = 1e-6);
}

#[test]
fn test_binary_smaller_than_ascii() {
    let mesh = create_two_cubes();
    let binary = stl_to_bytes(&mesh, StlFormat::Binary, "parts").unwrap();
    let ascii = stl_to_bytes(&mesh, StlFormat::Ascii, "parts").unwrap();

    assert_eq!(binary.len(), 84 + 50 * 24);
    assert!(binary.len() < ascii.len());
}

// =============================================================================
// Export scenarios
// =============================================================================

#[test]
fn test_quality_tolerances_are_monotonic() {
    let tolerances: Vec<f64> = ExportQuality::ALL
        .iter()
        .map(|q| ExportSettings::default().with_quality(*q).linear_tolerance())
        .collect();
    assert_eq!(tolerances, vec![0.1, 0.01, 0.001, 0.0001]);
    assert!(tolerances.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_ultra_produces_more_triangles_than_draft() {
    let dir = TempDir::new().unwrap();
    let model = Model::new(Cylinder::new(10.0, 20.0), ModelMetadata::named("peg"));
    let exporter = Exporter::default();

    let draft = exporter.export_with(
        &model,
        dir.path().join("draft.stl"),
        &ExportSettings::default().with_quality(ExportQuality::Draft),
    );
    let ultra = exporter.export_with(
        &model,
        dir.path().join("ultra.stl"),
        &ExportSettings::default().with_quality(ExportQuality::Ultra),
    );

    assert!(draft.success && ultra.success);
    assert!(ultra.triangle_count > draft.triangle_count);
    assert!(ultra.file_size_bytes > draft.file_size_bytes);
    assert!(draft.validation_result.unwrap().is_printable);
}

#[test]
fn test_export_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a/b/c/block.stl");
    let model = Model::from_solid(Cuboid::new(20.0, 10.0, 5.0));

    let settings = ExportSettings::default().with_format(StlFormat::Ascii);
    let result = Exporter::new(settings).export(&model, &path);

    assert!(result.success);
    assert!(path.exists());
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("solid block"));

    let reloaded = Mesh::load(&path).unwrap();
    assert_eq!(reloaded.face_count(), 12);
}

#[test]
fn test_export_tessellation_failure() {
    let dir = TempDir::new().unwrap();
    let model = Model::from_solid(Cylinder::new(0.0, 10.0));
    let result = Exporter::default().export(&model, dir.path().join("bad.stl"));

    assert!(!result.success);
    assert!(result.file_path.is_none());
    assert!(result.validation_result.is_none());
    assert!(result.repair_result.is_none());
    assert!(
        result
            .error_message
            .unwrap()
            .starts_with("Failed to convert model to mesh")
    );
}

#[test]
fn test_export_multi_body_proceeds_after_failed_repair() {
    let dir = TempDir::new().unwrap();
    let model = Model::from_solid(MeshSolid(create_two_cubes()));
    let result = Exporter::default().export(&model, dir.path().join("two.stl"));

    // Repair cannot join separate bodies; export continues with the best effort
    assert!(result.success);
    assert!(result.repair_result.is_some());
    assert!(!result.validation_result.as_ref().unwrap().is_valid);
    assert_eq!(result.triangle_count, 24);
    let summary = result.summary();
    assert!(summary.contains("Validation: FAILED"));
    assert!(summary.contains("Watertight: Yes"));
}
