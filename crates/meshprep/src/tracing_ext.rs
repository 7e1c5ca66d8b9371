//! Structured logging for the preparation pipeline.
//!
//! Nothing here installs a subscriber; binaries choose one. Events use
//! `meshprep::*` targets so they can be filtered per stage:
//!
//! ```text
//! RUST_LOG=meshprep::timing=info,meshprep::repair=debug
//! ```
//!
//! | target                 | content                               |
//! |------------------------|---------------------------------------|
//! | `meshprep::timing`     | operation start/finish and duration   |
//! | `meshprep::mesh_state` | vertex/face counts and dimensions     |
//! | `meshprep::validation` | validation outcome                    |
//! | `meshprep::repair`     | repair outcome                        |
//! | `meshprep::export`     | export outcome                        |
//! | `meshprep::io`         | file reads and writes                 |

use std::path::Path;
use std::time::Instant;

use tracing::{Span, debug, info, warn};

use crate::Mesh;
use crate::export::ExportResult;
use crate::repair::RepairResult;
use crate::validate::ValidationResult;

/// Logs the duration of an operation when dropped.
///
/// ```rust,ignore
/// let _timer = OperationTimer::new("export");
/// // ... work ...
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("mesh_operation", operation = name);
        debug!(target: "meshprep::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Timer whose span also records the input mesh size.
    pub fn for_mesh(name: &'static str, mesh: &Mesh) -> Self {
        let span = tracing::info_span!(
            "mesh_operation",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count()
        );
        debug!(
            target: "meshprep::timing",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        debug!(
            target: "meshprep::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log vertex/face counts and dimensions at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let dims = mesh.dimensions();
    debug!(
        target: "meshprep::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

pub fn log_validation_result(result: &ValidationResult) {
    if result.is_valid {
        info!(
            target: "meshprep::validation",
            is_watertight = result.is_watertight,
            is_printable = result.is_printable,
            triangles = result.triangle_count,
            warnings = result.warning_count(),
            "Mesh validation passed"
        );
    } else {
        warn!(
            target: "meshprep::validation",
            is_watertight = result.is_watertight,
            errors = result.error_count(),
            warnings = result.warning_count(),
            "Mesh validation found errors"
        );
    }
}

pub fn log_repair_result(result: &RepairResult) {
    let failed = result.failures().count();
    if failed > 0 {
        warn!(
            target: "meshprep::repair",
            actions = result.log.len(),
            failed = failed,
            modified = result.was_modified,
            "Repair finished with failed actions"
        );
    } else {
        info!(
            target: "meshprep::repair",
            actions = result.log.len(),
            modified = result.was_modified,
            faces = result.mesh.face_count(),
            "Repair finished"
        );
    }
}

pub fn log_export_result(result: &ExportResult) {
    if result.success {
        info!(
            target: "meshprep::export",
            path = result.file_path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
            bytes = result.file_size_bytes,
            triangles = result.triangle_count,
            repaired = result.repairs_applied(),
            "Export completed"
        );
    } else {
        warn!(
            target: "meshprep::export",
            error = result.error_message.as_deref().unwrap_or("unknown"),
            "Export failed"
        );
    }
}

/// Log a file read or write.
pub fn log_io_operation(operation: &str, path: &Path, format: &str, success: bool) {
    if success {
        info!(
            target: "meshprep::io",
            operation = operation,
            path = path.display().to_string(),
            format = format,
            "I/O operation completed"
        );
    } else {
        warn!(
            target: "meshprep::io",
            operation = operation,
            path = path.display().to_string(),
            format = format,
            "I/O operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5.0);
    }

    #[test]
    fn test_log_empty_mesh_stats() {
        log_mesh_stats(&Mesh::new(), "test");
    }
}
