//! Mesh validation for 3D printing.
//!
//! [`Validator`] runs a fixed battery of independent checks and collects
//! every finding as a [`ValidationIssue`]. Geometric defects are data, not
//! errors: validation itself never fails. The only fallible entry point here
//! is [`validate_mesh_data`], which guards the structural preconditions
//! (indices in range, finite coordinates) every other operation relies on.

use std::fmt;

use tracing::{debug, warn};

use crate::adjacency::MeshAdjacency;
use crate::components::{component_volumes, connected_components};
use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::{OperationTimer, log_validation_result};
use crate::types::Mesh;
use crate::winding::check_winding_with;

/// Faces with an area below this (mm^2) count as degenerate.
pub const DEGENERATE_AREA_EPSILON: f64 = 1e-10;

/// Thresholds for the printability checks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidatorConfig {
    /// Minimum wall thickness in mm, used by the thin-wall heuristic.
    pub min_wall_thickness: f64,
    /// Minimum enclosed volume in mm^3.
    pub min_volume: f64,
    /// Printer build volume per axis in mm.
    pub max_dimensions: [f64; 3],
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_wall_thickness: 0.8,
            min_volume: 0.001,
            max_dimensions: [300.0, 300.0, 300.0],
        }
    }
}

impl ValidatorConfig {
    /// Default thresholds with a specific printer build volume.
    pub fn for_build_volume(x: f64, y: f64, z: f64) -> Self {
        Self {
            max_dimensions: [x, y, z],
            ..Self::default()
        }
    }
}

/// How serious a validation issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Severity {
    /// Informational, no action needed.
    Info,
    /// Warning, the print may have problems.
    Warning,
    /// Error, the mesh is not printable as a single part.
    Error,
}

impl Severity {
    /// Upper-case label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// Single-character marker used in summaries.
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "i",
            Severity::Warning => "!",
            Severity::Error => "X",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a validation check's finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum IssueCode {
    NotWatertight,
    BoundaryEdges,
    DegenerateFaces,
    InconsistentWinding,
    DisconnectedParts,
    SmallVolume,
    ExceedsBuildVolume,
    PossiblyThin,
}

impl IssueCode {
    /// The stable string form, e.g. `NOT_WATERTIGHT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::NotWatertight => "NOT_WATERTIGHT",
            IssueCode::BoundaryEdges => "BOUNDARY_EDGES",
            IssueCode::DegenerateFaces => "DEGENERATE_FACES",
            IssueCode::InconsistentWinding => "INCONSISTENT_WINDING",
            IssueCode::DisconnectedParts => "DISCONNECTED_PARTS",
            IssueCode::SmallVolume => "SMALL_VOLUME",
            IssueCode::ExceedsBuildVolume => "EXCEEDS_BUILD_VOLUME",
            IssueCode::PossiblyThin => "POSSIBLY_THIN",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        })
    }
}

/// Structured payload attached to an issue. Serializes as a flat map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum IssueDetails {
    Watertight {
        is_watertight: bool,
    },
    BoundaryEdges {
        boundary_edge_count: usize,
    },
    DegenerateFaces {
        degenerate_count: usize,
    },
    Winding {
        inconsistent_edge_count: usize,
    },
    Components {
        component_count: usize,
        volumes_mm3: Vec<f64>,
    },
    Volume {
        volume: f64,
        min_volume: f64,
    },
    BuildVolume {
        axis: Axis,
        size: f64,
        max_size: f64,
    },
    Thickness {
        avg_thickness: f64,
    },
}

/// A single finding from validation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub details: Option<IssueDetails>,
}

impl ValidationIssue {
    fn new(severity: Severity, code: IssueCode, message: String, details: IssueDetails) -> Self {
        Self {
            severity,
            code,
            message,
            details: Some(details),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Axis-aligned bounds of a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Bounds of `mesh`, or all zeros for a mesh without vertices.
    pub fn of(mesh: &Mesh) -> Self {
        mesh.bounds()
            .map(|(min, max)| Self {
                min: [min.x, min.y, min.z],
                max: [max.x, max.y, max.z],
            })
            .unwrap_or_default()
    }

    /// Extent along each axis.
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Complete validation result for a mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationResult {
    /// No issue of severity [`Severity::Error`].
    pub is_valid: bool,
    pub is_watertight: bool,
    /// Watertight and valid.
    pub is_printable: bool,
    /// Enclosed volume in mm^3; only present for watertight meshes.
    pub volume: Option<f64>,
    pub surface_area: f64,
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub bounding_box: BoundingBox,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Number of error-level issues.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Issues at or above `severity`, in report order.
    pub fn issues_at_least(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity >= severity)
    }

    /// Find the first issue with a given code.
    pub fn issue(&self, code: IssueCode) -> Option<&ValidationIssue> {
        self.issues.iter().find(|i| i.code == code)
    }

    /// Check whether an issue with `code` was reported.
    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issue(code).is_some()
    }

    /// Human-readable summary block.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// The compact report shape consumed by tooling.
    pub fn report(&self) -> ValidationReport {
        ValidationReport {
            is_valid: self.is_valid,
            is_watertight: self.is_watertight,
            is_printable: self.is_printable,
            triangle_count: self.triangle_count,
            vertex_count: self.vertex_count,
            volume: self.volume,
            surface_area: self.surface_area,
            issues: self
                .issues
                .iter()
                .map(|i| ReportIssue {
                    severity: i.severity,
                    code: i.code,
                    message: i.message.clone(),
                })
                .collect(),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Format an integer with comma thousands separators.
pub(crate) fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Mesh Validation Summary ===")?;
        writeln!(f, "Valid: {}", yes_no(self.is_valid))?;
        writeln!(f, "Watertight: {}", yes_no(self.is_watertight))?;
        writeln!(f, "Printable: {}", yes_no(self.is_printable))?;
        writeln!(f, "Triangles: {}", group_thousands(self.triangle_count))?;
        writeln!(f, "Vertices: {}", group_thousands(self.vertex_count))?;
        if let Some(volume) = self.volume {
            writeln!(f, "Volume: {:.2} mm^3", volume)?;
        }
        writeln!(f, "Surface Area: {:.2} mm^2", self.surface_area)?;
        let [x, y, z] = self.bounding_box.size();
        write!(f, "Dimensions: {:.2} x {:.2} x {:.2} mm", x, y, z)?;

        if !self.issues.is_empty() {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "Issues Found: {}", self.issues.len())?;
            for issue in &self.issues {
                write!(f, "\n  [{}] {}", issue.severity.icon(), issue.message)?;
            }
        }
        Ok(())
    }
}

/// One issue in a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReportIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
}

/// Machine-readable validation report.
///
/// Serializes as
/// `{is_valid, is_watertight, is_printable, triangle_count, vertex_count, volume, surface_area, issues: [{severity, code, message}]}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationReport {
    pub is_valid: bool,
    pub is_watertight: bool,
    pub is_printable: bool,
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub volume: Option<f64>,
    pub surface_area: f64,
    pub issues: Vec<ReportIssue>,
}

/// Runs the printability checks against a configuration.
///
/// ```
/// use meshprep::{Mesh, Validator, ValidatorConfig};
///
/// let validator = Validator::new(ValidatorConfig::for_build_volume(220.0, 220.0, 250.0));
/// let result = validator.validate(&Mesh::new());
/// assert!(!result.is_valid);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with the given thresholds.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// The thresholds in use.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a mesh.
    ///
    /// Pure and deterministic. Every check runs regardless of earlier
    /// findings. Faces must reference existing vertices; see
    /// [`validate_mesh_data`].
    pub fn validate(&self, mesh: &Mesh) -> ValidationResult {
        let _timer = OperationTimer::for_mesh("validate", mesh);
        let config = &self.config;
        let adjacency = MeshAdjacency::build(&mesh.faces);
        let mut issues = Vec::new();

        // Watertightness
        let is_watertight = adjacency.is_watertight();
        if !is_watertight {
            issues.push(ValidationIssue::new(
                Severity::Error,
                IssueCode::NotWatertight,
                "Mesh is not watertight (has holes or non-manifold edges)".to_string(),
                IssueDetails::Watertight {
                    is_watertight: false,
                },
            ));
        }

        // Open boundary
        let boundary_edge_count = adjacency.boundary_edge_count();
        if boundary_edge_count > 0 {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                IssueCode::BoundaryEdges,
                format!(
                    "Found {} boundary edges (indicates holes)",
                    boundary_edge_count
                ),
                IssueDetails::BoundaryEdges {
                    boundary_edge_count,
                },
            ));
        }

        // Degenerate faces
        let degenerate_count = mesh
            .triangles()
            .filter(|t| t.is_degenerate(DEGENERATE_AREA_EPSILON))
            .count();
        if degenerate_count > 0 {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                IssueCode::DegenerateFaces,
                format!(
                    "Found {} degenerate (zero-area) triangles",
                    degenerate_count
                ),
                IssueDetails::DegenerateFaces { degenerate_count },
            ));
        }

        // Winding
        let winding = check_winding_with(&mesh.faces, &adjacency);
        if !winding.is_consistent() {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                IssueCode::InconsistentWinding,
                "Face winding is not consistent (normals may be inverted)".to_string(),
                IssueDetails::Winding {
                    inconsistent_edge_count: winding.inconsistent_edges,
                },
            ));
        }

        // Disconnected bodies
        let components = connected_components(mesh.faces.len(), &adjacency);
        if components.component_count > 1 {
            let volumes_mm3 = component_volumes(mesh, &components);
            issues.push(ValidationIssue::new(
                Severity::Error,
                IssueCode::DisconnectedParts,
                format!(
                    "Mesh has {} disconnected parts",
                    components.component_count
                ),
                IssueDetails::Components {
                    component_count: components.component_count,
                    volumes_mm3,
                },
            ));
        }

        let volume = is_watertight.then(|| mesh.volume());
        let surface_area = mesh.surface_area();
        let bounding_box = BoundingBox::of(mesh);

        // Minimum volume
        if let Some(volume) = volume
            && volume < config.min_volume
        {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                IssueCode::SmallVolume,
                format!(
                    "Volume ({:.6} mm^3) is below minimum ({} mm^3)",
                    volume, config.min_volume
                ),
                IssueDetails::Volume {
                    volume,
                    min_volume: config.min_volume,
                },
            ));
        }

        // Build volume
        for ((axis, size), max_size) in Axis::ALL
            .into_iter()
            .zip(bounding_box.size())
            .zip(config.max_dimensions)
        {
            if size > max_size {
                issues.push(ValidationIssue::new(
                    Severity::Warning,
                    IssueCode::ExceedsBuildVolume,
                    format!(
                        "{} dimension ({:.1}mm) exceeds max build size ({}mm)",
                        axis, size, max_size
                    ),
                    IssueDetails::BuildVolume {
                        axis,
                        size,
                        max_size,
                    },
                ));
            }
        }

        // Thin walls: volume / area is a rough average thickness.
        if let Some(volume) = volume
            && surface_area > 0.0
        {
            let avg_thickness = volume / surface_area;
            if avg_thickness < config.min_wall_thickness / 10.0 {
                issues.push(ValidationIssue::new(
                    Severity::Info,
                    IssueCode::PossiblyThin,
                    format!(
                        "Model may have thin walls (avg thickness estimate: {:.3}mm)",
                        avg_thickness
                    ),
                    IssueDetails::Thickness { avg_thickness },
                ));
            }
        }

        let is_valid = !issues.iter().any(|i| i.severity == Severity::Error);
        let result = ValidationResult {
            is_valid,
            is_watertight,
            is_printable: is_watertight && is_valid,
            volume,
            surface_area,
            triangle_count: mesh.face_count(),
            vertex_count: mesh.vertex_count(),
            bounding_box,
            issues,
        };

        debug!(
            "Validation checks: watertight={}, boundary_edges={}, degenerate={}, inconsistent_edges={}, components={}",
            is_watertight,
            boundary_edge_count,
            degenerate_count,
            winding.inconsistent_edges,
            components.component_count
        );
        log_validation_result(&result);

        result
    }
}

/// Validate a mesh with the given thresholds.
pub fn validate_mesh(mesh: &Mesh, config: &ValidatorConfig) -> ValidationResult {
    Validator::new(config.clone()).validate(mesh)
}

/// Check the structural preconditions of a mesh.
///
/// Every face index must reference an existing vertex and every coordinate
/// must be finite.
///
/// # Errors
///
/// Returns the first [`MeshError::InvalidCoordinate`] or
/// [`MeshError::InvalidVertexIndex`] encountered.
pub fn validate_mesh_data(mesh: &Mesh) -> MeshResult<()> {
    for (vertex_idx, vertex) in mesh.vertices.iter().enumerate() {
        let p = vertex.position;
        for (coord_name, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
            if !value.is_finite() {
                warn!("Vertex {} has non-finite {} coordinate", vertex_idx, coord_name);
                return Err(MeshError::invalid_coordinate(vertex_idx, coord_name, value));
            }
        }
    }

    let vertex_count = mesh.vertices.len();
    for (face_idx, face) in mesh.faces.iter().enumerate() {
        if let Some(&bad) = face.iter().find(|&&v| v as usize >= vertex_count) {
            warn!("Face {} references missing vertex {}", face_idx, bad);
            return Err(MeshError::invalid_vertex_index(face_idx, bad, vertex_count));
        }
    }

    debug!("Mesh data validation passed");
    Ok(())
}
