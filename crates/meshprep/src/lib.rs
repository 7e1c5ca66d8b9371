//! Validation, repair and STL export of triangle meshes for 3D printing.
//!
//! The crate takes a triangle mesh, either loaded from STL or tessellated from
//! a solid, and prepares it for a slicer:
//!
//! - **Validation**: watertightness, open boundaries, degenerate faces,
//!   winding, disconnected parts, volume and build-volume limits
//! - **Repair**: an ordered pipeline of vertex merging, degenerate removal,
//!   normal fixing and hole filling, plus an optional aggressive mode
//! - **Export**: tessellate at a quality preset, validate, repair once if
//!   needed, write binary or ASCII STL
//!
//! # Units
//!
//! **All lengths are millimeters**, areas mm^2 and volumes mm^3. Default
//! thresholds (0.8 mm walls, 300 mm build volume, 1e-8 merge distance) assume
//! this.
//!
//! Faces wind **counter-clockwise viewed from outside**, so normals point
//! outward by the right-hand rule.
//!
//! # Quick Start
//!
//! ```no_run
//! use meshprep::Mesh;
//!
//! let mesh = Mesh::load("part.stl").unwrap();
//!
//! let report = mesh.validate();
//! println!("{}", report);
//!
//! if !report.is_printable {
//!     let repaired = mesh.repair();
//!     println!("{}", repaired);
//!     repaired.mesh.save("part_repaired.stl").unwrap();
//! }
//! ```
//!
//! # Exporting a model
//!
//! ```no_run
//! use meshprep::{Cylinder, ExportQuality, ExportSettings, Exporter, Model, ModelMetadata};
//!
//! let model = Model::new(Cylinder::new(10.0, 20.0), ModelMetadata::named("peg"));
//! let exporter = Exporter::new(ExportSettings::default().with_quality(ExportQuality::High));
//!
//! let result = exporter.export(&model, "out/peg.stl");
//! println!("{}", result);
//! assert!(result.success);
//! ```
//!
//! # Errors
//!
//! Geometric defects are reported as [`ValidationIssue`]s and failed repair
//! steps as [`RepairLog`] entries; neither is an error. [`MeshError`] is
//! reserved for problems that prevent any result at all: unreadable files,
//! out-of-range indices, failed tessellation or writes.
//!
//! # Features
//!
//! - `serde` (default): `Serialize` for reports and settings
//! - `meshfix` (default): the built-in backend for
//!   [`Repairer::repair_aggressive`]

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod types;

pub mod adjacency;
pub mod backend;
pub mod components;
pub mod export;
pub mod holes;
pub mod io;
pub mod model;
pub mod repair;
pub mod solid;
pub mod tracing_ext;
pub mod validate;
pub mod winding;

pub use error::{ErrorCode, MeshError, MeshLocation, MeshResult, RecoverySuggestion};
pub use types::{Mesh, Triangle, Vertex};

pub use adjacency::MeshAdjacency;
pub use backend::ComprehensiveRepair;
#[cfg(feature = "meshfix")]
pub use backend::MeshFix;
pub use components::{
    ComponentAnalysis, component_volumes, find_connected_components, keep_largest_component,
    split_into_components,
};
pub use export::{ExportQuality, ExportResult, ExportSettings, Exporter, format_size};
pub use holes::{BoundaryLoop, HoleFillOutcome, detect_holes, fill_holes};
pub use io::{StlFormat, load_stl, read_stl, save_stl, stl_to_bytes, write_stl};
pub use model::{Dimensions, Model, ModelInfo, ModelMetadata};
pub use repair::{RepairAction, RepairConfig, RepairLog, RepairResult, Repairer, repair_mesh};
pub use solid::{Cuboid, Cylinder, MeshSolid, Tessellate};
pub use validate::{
    Axis, BoundingBox, IssueCode, IssueDetails, ReportIssue, Severity, ValidationIssue,
    ValidationReport, ValidationResult, Validator, ValidatorConfig, validate_mesh,
    validate_mesh_data,
};
pub use winding::{WindingFix, WindingReport, check_winding, fix_winding_order};

impl Mesh {
    /// Load a mesh from an STL file (binary or ASCII).
    pub fn load(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        io::load_stl(path.as_ref())
    }

    /// Save as binary STL. Returns the file size in bytes.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> MeshResult<u64> {
        io::save_stl(self, path.as_ref(), StlFormat::Binary)
    }

    /// Save as ASCII STL. Returns the file size in bytes.
    pub fn save_ascii(&self, path: impl AsRef<std::path::Path>) -> MeshResult<u64> {
        io::save_stl(self, path.as_ref(), StlFormat::Ascii)
    }

    /// Validate with default printer limits.
    pub fn validate(&self) -> ValidationResult {
        Validator::default().validate(self)
    }

    /// Run the standard repair pipeline on a copy of this mesh.
    ///
    /// ```
    /// use meshprep::Mesh;
    ///
    /// let result = Mesh::new().repair();
    /// assert!(!result.was_modified);
    /// ```
    pub fn repair(&self) -> RepairResult {
        Repairer::default().repair(self)
    }

    /// Make face winding consistent and outward.
    pub fn fix_winding(&mut self) -> MeshResult<WindingFix> {
        winding::fix_winding_order(self)
    }

    /// Fill holes with at most `max_edges` boundary edges.
    pub fn fill_holes(&mut self, max_edges: usize) -> MeshResult<HoleFillOutcome> {
        holes::fill_holes(self, max_edges)
    }

    pub fn find_components(&self) -> ComponentAnalysis {
        components::find_connected_components(self)
    }

    pub fn split_components(&self) -> Vec<Mesh> {
        components::split_into_components(self)
    }

    /// Keep only the largest connected component.
    /// Returns the number of components removed.
    pub fn keep_largest_component(&mut self) -> usize {
        components::keep_largest_component(self)
    }

    /// Whether every edge is shared by exactly two opposite faces.
    pub fn is_watertight(&self) -> bool {
        MeshAdjacency::build(&self.faces).is_watertight()
    }
}
