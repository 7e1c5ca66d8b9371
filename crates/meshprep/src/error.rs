//! Errors that stop the pipeline from producing any result.
//!
//! Geometric defects are not errors: they are reported as
//! [`ValidationIssue`](crate::ValidationIssue)s and repair failures as
//! [`RepairLog`](crate::RepairLog) entries. `MeshError` covers unreadable
//! input, malformed mesh data, tessellation failures and failed writes.
//!
//! Every variant carries a stable code, rendered as `MESH-NNNN`:
//!
//! | range | area |
//! |-------|------|
//! | 1xxx  | reading and writing files |
//! | 2xxx  | mesh data (indices, coordinates, emptiness) |
//! | 3xxx  | repair steps |
//! | 4xxx  | formats and models |
//!
//! ```
//! use meshprep::{ErrorCode, MeshError};
//!
//! let err = MeshError::invalid_vertex_index(5, 100, 50);
//! assert_eq!(err.code(), ErrorCode::InvalidVertexIndex);
//! assert_eq!(err.code().to_string(), "MESH-2001");
//! ```

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

pub type MeshResult<T> = Result<T, MeshError>;

/// Stable numeric identifier of a [`MeshError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    IoRead = 1001,
    IoWrite = 1002,
    ParseError = 1003,

    InvalidVertexIndex = 2001,
    InvalidCoordinate = 2002,
    EmptyMesh = 2003,

    HoleFillFailed = 3002,
    WindingFailed = 3003,
    BackendUnavailable = 3007,

    UnsupportedFormat = 4001,
    TessellationFailed = 4003,
}

impl ErrorCode {
    pub fn number(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MESH-{:04}", self.number())
    }
}

/// What a user can do about an error, for CLIs and UIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check that a path exists and has the right permissions.
    CheckPath { path: PathBuf, writable: bool },
    /// Export the part again from the CAD tool, optionally as a given format.
    Reexport { format: Option<&'static str> },
    /// Convert the file to STL first.
    ConvertToStl,
    /// Run the repair pipeline, optionally in aggressive mode.
    Repair { aggressive: bool },
    /// Change a numeric setting.
    Adjust { setting: &'static str, hint: &'static str },
    /// Build with a cargo feature enabled.
    EnableFeature { feature: &'static str },
}

impl fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverySuggestion::CheckPath {
                path,
                writable: false,
            } => write!(f, "check that {} exists and is readable", path.display()),
            RecoverySuggestion::CheckPath {
                path,
                writable: true,
            } => write!(
                f,
                "check that the directory for {} is writable",
                path.display()
            ),
            RecoverySuggestion::Reexport { format: Some(format) } => {
                write!(f, "export the part again as {}", format)
            }
            RecoverySuggestion::Reexport { format: None } => {
                f.write_str("export the part again from the modelling tool")
            }
            RecoverySuggestion::ConvertToStl => f.write_str("convert the file to STL first"),
            RecoverySuggestion::Repair { aggressive: false } => {
                f.write_str("run `meshprep repair` on the mesh")
            }
            RecoverySuggestion::Repair { aggressive: true } => {
                f.write_str("run `meshprep repair --aggressive` on the mesh")
            }
            RecoverySuggestion::Adjust { setting, hint } => write!(f, "{}: {}", setting, hint),
            RecoverySuggestion::EnableFeature { feature } => {
                write!(f, "rebuild with the `{}` feature", feature)
            }
        }
    }
}

/// Where in the input an error was found.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshLocation {
    Vertex { index: usize },
    Face { index: usize },
    File { path: PathBuf },
}

impl fmt::Display for MeshLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshLocation::Vertex { index } => write!(f, "vertex #{}", index),
            MeshLocation::Face { index } => write!(f, "face #{}", index),
            MeshLocation::File { path } => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    #[error("failed to read mesh from {path}")]
    #[diagnostic(code(meshprep::io::read), help("Check the path and its permissions."))]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write mesh to {path}")]
    #[diagnostic(
        code(meshprep::io::write),
        help("The parent directory must be writable.")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse STL from {path}: {details}")]
    #[diagnostic(
        code(meshprep::io::parse),
        help("The file may be truncated. Binary STL needs 84 + 50 * n bytes.")
    )]
    ParseError { path: PathBuf, details: String },

    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(code(meshprep::io::format), help("Only .stl files can be loaded."))]
    UnsupportedFormat { extension: Option<String> },

    #[error("mesh is empty: {details}")]
    #[diagnostic(code(meshprep::data::empty), help("An STL needs at least one facet."))]
    EmptyMesh { details: String },

    #[error(
        "face {face_index} references vertex {vertex_index}, but the mesh has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(meshprep::data::index),
        help("Whatever produced this mesh emitted out-of-range indices.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    #[error("vertex {vertex_index} has non-finite {coordinate} = {value}")]
    #[diagnostic(
        code(meshprep::data::coordinate),
        help("NaN or infinite coordinates usually come from a failed export.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    #[error("tessellation failed: {details}")]
    #[diagnostic(
        code(meshprep::model::tessellation),
        help("Tolerances and dimensions must be positive and finite.")
    )]
    TessellationFailed { details: String },

    #[error("winding correction failed: {details}")]
    #[diagnostic(
        code(meshprep::repair::winding),
        help("Non-orientable surfaces (a Mobius strip, say) have no consistent outside.")
    )]
    WindingFailed { details: String },

    #[error("hole filling failed: {details}")]
    #[diagnostic(
        code(meshprep::repair::holes),
        help("Holes larger than `max_hole_edges` are skipped.")
    )]
    HoleFillFailed { details: String },

    #[error("comprehensive repair backend `{backend}` is not available")]
    #[diagnostic(
        code(meshprep::repair::backend),
        help("Enable the `meshfix` feature or register a backend.")
    )]
    BackendUnavailable { backend: &'static str },
}

impl MeshError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::IoRead { .. } => ErrorCode::IoRead,
            MeshError::IoWrite { .. } => ErrorCode::IoWrite,
            MeshError::ParseError { .. } => ErrorCode::ParseError,
            MeshError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            MeshError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            MeshError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            MeshError::TessellationFailed { .. } => ErrorCode::TessellationFailed,
            MeshError::WindingFailed { .. } => ErrorCode::WindingFailed,
            MeshError::HoleFillFailed { .. } => ErrorCode::HoleFillFailed,
            MeshError::BackendUnavailable { .. } => ErrorCode::BackendUnavailable,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            MeshError::IoRead { path, .. } => RecoverySuggestion::CheckPath {
                path: path.clone(),
                writable: false,
            },
            MeshError::IoWrite { path, .. } => RecoverySuggestion::CheckPath {
                path: path.clone(),
                writable: true,
            },
            MeshError::ParseError { .. } => RecoverySuggestion::Reexport {
                format: Some("binary STL"),
            },
            MeshError::UnsupportedFormat { .. } => RecoverySuggestion::ConvertToStl,
            MeshError::EmptyMesh { .. }
            | MeshError::InvalidVertexIndex { .. }
            | MeshError::InvalidCoordinate { .. } => RecoverySuggestion::Reexport { format: None },
            MeshError::TessellationFailed { .. } => RecoverySuggestion::Adjust {
                setting: "tolerance",
                hint: "use a positive value, or a coarser quality preset",
            },
            MeshError::WindingFailed { .. } => RecoverySuggestion::Repair { aggressive: true },
            MeshError::HoleFillFailed { .. } => RecoverySuggestion::Adjust {
                setting: "max_hole_edges",
                hint: "raise it to fill larger holes",
            },
            MeshError::BackendUnavailable { backend } => {
                RecoverySuggestion::EnableFeature { feature: backend }
            }
        }
    }

    pub fn location(&self) -> Option<MeshLocation> {
        match self {
            MeshError::InvalidVertexIndex { face_index, .. } => {
                Some(MeshLocation::Face { index: *face_index })
            }
            MeshError::InvalidCoordinate { vertex_index, .. } => Some(MeshLocation::Vertex {
                index: *vertex_index,
            }),
            MeshError::IoRead { path, .. }
            | MeshError::IoWrite { path, .. }
            | MeshError::ParseError { path, .. } => Some(MeshLocation::File { path: path.clone() }),
            _ => None,
        }
    }

    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoRead {
            path: path.into(),
            source,
        }
    }

    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoWrite {
            path: path.into(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn invalid_vertex_index(face_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        MeshError::InvalidVertexIndex {
            face_index,
            vertex_index,
            vertex_count,
        }
    }

    pub fn invalid_coordinate(vertex_index: usize, coordinate: &'static str, value: f64) -> Self {
        MeshError::InvalidCoordinate {
            vertex_index,
            coordinate,
            value,
        }
    }

    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }

    pub fn tessellation_failed(details: impl Into<String>) -> Self {
        MeshError::TessellationFailed {
            details: details.into(),
        }
    }

    pub fn winding_failed(details: impl Into<String>) -> Self {
        MeshError::WindingFailed {
            details: details.into(),
        }
    }

    pub fn hole_fill_failed(details: impl Into<String>) -> Self {
        MeshError::HoleFillFailed {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_render_with_prefix() {
        assert_eq!(ErrorCode::IoRead.to_string(), "MESH-1001");
        assert_eq!(
            MeshError::BackendUnavailable { backend: "meshfix" }
                .code()
                .to_string(),
            "MESH-3007"
        );
        assert_eq!(
            MeshError::tessellation_failed("x").code().number() / 1000,
            4
        );
    }

    #[test]
    fn test_backend_suggestion_names_feature() {
        let err = MeshError::BackendUnavailable { backend: "meshfix" };
        assert_eq!(
            err.recovery_suggestion(),
            RecoverySuggestion::EnableFeature { feature: "meshfix" }
        );
        assert_eq!(
            err.to_string(),
            "comprehensive repair backend `meshfix` is not available"
        );
    }

    #[test]
    fn test_winding_suggests_aggressive_repair() {
        let err = MeshError::winding_failed("conflict at face 3");
        assert_eq!(
            err.recovery_suggestion().to_string(),
            "run `meshprep repair --aggressive` on the mesh"
        );
    }

    #[test]
    fn test_location() {
        let err = MeshError::invalid_vertex_index(5, 100, 50);
        assert_eq!(err.location(), Some(MeshLocation::Face { index: 5 }));
        assert_eq!(
            err.to_string(),
            "face 5 references vertex 100, but the mesh has 50 vertices"
        );
        assert!(MeshError::hole_fill_failed("x").location().is_none());

        let err = MeshError::io_read("part.stl", std::io::Error::other("denied"));
        assert_eq!(err.location().map(|l| l.to_string()), Some("part.stl".into()));
    }
}
