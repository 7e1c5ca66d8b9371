//! STL reading and writing.
//!
//! Reading goes through `stl_io`, which accepts both binary and ASCII files
//! and merges identical corner positions into shared vertices. Binary output
//! also uses `stl_io`; ASCII output is written directly.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::log_io_operation;
use crate::validate::validate_mesh_data;
use crate::{Mesh, Triangle, Vertex};

/// Size of the binary STL header plus triangle count.
pub const BINARY_HEADER_BYTES: u64 = 84;
/// Size of one binary STL facet record.
pub const BINARY_FACET_BYTES: u64 = 50;
/// Rough size of one ASCII STL facet.
pub const ASCII_FACET_BYTES: u64 = 200;

/// STL encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StlFormat {
    #[default]
    Binary,
    Ascii,
}

impl StlFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StlFormat::Binary => "binary",
            StlFormat::Ascii => "ascii",
        }
    }

    /// Expected file size for `triangles` facets.
    ///
    /// Exact for binary, an approximation for ASCII.
    pub fn estimate_size(&self, triangles: usize) -> u64 {
        match self {
            StlFormat::Binary => BINARY_HEADER_BYTES + BINARY_FACET_BYTES * triangles as u64,
            StlFormat::Ascii => ASCII_FACET_BYTES * triangles as u64,
        }
    }
}

impl std::fmt::Display for StlFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_stl(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("stl"))
}

/// Load a mesh from an `.stl` file.
///
/// # Errors
///
/// Fails if the extension is not `.stl`, the file cannot be read or parsed,
/// the mesh is empty, or it references vertices that do not exist.
pub fn load_stl(path: &Path) -> MeshResult<Mesh> {
    if !is_stl(path) {
        return Err(MeshError::UnsupportedFormat {
            extension: path.extension().and_then(|e| e.to_str()).map(String::from),
        });
    }

    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let result = read_stl_from(BufReader::new(file), path);
    log_io_operation("load", path, "stl", result.is_ok());
    result
}

/// Parse binary or ASCII STL from any seekable reader.
///
/// ```
/// use std::io::Cursor;
/// use meshprep::io::read_stl;
///
/// let data = b"solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid t\n";
/// let mesh = read_stl(Cursor::new(&data[..])).unwrap();
/// assert_eq!(mesh.face_count(), 1);
/// ```
pub fn read_stl<R: Read + Seek>(reader: R) -> MeshResult<Mesh> {
    read_stl_from(reader, Path::new("<stream>"))
}

fn read_stl_from<R: Read + Seek>(mut reader: R, source: &Path) -> MeshResult<Mesh> {
    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| MeshError::parse_error(source, e.to_string()))?;

    debug!(
        "STL contains {} vertices, {} triangles",
        stl.vertices.len(),
        stl.faces.len()
    );

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    mesh.vertices.extend(
        stl.vertices
            .iter()
            .map(|v| Vertex::from_coords(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64)),
    );
    // Collapsed facets are kept so validation can report them.
    mesh.faces.extend(stl.faces.iter().map(|face| {
        [
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        ]
    }));

    if mesh.is_empty() {
        return Err(MeshError::empty_mesh(format!(
            "{} has no triangles",
            source.display()
        )));
    }
    validate_mesh_data(&mesh)?;

    let dims = mesh.dimensions();
    info!(
        "Loaded mesh: {} vertices, {} faces ({:.1} x {:.1} x {:.1})",
        mesh.vertex_count(),
        mesh.face_count(),
        dims.x,
        dims.y,
        dims.z
    );
    if dims.x.max(dims.y).max(dims.z) < 0.1 {
        warn!("Mesh is smaller than 0.1 mm across; it may need scaling");
    }

    Ok(mesh)
}

/// Encode `mesh` as STL into `writer`.
///
/// `name` is used for the ASCII `solid` line and ignored for binary.
pub fn write_stl<W: Write>(
    mesh: &Mesh,
    writer: &mut W,
    format: StlFormat,
    name: &str,
) -> std::io::Result<()> {
    match format {
        StlFormat::Binary => write_binary(mesh, writer),
        StlFormat::Ascii => write_ascii(mesh, writer, name),
    }
}

fn facet_normal(tri: &Triangle) -> [f32; 3] {
    tri.normal()
        .map(|n| [n.x as f32, n.y as f32, n.z as f32])
        .unwrap_or([0.0; 3])
}

fn write_binary<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| stl_io::Triangle {
            normal: stl_io::Normal::new(facet_normal(&tri)),
            vertices: [tri.v0, tri.v1, tri.v2]
                .map(|p| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])),
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())
}

fn write_ascii<W: Write>(mesh: &Mesh, writer: &mut W, name: &str) -> std::io::Result<()> {
    writeln!(writer, "solid {}", name)?;
    for tri in mesh.triangles() {
        let [nx, ny, nz] = facet_normal(&tri);
        writeln!(writer, "  facet normal {:.6e} {:.6e} {:.6e}", nx, ny, nz)?;
        writeln!(writer, "    outer loop")?;
        for p in [tri.v0, tri.v1, tri.v2] {
            writeln!(
                writer,
                "      vertex {:.6e} {:.6e} {:.6e}",
                p.x as f32, p.y as f32, p.z as f32
            )?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)?;
    Ok(())
}

/// Encode `mesh` as STL in memory.
pub fn stl_to_bytes(mesh: &Mesh, format: StlFormat, name: &str) -> MeshResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(format.estimate_size(mesh.face_count()) as usize);
    write_stl(mesh, &mut buffer, format, name)
        .map_err(|e| MeshError::io_write(PathBuf::from("<memory>"), e))?;
    Ok(buffer)
}

/// Write `mesh` to `path`, creating parent directories as needed.
///
/// Returns the size of the written file in bytes.
pub fn save_stl(mesh: &Mesh, path: &Path, format: StlFormat) -> MeshResult<u64> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| MeshError::io_write(path, e))?;
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh");

    let result = File::create(path)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_stl(mesh, &mut writer, format, name)?;
            writer.flush()
        })
        .and_then(|()| fs::metadata(path))
        .map(|meta| meta.len())
        .map_err(|e| MeshError::io_write(path, e));

    log_io_operation("save", path, format.as_str(), result.is_ok());
    if let Ok(size) = result {
        info!(
            "Saved {} triangles to {:?} ({} bytes, {})",
            mesh.face_count(),
            path,
            size,
            format
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::cube;
    use nalgebra::Point3;
    use std::io::Cursor;
    use tempfile::{NamedTempFile, TempDir};

    fn create_test_stl() -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".stl").unwrap();
        writeln!(file, "solid test").unwrap();
        writeln!(file, "  facet normal 0 0 1").unwrap();
        writeln!(file, "    outer loop").unwrap();
        writeln!(file, "      vertex 0 0 0").unwrap();
        writeln!(file, "      vertex 100 0 0").unwrap();
        writeln!(file, "      vertex 0 100 0").unwrap();
        writeln!(file, "    endloop").unwrap();
        writeln!(file, "  endfacet").unwrap();
        writeln!(file, "endsolid test").unwrap();
        file
    }

    #[test]
    fn test_load_ascii_stl() {
        let file = create_test_stl();
        let mesh = load_stl(file.path()).expect("should load");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);

        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(100.0, 100.0, 0.0));
    }

    #[test]
    fn test_rejects_other_extensions() {
        let err = load_stl(Path::new("model.obj")).unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_stl(Path::new("/nonexistent/model.stl")).unwrap_err();
        assert!(matches!(err, MeshError::IoRead { .. }));
    }

    #[test]
    fn test_binary_size_is_exact() {
        let mesh = cube(10.0);
        let bytes = stl_to_bytes(&mesh, StlFormat::Binary, "cube").unwrap();
        assert_eq!(bytes.len() as u64, StlFormat::Binary.estimate_size(12));
        assert_eq!(bytes.len(), 84 + 50 * 12);
    }

    #[test]
    fn test_ascii_layout() {
        let bytes = stl_to_bytes(&cube(1.0), StlFormat::Ascii, "cube").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("solid cube\n"));
        assert!(text.trim_end().ends_with("endsolid cube"));
        assert_eq!(text.matches("facet normal").count(), 12);
        assert_eq!(text.matches("vertex ").count(), 36);
    }

    #[test]
    fn test_round_trip_both_formats() {
        let mesh = cube(10.0);
        for format in [StlFormat::Binary, StlFormat::Ascii] {
            let bytes = stl_to_bytes(&mesh, format, "cube").unwrap();
            let reloaded = read_stl(Cursor::new(&bytes)).unwrap();
            assert_eq!(reloaded.vertex_count(), 8, "{format}");
            assert_eq!(reloaded.face_count(), 12, "{format}");
            assert!((reloaded.volume() - 1000.0).abs() < 1e-3, "{format}");
        }
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/cube.stl");
        let size = save_stl(&cube(1.0), &path, StlFormat::Binary).unwrap();
        assert_eq!(size, 684);
        assert!(path.exists());
    }

    #[test]
    fn test_empty_stl_is_rejected() {
        let bytes = stl_to_bytes(&Mesh::new(), StlFormat::Binary, "empty").unwrap();
        let err = read_stl(Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, MeshError::EmptyMesh { .. }));
    }
}
