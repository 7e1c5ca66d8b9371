//! Indexed triangle meshes in millimeters.

use nalgebra::{Point3, Vector3};

/// A vertex in the mesh.
///
/// Coordinates are in millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Position in mm.
    pub position: Point3<f64>,

    /// Unit normal vector, if one was computed or loaded.
    pub normal: Option<Vector3<f64>>,
}

impl Vertex {
    /// A vertex with no stored normal.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
        }
    }

    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// Shared vertices plus faces indexing into them.
///
/// Faces are wound counter-clockwise when viewed from outside, so normals
/// point outward by the right-hand rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,

    /// Vertex indices per triangle.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Build a mesh from raw position triples and index triples.
    ///
    /// Indices are not checked here; run
    /// [`validate_mesh_data`](crate::validate_mesh_data) on untrusted input.
    pub fn from_raw(positions: &[[f64; 3]], faces: &[[u32; 3]]) -> Self {
        Self {
            vertices: positions
                .iter()
                .map(|&[x, y, z]| Vertex::from_coords(x, y, z))
                .collect(),
            faces: faces.to_vec(),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to print: no vertices or no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Axis-aligned `(min, max)` corners, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let (min, max) = self.vertices[1..].iter().fold((first, first), |(lo, hi), v| {
            let p = v.position;
            (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        });
        Some((min, max))
    }

    /// Extent along each axis, or zero for a mesh without vertices.
    pub fn dimensions(&self) -> Vector3<f64> {
        self.bounds()
            .map(|(min, max)| max - min)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Faces resolved to positions.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&face| self.face_triangle(face))
    }

    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        self.faces.get(face_idx).map(|&face| self.face_triangle(face))
    }

    #[inline]
    fn face_triangle(&self, [i0, i1, i2]: [u32; 3]) -> Triangle {
        Triangle {
            v0: self.vertices[i0 as usize].position,
            v1: self.vertices[i1 as usize].position,
            v2: self.vertices[i2 as usize].position,
        }
    }

    /// Translate all vertices by an offset.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Scale all vertices uniformly about the origin.
    pub fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            vertex.position.coords *= factor;
        }
    }

    /// Append another mesh, offsetting its face indices.
    ///
    /// The two meshes stay disconnected; nothing is welded.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().cloned());
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|&[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    /// Signed volume enclosed by the surface (divergence theorem).
    ///
    /// Positive for outward-facing closed meshes, negative for inside-out
    /// ones. Meaningless for open meshes.
    pub fn signed_volume(&self) -> f64 {
        signed_volume_of(self, self.faces.iter())
    }

    /// Absolute enclosed volume.
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Check whether face normals point inward (negative signed volume).
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume() < 0.0
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }

    /// Center of mass assuming uniform density.
    ///
    /// Uses tetrahedra against the origin for closed meshes and falls back to
    /// the area-weighted surface centroid when the enclosed volume vanishes.
    pub fn center_of_mass(&self) -> Option<Point3<f64>> {
        if self.faces.is_empty() {
            return None;
        }

        let mut weighted = Vector3::zeros();
        let mut volume = 0.0;
        for tri in self.triangles() {
            let v = tri.v0.coords.dot(&tri.v1.coords.cross(&tri.v2.coords)) / 6.0;
            weighted += (tri.v0.coords + tri.v1.coords + tri.v2.coords) * (v / 4.0);
            volume += v;
        }

        if volume.abs() > 1e-12 {
            return Some(Point3::from(weighted / volume));
        }

        let mut area_sum = 0.0;
        let mut centroid = Vector3::zeros();
        for tri in self.triangles() {
            let area = tri.area();
            centroid += tri.centroid().coords * area;
            area_sum += area;
        }
        (area_sum > 0.0).then(|| Point3::from(centroid / area_sum))
    }
}

/// Signed volume of a subset of a mesh's faces.
pub(crate) fn signed_volume_of<'a>(
    mesh: &Mesh,
    faces: impl Iterator<Item = &'a [u32; 3]>,
) -> f64 {
    let mut volume = 0.0;
    for &[i0, i1, i2] in faces {
        let v0 = mesh.vertices[i0 as usize].position.coords;
        let v1 = mesh.vertices[i1 as usize].position.coords;
        let v2 = mesh.vertices[i2 as usize].position.coords;
        volume += v0.dot(&v1.cross(&v2));
    }
    volume / 6.0
}

/// One face with its corner positions resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// `(v1 - v0) x (v2 - v0)`, twice the area in length.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, `None` when the triangle has no area.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        (len_sq > f64::EPSILON * f64::EPSILON).then(|| n / len_sq.sqrt())
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Compute the centroid.
    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Check if the triangle is degenerate (area below `epsilon`).
    #[inline]
    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        self.area() < epsilon
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Axis-aligned cube from the origin to `(size, size, size)`, outward CCW winding.
    pub(crate) fn cube(size: f64) -> Mesh {
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
        )
    }

    /// The cube with the two top (+Z) triangles removed.
    pub(crate) fn open_top_cube(size: f64) -> Mesh {
        let mut mesh = cube(size);
        mesh.faces.remove(3);
        mesh.faces.remove(2);
        mesh
    }

    /// Triangulated Mobius band: `n` quads whose ends are glued with a half
    /// twist. Not orientable.
    pub(crate) fn mobius_strip(n: usize) -> Mesh {
        let mut positions = Vec::new();
        for i in 0..n {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            let half = t / 2.0;
            for s in [-0.5, 0.5] {
                let r = 2.0 + s * half.cos();
                positions.push([r * t.cos(), r * t.sin(), s * half.sin()]);
            }
        }
        let mut faces = Vec::new();
        for i in 0..n {
            let (a, b) = (2 * i as u32, 2 * i as u32 + 1);
            let (c, d) = if i + 1 == n {
                (1, 0)
            } else {
                (2 * (i as u32 + 1), 2 * (i as u32 + 1) + 1)
            };
            faces.push([a, c, b]);
            faces.push([b, c, d]);
        }
        Mesh::from_raw(&positions, &faces)
    }

    #[test]
    fn test_triangle_normal() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let n = tri.normal().unwrap();
        assert_relative_eq!(n.z, 1.0);
        assert_relative_eq!(tri.area(), 0.5);
    }

    #[test]
    fn test_degenerate_triangle() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert!(tri.normal().is_none());
        assert!(tri.is_degenerate(1e-10));
    }

    #[test]
    fn test_cube_volume_and_area() {
        let mesh = cube(10.0);
        assert_relative_eq!(mesh.signed_volume(), 1000.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.surface_area(), 600.0, epsilon = 1e-9);
        assert!(!mesh.is_inside_out());
    }

    #[test]
    fn test_inverted_cube_volume() {
        let mut mesh = cube(2.0);
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        assert_relative_eq!(mesh.signed_volume(), -8.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.volume(), 8.0, epsilon = 1e-9);
        assert!(mesh.is_inside_out());
    }

    #[test]
    fn test_bounds_and_dimensions() {
        let mut mesh = cube(3.0);
        mesh.translate(Vector3::new(1.0, -2.0, 5.0));
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, 1.0);
        assert_relative_eq!(min.y, -2.0);
        assert_relative_eq!(max.z, 8.0);
        assert_relative_eq!(mesh.dimensions(), Vector3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_none());
        assert_eq!(mesh.dimensions(), Vector3::zeros());
        assert!(mesh.center_of_mass().is_none());
        assert_eq!(mesh.signed_volume(), 0.0);
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut mesh = cube(1.0);
        let other = cube(1.0);
        mesh.append(&other);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.face_count(), 24);
        assert_eq!(mesh.faces[12], [8, 10, 9]);
    }

    #[test]
    fn test_center_of_mass() {
        let mut mesh = cube(2.0);
        mesh.translate(Vector3::new(10.0, 0.0, 0.0));
        let com = mesh.center_of_mass().unwrap();
        assert_relative_eq!(com, Point3::new(11.0, 1.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_scale() {
        let mut mesh = cube(1.0);
        mesh.scale(3.0);
        assert_relative_eq!(mesh.volume(), 27.0, epsilon = 1e-9);
    }
}
