//! Solids that can be turned into triangle meshes.
//!
//! [`Tessellate`] is the seam to whatever geometry kernel produces the model.
//! The built-in solids cover simple parts and tests.

use std::f64::consts::PI;

use nalgebra::Vector3;
use tracing::debug;

use crate::Mesh;
use crate::error::{MeshError, MeshResult};
use crate::validate::validate_mesh_data;

/// Fewest segments used to approximate a circle.
pub const MIN_SEGMENTS: usize = 3;
/// Most segments used to approximate a circle.
pub const MAX_SEGMENTS: usize = 4096;

/// A solid that can produce a closed triangle mesh.
pub trait Tessellate {
    /// Triangulate the solid.
    ///
    /// `linear` is the maximum deviation from the true surface in mm and
    /// `angular_deg` the maximum angle between adjacent facets in degrees.
    fn tessellate(&self, linear: f64, angular_deg: f64) -> MeshResult<Mesh>;
}

impl<T: Tessellate + ?Sized> Tessellate for Box<T> {
    fn tessellate(&self, linear: f64, angular_deg: f64) -> MeshResult<Mesh> {
        (**self).tessellate(linear, angular_deg)
    }
}

fn check_tolerances(linear: f64, angular_deg: f64) -> MeshResult<()> {
    if !(linear.is_finite() && linear > 0.0) {
        return Err(MeshError::tessellation_failed(format!(
            "linear tolerance must be positive, got {}",
            linear
        )));
    }
    if !(angular_deg.is_finite() && angular_deg > 0.0) {
        return Err(MeshError::tessellation_failed(format!(
            "angular tolerance must be positive, got {}",
            angular_deg
        )));
    }
    Ok(())
}

fn check_extent(name: &str, value: f64) -> MeshResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MeshError::tessellation_failed(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

/// Axis-aligned box with its minimum corner at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    pub size: Vector3<f64>,
}

impl Cuboid {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            size: Vector3::new(x, y, z),
        }
    }

    pub fn cube(size: f64) -> Self {
        Self::new(size, size, size)
    }
}

impl Tessellate for Cuboid {
    /// Always 8 vertices and 12 triangles; tolerances only need to be valid.
    fn tessellate(&self, linear: f64, angular_deg: f64) -> MeshResult<Mesh> {
        check_tolerances(linear, angular_deg)?;
        for (name, value) in [("width", self.size.x), ("depth", self.size.y), ("height", self.size.z)] {
            check_extent(name, value)?;
        }

        let (x, y, z) = (self.size.x, self.size.y, self.size.z);
        Ok(Mesh::from_raw(
            &[
                [0.0, 0.0, 0.0],
                [x, 0.0, 0.0],
                [x, y, 0.0],
                [0.0, y, 0.0],
                [0.0, 0.0, z],
                [x, 0.0, z],
                [x, y, z],
                [0.0, y, z],
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
        ))
    }
}

/// Right circular cylinder standing on the XY plane, centered on the Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub radius: f64,
    pub height: f64,
}

impl Cylinder {
    pub fn new(radius: f64, height: f64) -> Self {
        Self { radius, height }
    }

    /// Segments needed so that neither tolerance is exceeded.
    ///
    /// Chord deviation gives `pi / acos(1 - linear / r)`, the angular limit
    /// gives `360 / angular_deg`; the larger wins.
    pub fn segments(&self, linear: f64, angular_deg: f64) -> usize {
        let by_chord = if linear >= self.radius {
            MIN_SEGMENTS as f64
        } else {
            (PI / (1.0 - linear / self.radius).acos()).ceil()
        };
        let by_angle = (360.0 / angular_deg).ceil();
        let n = by_chord.max(by_angle);
        if n.is_finite() {
            (n as usize).clamp(MIN_SEGMENTS, MAX_SEGMENTS)
        } else {
            MAX_SEGMENTS
        }
    }
}

impl Tessellate for Cylinder {
    fn tessellate(&self, linear: f64, angular_deg: f64) -> MeshResult<Mesh> {
        check_tolerances(linear, angular_deg)?;
        check_extent("radius", self.radius)?;
        check_extent("height", self.height)?;

        let n = self.segments(linear, angular_deg);
        debug!(
            "Cylinder r={} h={}: {} segments",
            self.radius, self.height, n
        );

        let mut positions = Vec::with_capacity(2 * n + 2);
        for z in [0.0, self.height] {
            for i in 0..n {
                let theta = 2.0 * PI * i as f64 / n as f64;
                positions.push([self.radius * theta.cos(), self.radius * theta.sin(), z]);
            }
        }
        positions.push([0.0, 0.0, 0.0]);
        positions.push([0.0, 0.0, self.height]);

        let n32 = n as u32;
        let (bottom_center, top_center) = (2 * n32, 2 * n32 + 1);
        let mut faces = Vec::with_capacity(4 * n);
        for i in 0..n32 {
            let next = (i + 1) % n32;
            let (b0, b1, t0, t1) = (i, next, n32 + i, n32 + next);
            faces.push([b0, b1, t1]);
            faces.push([b0, t1, t0]);
            faces.push([top_center, t0, t1]);
            faces.push([bottom_center, b1, b0]);
        }

        Ok(Mesh::from_raw(&positions, &faces))
    }
}

/// An already-triangulated solid. Tolerances are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSolid(pub Mesh);

impl Tessellate for MeshSolid {
    fn tessellate(&self, _linear: f64, _angular_deg: f64) -> MeshResult<Mesh> {
        if self.0.is_empty() {
            return Err(MeshError::tessellation_failed("mesh has no triangles"));
        }
        validate_mesh_data(&self.0)?;
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::MeshAdjacency;
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid() {
        let mesh = Cuboid::new(10.0, 20.0, 5.0).tessellate(0.01, 5.0).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert!(MeshAdjacency::build(&mesh.faces).is_watertight());
        assert_relative_eq!(mesh.signed_volume(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cuboid_rejects_flat_box() {
        let err = Cuboid::new(10.0, 0.0, 5.0).tessellate(0.01, 5.0).unwrap_err();
        assert!(matches!(err, MeshError::TessellationFailed { .. }));
    }

    #[test]
    fn test_cylinder_segments() {
        let cyl = Cylinder::new(10.0, 20.0);
        assert_eq!(cyl.segments(0.1, 15.0), 24);
        assert_eq!(cyl.segments(0.0001, 0.5), 720);
        assert_eq!(cyl.segments(100.0, 360.0), MIN_SEGMENTS);
        assert!(cyl.segments(0.01, 5.0) < cyl.segments(0.001, 1.0));
    }

    #[test]
    fn test_cylinder_is_closed_and_outward() {
        let cyl = Cylinder::new(5.0, 10.0);
        let mesh = cyl.tessellate(0.01, 5.0).unwrap();
        let n = cyl.segments(0.01, 5.0);
        assert_eq!(mesh.face_count(), 4 * n);
        assert_eq!(mesh.vertex_count(), 2 * n + 2);
        assert!(MeshAdjacency::build(&mesh.faces).is_watertight());

        let exact = PI * 25.0 * 10.0;
        let volume = mesh.signed_volume();
        assert!(volume > 0.0);
        assert!((exact - volume) / exact < 0.01);
    }

    #[test]
    fn test_invalid_tolerance() {
        let err = Cylinder::new(5.0, 10.0).tessellate(0.0, 5.0).unwrap_err();
        assert!(matches!(err, MeshError::TessellationFailed { .. }));
        assert!(Cylinder::new(5.0, 10.0).tessellate(0.01, f64::NAN).is_err());
    }

    #[test]
    fn test_mesh_solid() {
        assert!(MeshSolid(Mesh::new()).tessellate(0.1, 1.0).is_err());
        let solid: Box<dyn Tessellate> = Box::new(Cuboid::cube(1.0));
        assert_eq!(solid.tessellate(0.1, 1.0).unwrap().face_count(), 12);
    }

    #[test]
    fn test_mesh_solid_rejects_bad_indices() {
        let mesh = Mesh::from_raw(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 3]],
        );
        let err = MeshSolid(mesh).tessellate(0.1, 1.0).unwrap_err();
        assert!(matches!(err, MeshError::InvalidVertexIndex { vertex_index: 3, .. }));
    }
}
