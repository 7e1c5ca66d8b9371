//! A named solid plus a cached tessellation of it.

use std::sync::{Arc, Mutex, PoisonError};

use nalgebra::Point3;
use tracing::debug;

use crate::Mesh;
use crate::adjacency::MeshAdjacency;
use crate::error::MeshResult;
use crate::solid::Tessellate;
use crate::tracing_ext::OperationTimer;
use crate::validate::BoundingBox;

/// Linear tolerance used by the model queries, in mm.
pub const DEFAULT_LINEAR_TOLERANCE: f64 = 0.001;
/// Angular tolerance used by the model queries, in degrees.
pub const DEFAULT_ANGULAR_TOLERANCE: f64 = 0.1;

/// Descriptive data carried alongside a model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelMetadata {
    pub name: String,
    pub description: String,
    pub units: String,
    pub author: String,
    pub version: String,
    pub tags: Vec<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            description: String::new(),
            units: "mm".to_string(),
            author: String::new(),
            version: "1.0.0".to_string(),
            tags: Vec::new(),
        }
    }
}

impl ModelMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Extent along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Snapshot of a model's geometry for reporting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
    pub units: String,
    pub dimensions: Dimensions,
    pub volume: f64,
    pub surface_area: f64,
    pub triangles: usize,
    pub vertices: usize,
    pub is_watertight: bool,
    pub bounding_box: BoundingBox,
}

#[derive(Debug)]
struct CachedMesh {
    linear: f64,
    angular: f64,
    mesh: Arc<Mesh>,
}

/// A solid with metadata and a tessellation cache.
///
/// The cache holds one mesh and remembers both tolerances it was built
/// with; asking for any other pair re-tessellates and replaces it.
///
/// ```
/// use meshprep::{Cuboid, Model, ModelMetadata};
///
/// let model = Model::new(Cuboid::new(10.0, 20.0, 5.0), ModelMetadata::named("plate"));
/// assert_eq!(model.to_mesh(0.01, 5.0).unwrap().face_count(), 12);
/// assert!((model.volume().unwrap() - 1000.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Model<S> {
    solid: S,
    pub metadata: ModelMetadata,
    cache: Mutex<Option<CachedMesh>>,
}

impl<S: Tessellate> Model<S> {
    pub fn new(solid: S, metadata: ModelMetadata) -> Self {
        Self {
            solid,
            metadata,
            cache: Mutex::new(None),
        }
    }

    /// Model with default metadata.
    pub fn from_solid(solid: S) -> Self {
        Self::new(solid, ModelMetadata::default())
    }

    pub fn solid(&self) -> &S {
        &self.solid
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Triangulate at the given tolerances, reusing the cached mesh when
    /// both match.
    pub fn to_mesh(&self, linear: f64, angular_deg: f64) -> MeshResult<Arc<Mesh>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.as_ref()
            && cached.linear == linear
            && cached.angular == angular_deg
        {
            return Ok(Arc::clone(&cached.mesh));
        }

        let _timer = OperationTimer::new("tessellate");
        let mesh = Arc::new(self.solid.tessellate(linear, angular_deg)?);
        debug!(
            "Tessellated '{}' at {} mm / {} deg: {} triangles",
            self.metadata.name,
            linear,
            angular_deg,
            mesh.face_count()
        );
        *cache = Some(CachedMesh {
            linear,
            angular: angular_deg,
            mesh: Arc::clone(&mesh),
        });
        Ok(mesh)
    }

    fn default_mesh(&self) -> MeshResult<Arc<Mesh>> {
        self.to_mesh(DEFAULT_LINEAR_TOLERANCE, DEFAULT_ANGULAR_TOLERANCE)
    }

    /// Drop the cached tessellation.
    pub fn clear_cache(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn bounding_box(&self) -> MeshResult<BoundingBox> {
        let mesh = self.default_mesh()?;
        Ok(BoundingBox::of(&mesh))
    }

    pub fn dimensions(&self) -> MeshResult<Dimensions> {
        let d = self.default_mesh()?.dimensions();
        Ok(Dimensions {
            x: d.x,
            y: d.y,
            z: d.z,
        })
    }

    /// Enclosed volume in mm^3, or 0 when the tessellation is not watertight.
    pub fn volume(&self) -> MeshResult<f64> {
        let mesh = self.default_mesh()?;
        Ok(volume_if_closed(&mesh))
    }

    pub fn surface_area(&self) -> MeshResult<f64> {
        Ok(self.default_mesh()?.surface_area())
    }

    pub fn center_of_mass(&self) -> MeshResult<Option<Point3<f64>>> {
        Ok(self.default_mesh()?.center_of_mass())
    }

    pub fn info(&self) -> MeshResult<ModelInfo> {
        let mesh = self.default_mesh()?;
        let d = mesh.dimensions();
        Ok(ModelInfo {
            name: self.metadata.name.clone(),
            description: self.metadata.description.clone(),
            units: self.metadata.units.clone(),
            dimensions: Dimensions {
                x: d.x,
                y: d.y,
                z: d.z,
            },
            volume: volume_if_closed(&mesh),
            surface_area: mesh.surface_area(),
            triangles: mesh.face_count(),
            vertices: mesh.vertex_count(),
            is_watertight: MeshAdjacency::build(&mesh.faces).is_watertight(),
            bounding_box: BoundingBox::of(&mesh),
        })
    }
}

fn volume_if_closed(mesh: &Mesh) -> f64 {
    if MeshAdjacency::build(&mesh.faces).is_watertight() {
        mesh.volume()
    } else {
        0.0
    }
}
