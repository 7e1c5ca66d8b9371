//! Connected component analysis for meshes.
//!
//! A connected component is a maximal set of faces reachable from one another
//! through shared edges. A mesh with more than one component describes
//! several disjoint bodies, which a printer treats as separate parts.

use std::cmp::Reverse;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::types::{Mesh, signed_volume_of};

/// Result of connected component analysis.
#[derive(Debug, Clone, Default)]
pub struct ComponentAnalysis {
    /// Number of connected components found.
    pub component_count: usize,
    /// Face indices for each component, sorted by size (largest first).
    pub components: Vec<Vec<usize>>,
}

impl ComponentAnalysis {
    /// Check if the mesh is fully connected (single component).
    pub fn is_connected(&self) -> bool {
        self.component_count == 1
    }

    /// Get the face indices of the largest component.
    pub fn largest_component(&self) -> &[usize] {
        self.components.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl std::fmt::Display for ComponentAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Connected components: {}", self.component_count)?;
        for (i, comp) in self.components.iter().enumerate() {
            writeln!(f, "  Component {}: {} faces", i + 1, comp.len())?;
        }
        Ok(())
    }
}

/// Find all connected components in a mesh.
///
/// Two faces are connected if they share an edge, including edges shared by
/// more than two faces.
///
/// ```
/// use meshprep::{Mesh, find_connected_components};
///
/// let mesh = Mesh::from_raw(
///     &[
///         [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0],
///         [10.0, 0.0, 0.0], [11.0, 0.0, 0.0], [10.0, 1.0, 0.0],
///     ],
///     &[[0, 1, 2], [3, 4, 5]],
/// );
///
/// let analysis = find_connected_components(&mesh);
/// assert_eq!(analysis.component_count, 2);
/// ```
pub fn find_connected_components(mesh: &Mesh) -> ComponentAnalysis {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    connected_components(mesh.faces.len(), &adjacency)
}

/// Component analysis over a prebuilt adjacency.
pub(crate) fn connected_components(
    face_count: usize,
    adjacency: &MeshAdjacency,
) -> ComponentAnalysis {
    if face_count == 0 {
        return ComponentAnalysis::default();
    }

    let mut face_neighbors: Vec<Vec<usize>> = vec![Vec::new(); face_count];
    for uses in adjacency.edge_to_faces.values() {
        for pair in uses.windows(2) {
            let (f0, f1) = (pair[0].face, pair[1].face);
            if f0 != f1 {
                face_neighbors[f0].push(f1);
                face_neighbors[f1].push(f0);
            }
        }
    }

    let mut visited = vec![false; face_count];
    let mut components: Vec<Vec<usize>> = Vec::new();

    for start_face in 0..face_count {
        if visited[start_face] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start_face];
        visited[start_face] = true;

        while let Some(face_idx) = stack.pop() {
            component.push(face_idx);
            for &neighbor in &face_neighbors[face_idx] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }

        component.sort_unstable();
        components.push(component);
    }

    // Stable sort keeps discovery order among equal sizes.
    components.sort_by_key(|c| Reverse(c.len()));

    if components.len() > 1 {
        debug!(
            "Component sizes: {:?}",
            components.iter().map(Vec::len).collect::<Vec<_>>()
        );
    }

    ComponentAnalysis {
        component_count: components.len(),
        components,
    }
}

/// Enclosed volume of each component, in the order of `analysis.components`.
///
/// Values are absolute signed volumes, so they are only meaningful for
/// components that are closed.
pub fn component_volumes(mesh: &Mesh, analysis: &ComponentAnalysis) -> Vec<f64> {
    analysis
        .components
        .par_iter()
        .map(|faces| signed_volume_of(mesh, faces.iter().map(|&f| &mesh.faces[f])).abs())
        .collect()
}

/// Split a mesh into separate meshes, one per connected component.
///
/// Components are returned largest first. Each mesh carries only the vertices
/// its faces reference.
pub fn split_into_components(mesh: &Mesh) -> Vec<Mesh> {
    let analysis = find_connected_components(mesh);
    analysis
        .components
        .iter()
        .map(|faces| {
            let mut remap = vec![u32::MAX; mesh.vertices.len()];
            let mut part = Mesh::with_capacity(faces.len() / 2 + 2, faces.len());
            for &f in faces {
                let face = mesh.faces[f];
                let mut new_face = [0u32; 3];
                for (slot, &v) in new_face.iter_mut().zip(face.iter()) {
                    let entry = &mut remap[v as usize];
                    if *entry == u32::MAX {
                        *entry = part.vertices.len() as u32;
                        part.vertices.push(mesh.vertices[v as usize].clone());
                    }
                    *slot = *entry;
                }
                part.faces.push(new_face);
            }
            part
        })
        .collect()
}

/// Discard every component except the largest.
///
/// Returns the number of components removed.
pub fn keep_largest_component(mesh: &mut Mesh) -> usize {
    let mut parts = split_into_components(mesh).into_iter();
    let Some(largest) = parts.next() else {
        return 0;
    };
    let removed = parts.count();
    if removed == 0 {
        return 0;
    }

    info!(
        "Keeping largest component ({} faces), removing {} smaller component(s)",
        largest.face_count(),
        removed
    );
    *mesh = largest;
    removed
}
