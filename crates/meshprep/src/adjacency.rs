//! Mesh adjacency data structures.
//!
//! Provides edge-to-face lookups that also remember the direction in which
//! each face traverses the edge, which is what watertightness and winding
//! checks need.

use hashbrown::HashMap;

/// One face's use of an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUse {
    /// Index of the face.
    pub face: usize,
    /// True when the face traverses the edge from the lower to the higher
    /// vertex index.
    pub forward: bool,
}

/// Adjacency information for a mesh.
///
/// Provides lookups for:
/// - Faces adjacent to an edge, with traversal direction
/// - Boundary edges (edges with only one adjacent face)
/// - Non-manifold edges (edges with more than two adjacent faces)
/// - Inconsistently wound edges (two faces traversing an edge the same way)
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Maps edge (v0, v1) with v0 < v1 to the faces using it.
    pub(crate) edge_to_faces: HashMap<(u32, u32), Vec<EdgeUse>>,
    face_count: usize,
}

impl MeshAdjacency {
    /// Build adjacency information from a list of faces.
    ///
    /// Edges that collapse to a single vertex (a face like `[3, 3, 7]`) are
    /// skipped.
    ///
    /// ```
    /// use meshprep::MeshAdjacency;
    ///
    /// let faces = vec![[0, 1, 2], [1, 3, 2]];
    /// let adj = MeshAdjacency::build(&faces);
    ///
    /// assert_eq!(adj.boundary_edge_count(), 4);
    /// assert_eq!(adj.inconsistent_edge_count(), 0);
    /// ```
    #[must_use]
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<EdgeUse>> =
            HashMap::with_capacity(faces.len() * 3 / 2);

        for (face_idx, face) in faces.iter().enumerate() {
            for (a, b) in face_edges(face) {
                if a == b {
                    continue;
                }
                edge_to_faces
                    .entry(normalize_edge(a, b))
                    .or_default()
                    .push(EdgeUse {
                        face: face_idx,
                        forward: a < b,
                    });
            }
        }

        Self {
            edge_to_faces,
            face_count: faces.len(),
        }
    }

    /// Get the faces using an edge, in either direction.
    ///
    /// Returns `None` if the edge doesn't exist in the mesh.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[EdgeUse]> {
        self.edge_to_faces
            .get(&normalize_edge(v0, v1))
            .map(Vec::as_slice)
    }

    /// Iterate over all boundary edges (edges with exactly one adjacent face).
    ///
    /// Boundary edges indicate holes in the mesh surface.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, uses)| uses.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Count the number of boundary edges.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|uses| uses.len() == 1)
            .count()
    }

    /// Iterate over all non-manifold edges (more than two adjacent faces).
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, uses)| uses.len() > 2)
            .map(|(&edge, _)| edge)
    }

    /// Count the number of non-manifold edges.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|uses| uses.len() > 2)
            .count()
    }

    /// Count manifold edges whose two faces traverse them in the same direction.
    #[must_use]
    pub fn inconsistent_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|uses| uses.len() == 2 && uses[0].forward == uses[1].forward)
            .count()
    }

    /// Check if the mesh is manifold (all edges have at most 2 adjacent faces).
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|uses| uses.len() <= 2)
    }

    /// Check if the mesh is watertight.
    ///
    /// Every edge must be shared by exactly two faces that traverse it in
    /// opposite directions. A mesh without faces is not watertight.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.face_count > 0
            && self
                .edge_to_faces
                .values()
                .all(|uses| uses.len() == 2 && uses[0].forward != uses[1].forward)
    }

    /// Faces sharing an edge with `face`, paired with the shared edge.
    ///
    /// Only manifold edges (exactly two faces) contribute neighbors.
    pub fn manifold_neighbors<'a>(
        &'a self,
        face: usize,
        vertices: &[u32; 3],
    ) -> impl Iterator<Item = (usize, (u32, u32))> + 'a {
        let edges = face_edges(vertices);
        edges.into_iter().filter_map(move |(a, b)| {
            let uses = self.edge_to_faces.get(&normalize_edge(a, b))?;
            if uses.len() != 2 {
                return None;
            }
            let other = if uses[0].face == face { uses[1] } else { uses[0] };
            (other.face != face).then_some((other.face, (a, b)))
        })
    }

    /// Get the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }
}

/// The three directed edges of a face, in winding order.
#[inline]
pub(crate) fn face_edges(face: &[u32; 3]) -> [(u32, u32); 3] {
    [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
}

/// Order an edge's endpoints so the lower index comes first.
#[inline]
#[must_use]
pub fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}

/// Check whether `face` traverses `a -> b`. Returns `None` if the edge is not
/// part of the face.
#[inline]
pub(crate) fn traverses(face: &[u32; 3], a: u32, b: u32) -> Option<bool> {
    face_edges(face).into_iter().find_map(|(x, y)| {
        if x == a && y == b {
            Some(true)
        } else if x == b && y == a {
            Some(false)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::{cube, open_top_cube};

    #[test]
    fn test_single_triangle() {
        let adj = MeshAdjacency::build(&[[0, 1, 2]]);
        assert_eq!(adj.edge_count(), 3);
        assert_eq!(adj.boundary_edge_count(), 3);
        assert!(adj.is_manifold());
        assert!(!adj.is_watertight());
    }

    #[test]
    fn test_closed_cube_is_watertight() {
        let mesh = cube(1.0);
        let adj = MeshAdjacency::build(&mesh.faces);
        assert_eq!(adj.edge_count(), 18);
        assert_eq!(adj.boundary_edge_count(), 0);
        assert_eq!(adj.inconsistent_edge_count(), 0);
        assert!(adj.is_watertight());
    }

    #[test]
    fn test_open_cube_has_boundary() {
        let mesh = open_top_cube(1.0);
        let adj = MeshAdjacency::build(&mesh.faces);
        assert_eq!(adj.boundary_edge_count(), 4);
        assert!(!adj.is_watertight());
    }

    #[test]
    fn test_flipped_face_breaks_watertightness() {
        let mut mesh = cube(1.0);
        mesh.faces[0].swap(1, 2);
        let adj = MeshAdjacency::build(&mesh.faces);
        assert_eq!(adj.boundary_edge_count(), 0);
        assert_eq!(adj.inconsistent_edge_count(), 3);
        assert!(!adj.is_watertight());
    }

    #[test]
    fn test_non_manifold_edge() {
        // Three triangles sharing edge (0, 1)
        let adj = MeshAdjacency::build(&[[0, 1, 2], [1, 0, 3], [0, 1, 4]]);
        assert_eq!(adj.non_manifold_edge_count(), 1);
        assert_eq!(adj.non_manifold_edges().next(), Some((0, 1)));
        assert!(!adj.is_manifold());
        assert!(!adj.is_watertight());
    }

    #[test]
    fn test_empty_is_not_watertight() {
        let adj = MeshAdjacency::build(&[]);
        assert!(!adj.is_watertight());
        assert_eq!(adj.edge_count(), 0);
    }

    #[test]
    fn test_faces_for_edge_direction() {
        let adj = MeshAdjacency::build(&[[0, 1, 2], [2, 1, 3]]);
        let uses = adj.faces_for_edge(2, 1).unwrap();
        assert_eq!(uses.len(), 2);
        assert!(uses[0].forward);
        assert!(!uses[1].forward);
    }

    #[test]
    fn test_manifold_neighbors() {
        let mesh = cube(1.0);
        let adj = MeshAdjacency::build(&mesh.faces);
        let neighbors: Vec<_> = adj.manifold_neighbors(0, &mesh.faces[0]).collect();
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.iter().any(|&(f, _)| f == 1));
    }

    #[test]
    fn test_traverses() {
        assert_eq!(traverses(&[0, 1, 2], 1, 2), Some(true));
        assert_eq!(traverses(&[0, 1, 2], 2, 1), Some(false));
        assert_eq!(traverses(&[0, 1, 2], 0, 5), None);
    }
}
