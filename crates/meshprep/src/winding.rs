//! Winding consistency checks and correction.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::Mesh;
use crate::adjacency::{MeshAdjacency, face_edges, normalize_edge, traverses};
use crate::error::{MeshError, MeshResult};
use crate::types::signed_volume_of;

/// Current winding state of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindingReport {
    /// Manifold edges whose two faces traverse them in the same direction.
    pub inconsistent_edges: usize,
    /// Whether some assignment of face orientations makes every manifold
    /// edge consistent.
    pub orientable: bool,
}

impl WindingReport {
    /// True when every manifold edge is already traversed in opposite directions.
    pub fn is_consistent(&self) -> bool {
        self.inconsistent_edges == 0
    }
}

/// Outcome of [`fix_winding_order`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindingFix {
    /// Faces whose orientation changed.
    pub flipped_faces: usize,
    /// Closed components turned right side out.
    pub inverted_components: usize,
    /// Components processed.
    pub components: usize,
}

impl WindingFix {
    /// True when no face changed orientation.
    pub fn is_noop(&self) -> bool {
        self.flipped_faces == 0
    }
}

/// Inspect winding consistency without modifying the mesh.
pub fn check_winding(mesh: &Mesh) -> WindingReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    check_winding_with(&mesh.faces, &adjacency)
}

pub(crate) fn check_winding_with(faces: &[[u32; 3]], adjacency: &MeshAdjacency) -> WindingReport {
    let propagation = propagate_orientation(faces, adjacency);
    WindingReport {
        inconsistent_edges: adjacency.inconsistent_edge_count(),
        orientable: propagation.conflict.is_none(),
    }
}

struct Propagation {
    flip: Vec<bool>,
    components: Vec<Vec<usize>>,
    conflict: Option<(usize, usize)>,
}

/// Breadth-first walk over manifold edges assigning each face the
/// orientation that agrees with the face it was reached from.
fn propagate_orientation(faces: &[[u32; 3]], adjacency: &MeshAdjacency) -> Propagation {
    let mut state: Vec<Option<bool>> = vec![None; faces.len()];
    let mut components = Vec::new();
    let mut conflict = None;

    for start in 0..faces.len() {
        if state[start].is_some() {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        state[start] = Some(false);

        while let Some(face_idx) = queue.pop_front() {
            component.push(face_idx);
            let flipped = state[face_idx].unwrap_or_default();
            let current = oriented(&faces[face_idx], flipped);

            for (neighbor, (a, b)) in adjacency.manifold_neighbors(face_idx, &current) {
                // The neighbor must traverse a -> b backwards; if it runs the
                // same way it needs the opposite flip state.
                let needs_flip = traverses(&faces[neighbor], a, b).unwrap_or(false);
                match state[neighbor] {
                    None => {
                        state[neighbor] = Some(needs_flip);
                        queue.push_back(neighbor);
                    }
                    Some(existing) if existing != needs_flip => {
                        conflict.get_or_insert((face_idx, neighbor));
                    }
                    Some(_) => {}
                }
            }
        }

        components.push(component);
    }

    Propagation {
        flip: state.into_iter().map(Option::unwrap_or_default).collect(),
        components,
        conflict,
    }
}

#[inline]
fn oriented(face: &[u32; 3], flipped: bool) -> [u32; 3] {
    if flipped {
        [face[0], face[2], face[1]]
    } else {
        *face
    }
}

/// Fix winding order so all faces have consistent, outward orientation.
///
/// Each connected component is made consistent by flood fill from its first
/// face. Closed components whose enclosed volume then comes out negative are
/// inverted so their normals point outward.
///
/// # Errors
///
/// Returns [`MeshError::WindingFailed`] if the surface is not orientable. The
/// mesh is left untouched in that case.
pub fn fix_winding_order(mesh: &mut Mesh) -> MeshResult<WindingFix> {
    if mesh.faces.is_empty() {
        return Ok(WindingFix::default());
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let propagation = propagate_orientation(&mesh.faces, &adjacency);

    if let Some((a, b)) = propagation.conflict {
        return Err(MeshError::winding_failed(format!(
            "surface is not orientable: faces {} and {} cannot agree",
            a, b
        )));
    }

    let mut flip = propagation.flip;
    for (face, &f) in mesh.faces.iter_mut().zip(&flip) {
        if f {
            face.swap(1, 2);
        }
    }

    let mut inverted_components = 0;
    for component in &propagation.components {
        if !is_closed(component, &mesh.faces, &adjacency) {
            continue;
        }
        let volume = signed_volume_of(mesh, component.iter().map(|&f| &mesh.faces[f]));
        if volume < 0.0 {
            for &f in component {
                mesh.faces[f].swap(1, 2);
                flip[f] = !flip[f];
            }
            inverted_components += 1;
        }
    }

    let fix = WindingFix {
        flipped_faces: flip.iter().filter(|&&f| f).count(),
        inverted_components,
        components: propagation.components.len(),
    };

    if fix.is_noop() {
        debug!(
            "Winding order already consistent across {} component(s)",
            fix.components
        );
    } else {
        info!(
            "Fixed winding order: flipped {} faces across {} component(s), {} inverted",
            fix.flipped_faces, fix.components, fix.inverted_components
        );
    }

    Ok(fix)
}

/// A component is closed when each of its edges is shared by exactly two faces.
fn is_closed(component: &[usize], faces: &[[u32; 3]], adjacency: &MeshAdjacency) -> bool {
    component.iter().all(|&f| {
        face_edges(&faces[f]).into_iter().all(|(a, b)| {
            adjacency
                .edge_to_faces
                .get(&normalize_edge(a, b))
                .is_some_and(|uses| uses.len() == 2)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::{cube, mobius_strip, open_top_cube};
    use approx::assert_relative_eq;

    #[test]
    fn test_consistent_cube() {
        let mesh = cube(1.0);
        let report = check_winding(&mesh);
        assert!(report.is_consistent());
        assert!(report.orientable);
    }

    #[test]
    fn test_fix_single_flipped_face() {
        let mut mesh = cube(1.0);
        mesh.faces[5].swap(1, 2);
        assert_eq!(check_winding(&mesh).inconsistent_edges, 3);

        let fix = fix_winding_order(&mut mesh).unwrap();
        assert_eq!(fix.flipped_faces, 1);
        assert_eq!(fix.inverted_components, 0);
        assert!(check_winding(&mesh).is_consistent());
        assert_eq!(mesh, cube(1.0));
    }

    #[test]
    fn test_fix_flipped_start_face() {
        // Flood fill starts from face 0, so the other eleven get flipped and
        // then the whole component is turned back outward.
        let mut mesh = cube(2.0);
        mesh.faces[0].swap(1, 2);

        let fix = fix_winding_order(&mut mesh).unwrap();
        assert_eq!(fix.flipped_faces, 1);
        assert_eq!(fix.inverted_components, 1);
        assert_relative_eq!(mesh.signed_volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inside_out_cube_is_inverted() {
        let mut mesh = cube(1.0);
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        assert!(check_winding(&mesh).is_consistent());

        let fix = fix_winding_order(&mut mesh).unwrap();
        assert_eq!(fix.flipped_faces, 12);
        assert!(!mesh.is_inside_out());
    }

    #[test]
    fn test_open_mesh_orientation_is_kept() {
        let mut mesh = open_top_cube(1.0);
        let fix = fix_winding_order(&mut mesh).unwrap();
        assert!(fix.is_noop());
    }

    #[test]
    fn test_mobius_strip_is_not_orientable() {
        let mut mesh = mobius_strip(6);
        let original = mesh.clone();

        assert!(!check_winding(&mesh).orientable);
        let err = fix_winding_order(&mut mesh).unwrap_err();
        assert!(matches!(err, MeshError::WindingFailed { .. }));
        assert_eq!(mesh, original);
    }

    #[test]
    fn test_empty_mesh() {
        let mut mesh = Mesh::new();
        assert!(fix_winding_order(&mut mesh).unwrap().is_noop());
    }
}
