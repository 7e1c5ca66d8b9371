//! Hole detection and filling for mesh repair.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::adjacency::MeshAdjacency;
use crate::error::{MeshError, MeshResult};
use crate::{Mesh, Triangle};

/// A boundary loop representing a hole in the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryLoop {
    /// Loop vertices, ordered the way a patch covering the hole must wind
    /// (opposite to the faces around the rim).
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop.
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Summary of a hole filling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoleFillOutcome {
    /// Boundary loops found.
    pub holes_found: usize,
    /// Loops that were triangulated.
    pub holes_filled: usize,
    /// Loops skipped for exceeding the edge limit.
    pub holes_skipped: usize,
    /// Triangles added to the mesh.
    pub faces_added: usize,
}

/// Detect all boundary loops (holes) in the mesh.
///
/// Boundary half-edges are chained head to tail in the direction their faces
/// traverse them; chains that do not close are dropped with a warning.
pub fn detect_holes(_mesh: &Mesh, adjacency: &MeshAdjacency) -> Vec<BoundaryLoop> {
    let mut outgoing: HashMap<u32, Vec<u32>> = HashMap::new();
    for (&(lo, hi), uses) in &adjacency.edge_to_faces {
        if let [single] = uses.as_slice() {
            let (a, b) = if single.forward { (lo, hi) } else { (hi, lo) };
            outgoing.entry(a).or_default().push(b);
        }
    }

    if outgoing.is_empty() {
        return Vec::new();
    }

    // Deterministic traversal regardless of hash order.
    let mut starts: Vec<u32> = outgoing.keys().copied().collect();
    starts.sort_unstable();
    for targets in outgoing.values_mut() {
        targets.sort_unstable_by(|a, b| b.cmp(a));
    }

    let mut loops = Vec::new();
    for start in starts {
        while let Some(first) = outgoing.get_mut(&start).and_then(Vec::pop) {
            let mut chain = vec![start];
            let mut current = first;
            let mut closed = true;

            while current != start {
                chain.push(current);
                match outgoing.get_mut(&current).and_then(Vec::pop) {
                    Some(next) => current = next,
                    None => {
                        closed = false;
                        break;
                    }
                }
            }

            if !closed {
                warn!("Boundary chain starting at vertex {} is not closed", start);
                continue;
            }
            if chain.len() >= 3 {
                chain.reverse();
                loops.push(BoundaryLoop { vertices: chain });
            }
        }
    }

    info!(
        "Detected {} holes (boundary loops), sizes: {:?}",
        loops.len(),
        loops.iter().map(BoundaryLoop::edge_count).collect::<Vec<_>>()
    );

    loops
}

/// Fill a hole using ear clipping triangulation.
///
/// Returns the new triangles to add to the mesh, wound in the loop's order.
pub fn fill_hole_ear_clipping(mesh: &Mesh, boundary: &BoundaryLoop) -> Vec<[u32; 3]> {
    let n = boundary.vertices.len();
    if n < 3 {
        return Vec::new();
    }

    let positions: Vec<Point3<f64>> = boundary
        .vertices
        .iter()
        .map(|&idx| mesh.vertices[idx as usize].position)
        .collect();

    let centroid = Point3::from(
        positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / n as f64,
    );
    let hole_normal = compute_hole_normal(&positions, &centroid);

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len).find(|&i| {
            let prev = remaining[(i + len - 1) % len];
            let next = remaining[(i + 1) % len];
            is_ear(&positions, &remaining, prev, remaining[i], next, &hole_normal)
        });

        match ear {
            Some(i) => {
                let prev = remaining[(i + len - 1) % len];
                let next = remaining[(i + 1) % len];
                triangles.push([
                    boundary.vertices[prev],
                    boundary.vertices[remaining[i]],
                    boundary.vertices[next],
                ]);
                remaining.remove(i);
            }
            None => {
                warn!(
                    "Ear clipping stuck with {} vertices remaining, using fan triangulation",
                    len
                );
                break;
            }
        }
    }

    // Whatever is left (a single triangle, or a polygon ear clipping could not
    // handle) is fanned from its first vertex.
    let center = remaining[0];
    for pair in remaining[1..].windows(2) {
        triangles.push([
            boundary.vertices[center],
            boundary.vertices[pair[0]],
            boundary.vertices[pair[1]],
        ]);
    }

    debug!(
        "Filled hole with {} edges using {} triangles",
        n,
        triangles.len()
    );

    triangles
}

/// Compute the average normal for a hole boundary.
fn compute_hole_normal(positions: &[Point3<f64>], centroid: &Point3<f64>) -> Vector3<f64> {
    let n = positions.len();
    let normal = (0..n).fold(Vector3::zeros(), |acc, i| {
        let v0 = positions[i] - centroid;
        let v1 = positions[(i + 1) % n] - centroid;
        acc + v0.cross(&v1)
    });

    let len = normal.norm();
    if len > f64::EPSILON {
        normal / len
    } else {
        Vector3::z()
    }
}

/// Check if vertex at index `curr` forms a valid ear.
fn is_ear(
    positions: &[Point3<f64>],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    hole_normal: &Vector3<f64>,
) -> bool {
    let (p_prev, p_curr, p_next) = (positions[prev], positions[curr], positions[next]);

    // Convex corners produce a triangle facing the same way as the hole.
    let Some(tri_normal) = Triangle::new(p_prev, p_curr, p_next).normal() else {
        return false;
    };
    if tri_normal.dot(hole_normal) < 0.0 {
        return false;
    }

    remaining
        .iter()
        .filter(|&&idx| idx != prev && idx != curr && idx != next)
        .all(|&idx| !point_in_triangle_2d(&positions[idx], &p_prev, &p_curr, &p_next, hole_normal))
}

/// Check if point is inside triangle (projected onto plane defined by normal).
fn point_in_triangle_2d(
    p: &Point3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
    normal: &Vector3<f64>,
) -> bool {
    // Project to 2D by dropping the axis most aligned with normal
    let abs = normal.abs();
    let project = |q: &Point3<f64>| -> (f64, f64) {
        if abs.z >= abs.x && abs.z >= abs.y {
            (q.x, q.y)
        } else if abs.y >= abs.x {
            (q.x, q.z)
        } else {
            (q.y, q.z)
        }
    };

    let (p, a, b, c) = (project(p), project(v0), project(v1), project(v2));
    let sign = |p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)| -> f64 {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };

    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_neg && has_pos)
}

/// Fill all holes in the mesh with at most `max_hole_edges` edges.
///
/// Each hole is triangulated independently in parallel, then all triangles
/// are appended to the mesh. No vertices are added.
///
/// # Errors
///
/// Returns [`MeshError::HoleFillFailed`] when holes exist but every one of
/// them exceeds the edge limit.
pub fn fill_holes(mesh: &mut Mesh, max_hole_edges: usize) -> MeshResult<HoleFillOutcome> {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let holes = detect_holes(mesh, &adjacency);

    let (fillable, skipped): (Vec<_>, Vec<_>) = holes
        .into_iter()
        .partition(|hole| hole.edge_count() <= max_hole_edges);

    for hole in &skipped {
        warn!(
            "Skipping large hole with {} edges (max: {})",
            hole.edge_count(),
            max_hole_edges
        );
    }

    if fillable.is_empty() && !skipped.is_empty() {
        return Err(MeshError::hole_fill_failed(format!(
            "all {} holes exceed the limit of {} edges",
            skipped.len(),
            max_hole_edges
        )));
    }

    let patches: Vec<Vec<[u32; 3]>> = fillable
        .par_iter()
        .map(|hole| fill_hole_ear_clipping(mesh, hole))
        .collect();

    let faces_added: usize = patches.iter().map(Vec::len).sum();
    mesh.faces.extend(patches.into_iter().flatten());

    let outcome = HoleFillOutcome {
        holes_found: fillable.len() + skipped.len(),
        holes_filled: fillable.len(),
        holes_skipped: skipped.len(),
        faces_added,
    };

    if outcome.holes_found > 0 {
        info!(
            "Filled {} of {} holes with {} triangles",
            outcome.holes_filled, outcome.holes_found, outcome.faces_added
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::{cube, open_top_cube};
    use approx::assert_relative_eq;

    #[test]
    fn test_detect_square_hole() {
        let mesh = open_top_cube(1.0);
        let adjacency = MeshAdjacency::build(&mesh.faces);
        let holes = detect_holes(&mesh, &adjacency);

        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].edge_count(), 4);
        let mut sorted = holes[0].vertices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_no_holes_in_closed_mesh() {
        let mesh = cube(1.0);
        let adjacency = MeshAdjacency::build(&mesh.faces);
        assert!(detect_holes(&mesh, &adjacency).is_empty());
    }

    #[test]
    fn test_fill_closes_open_cube() {
        let mut mesh = open_top_cube(10.0);
        let outcome = fill_holes(&mut mesh, 1000).unwrap();

        assert_eq!(outcome.holes_found, 1);
        assert_eq!(outcome.holes_filled, 1);
        assert_eq!(outcome.faces_added, 2);
        assert!(MeshAdjacency::build(&mesh.faces).is_watertight());
        assert_relative_eq!(mesh.signed_volume(), 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fill_two_holes() {
        let mut mesh = cube(1.0);
        // Drop top and bottom
        mesh.faces.drain(0..4);
        let outcome = fill_holes(&mut mesh, 1000).unwrap();
        assert_eq!(outcome.holes_filled, 2);
        assert_eq!(mesh.face_count(), 12);
        assert!(MeshAdjacency::build(&mesh.faces).is_watertight());
    }

    #[test]
    fn test_hole_over_limit_fails() {
        let mut mesh = open_top_cube(1.0);
        let err = fill_holes(&mut mesh, 3).unwrap_err();
        assert!(matches!(err, MeshError::HoleFillFailed { .. }));
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn test_ear_clipping_concave_polygon() {
        // L-shaped planar hole, counter-clockwise seen from +Z
        let mesh = Mesh::from_raw(
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 2.0, 0.0],
                [0.0, 2.0, 0.0],
            ],
            &[],
        );
        let boundary = BoundaryLoop {
            vertices: vec![0, 1, 2, 3, 4, 5],
        };
        let triangles = fill_hole_ear_clipping(&mesh, &boundary);
        assert_eq!(triangles.len(), 4);

        let patch = Mesh {
            vertices: mesh.vertices.clone(),
            faces: triangles,
        };
        assert_relative_eq!(patch.surface_area(), 3.0, epsilon = 1e-9);
        for tri in patch.triangles() {
            assert!(tri.normal().unwrap().z > 0.0);
        }
    }
}
