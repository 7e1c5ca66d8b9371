//! Mesh repair: an ordered, best-effort pipeline of corrective actions.
//!
//! [`Repairer::repair`] never fails. Each action either succeeds or is logged
//! as a failed [`RepairLog`] entry, and callers decide whether to accept the
//! result by re-validating it.

use std::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::backend::{self, ComprehensiveRepair};
use crate::error::{MeshError, MeshResult};
use crate::holes::fill_holes;
use crate::tracing_ext::{OperationTimer, log_mesh_stats, log_repair_result};
use crate::validate::DEGENERATE_AREA_EPSILON;
use crate::winding::fix_winding_order;
use crate::{Mesh, Triangle};

/// Thresholds for the repair actions.
///
/// All distances are in mesh units (millimeters).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RepairConfig {
    /// Vertices closer than this are merged into one.
    pub merge_threshold: f64,
    /// Holes with more boundary edges than this are not filled.
    pub max_hole_edges: usize,
    /// Faces with an area below this are removed.
    pub degenerate_area: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 1e-8,
            max_hole_edges: 1000,
            degenerate_area: DEGENERATE_AREA_EPSILON,
        }
    }
}

/// A single corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RepairAction {
    /// Coalesce vertices closer than the merge threshold.
    MergeVertices,
    /// Drop zero-area faces and the vertices they leave behind.
    RemoveDegenerate,
    /// Make face winding consistent and outward.
    FixNormals,
    /// Close boundary loops.
    FillHoles,
    /// Hand the whole mesh to the comprehensive repair backend.
    #[cfg_attr(feature = "serde", serde(rename = "COMPREHENSIVE_REPAIR"))]
    Comprehensive,
}

impl RepairAction {
    /// The standard pipeline, in order.
    pub const DEFAULT_PIPELINE: [RepairAction; 4] = [
        RepairAction::MergeVertices,
        RepairAction::RemoveDegenerate,
        RepairAction::FixNormals,
        RepairAction::FillHoles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepairAction::MergeVertices => "MERGE_VERTICES",
            RepairAction::RemoveDegenerate => "REMOVE_DEGENERATE",
            RepairAction::FixNormals => "FIX_NORMALS",
            RepairAction::FillHoles => "FILL_HOLES",
            RepairAction::Comprehensive => "COMPREHENSIVE_REPAIR",
        }
    }
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one attempted action.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RepairLog {
    pub action: RepairAction,
    pub description: String,
    pub affected_elements: usize,
    pub success: bool,
}

impl RepairLog {
    /// Whether this entry changed the working mesh.
    pub fn modified(&self) -> bool {
        self.success && self.affected_elements > 0
    }
}

/// Result of a repair run.
#[derive(Debug, Clone)]
pub struct RepairResult {
    /// The repaired mesh (a copy; the input is never touched).
    pub mesh: Mesh,
    /// True iff some log entry succeeded with a non-zero affected count.
    pub was_modified: bool,
    /// One entry per attempted action, in order.
    pub log: Vec<RepairLog>,
}

impl RepairResult {
    fn from_log(mesh: Mesh, log: Vec<RepairLog>) -> Self {
        Self {
            mesh,
            was_modified: log.iter().any(RepairLog::modified),
            log,
        }
    }

    /// Entries that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RepairLog> {
        self.log.iter().filter(|e| !e.success)
    }

    /// Human-readable summary block.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RepairResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "=== Mesh Repair Summary ===")?;
        if !self.was_modified {
            return write!(f, "\nNo repairs needed - mesh was already valid.");
        }

        write!(f, "\nRepairs performed: {}\n", self.log.len())?;
        for entry in &self.log {
            let status = if entry.success { "OK" } else { "FAILED" };
            write!(
                f,
                "\n  [{}] {}: {}",
                status, entry.action, entry.description
            )?;
            if entry.affected_elements > 0 {
                write!(f, "\n       Affected: {} elements", entry.affected_elements)?;
            }
        }
        Ok(())
    }
}

/// What a single action produced.
struct ActionOutcome {
    mesh: Mesh,
    affected: usize,
    description: String,
    success: bool,
}

impl ActionOutcome {
    fn ok(mesh: Mesh, affected: usize, description: String) -> Self {
        Self {
            mesh,
            affected,
            description,
            success: true,
        }
    }
}

/// Applies repair actions to meshes.
///
/// ```
/// use meshprep::{Mesh, Repairer};
///
/// let repairer = Repairer::default();
/// let result = repairer.repair(&Mesh::new());
/// assert!(!result.was_modified);
/// assert_eq!(result.log.len(), 4);
/// ```
#[derive(Clone)]
pub struct Repairer {
    config: RepairConfig,
    backend: Option<Arc<dyn ComprehensiveRepair>>,
}

impl fmt::Debug for Repairer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repairer")
            .field("config", &self.config)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl Default for Repairer {
    fn default() -> Self {
        Self::new(RepairConfig::default())
    }
}

impl Repairer {
    /// Create a repairer with the built-in comprehensive backend, if this
    /// build has one.
    pub fn new(config: RepairConfig) -> Self {
        Self {
            config,
            backend: backend::default_backend(),
        }
    }

    /// Use a specific comprehensive repair backend.
    pub fn with_backend(mut self, backend: Arc<dyn ComprehensiveRepair>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Disable aggressive repair.
    pub fn without_backend(mut self) -> Self {
        self.backend = None;
        self
    }

    /// The thresholds in use.
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// Whether [`repair_aggressive`](Self::repair_aggressive) can run.
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Run the standard pipeline: merge, remove degenerate, fix normals, fill holes.
    pub fn repair(&self, mesh: &Mesh) -> RepairResult {
        self.repair_with(mesh, &RepairAction::DEFAULT_PIPELINE)
    }

    /// Run the given actions in order.
    ///
    /// An action's output becomes the working mesh only if it succeeded and
    /// affected something.
    pub fn repair_with(&self, mesh: &Mesh, actions: &[RepairAction]) -> RepairResult {
        let _timer = OperationTimer::for_mesh("repair", mesh);
        log_mesh_stats(mesh, "repair input");
        let mut working = mesh.clone();
        let mut log = Vec::with_capacity(actions.len());

        for &action in actions {
            let entry = match self.apply(action, &working) {
                Ok(outcome) => {
                    let entry = RepairLog {
                        action,
                        description: outcome.description,
                        affected_elements: outcome.affected,
                        success: outcome.success,
                    };
                    if entry.modified() {
                        working = outcome.mesh;
                    }
                    entry
                }
                Err(err) => RepairLog {
                    action,
                    description: failure_description(action, &err),
                    affected_elements: 0,
                    success: false,
                },
            };
            debug!(
                "{}: {} (affected {}, success {})",
                entry.action, entry.description, entry.affected_elements, entry.success
            );
            log.push(entry);
        }

        let result = RepairResult::from_log(working, log);
        log_repair_result(&result);
        result
    }

    /// Replace the pipeline with one comprehensive pass through the backend.
    ///
    /// Produces exactly one log entry. A successful backend's output is
    /// returned whole. Without a backend the entry is a failure naming the
    /// missing dependency and the mesh is returned as-is.
    pub fn repair_aggressive(&self, mesh: &Mesh) -> RepairResult {
        let _timer = OperationTimer::for_mesh("repair_aggressive", mesh);
        log_mesh_stats(mesh, "repair input");
        let action = RepairAction::Comprehensive;

        let (repaired, entry) = match self.apply(action, mesh) {
            Ok(outcome) => (
                outcome.mesh,
                RepairLog {
                    action,
                    description: outcome.description,
                    affected_elements: outcome.affected,
                    success: outcome.success,
                },
            ),
            Err(err) => (
                mesh.clone(),
                RepairLog {
                    action,
                    description: failure_description(action, &err),
                    affected_elements: 0,
                    success: false,
                },
            ),
        };
        debug!(
            "{}: {} (affected {}, success {})",
            entry.action, entry.description, entry.affected_elements, entry.success
        );

        let result = RepairResult::from_log(repaired, vec![entry]);
        log_repair_result(&result);
        result
    }

    fn apply(&self, action: RepairAction, mesh: &Mesh) -> MeshResult<ActionOutcome> {
        match action {
            RepairAction::MergeVertices => {
                let mut repaired = mesh.clone();
                let merged = merge_vertices(&mut repaired, self.config.merge_threshold);
                Ok(ActionOutcome::ok(
                    repaired,
                    merged,
                    format!("Merged {} duplicate vertices", merged),
                ))
            }
            RepairAction::RemoveDegenerate => {
                let mut repaired = mesh.clone();
                let removed = remove_degenerate_faces(&mut repaired, self.config.degenerate_area);
                remove_unreferenced_vertices(&mut repaired);
                Ok(ActionOutcome::ok(
                    repaired,
                    removed,
                    format!("Removed {} degenerate faces", removed),
                ))
            }
            RepairAction::FixNormals => {
                let mut repaired = mesh.clone();
                let fix = fix_winding_order(&mut repaired)?;
                if fix.is_noop() {
                    Ok(ActionOutcome::ok(
                        repaired,
                        0,
                        "Face normal orientation already consistent".to_string(),
                    ))
                } else {
                    let faces = repaired.face_count();
                    Ok(ActionOutcome::ok(
                        repaired,
                        faces,
                        "Fixed face normal orientation".to_string(),
                    ))
                }
            }
            RepairAction::FillHoles => self.fill_holes_action(mesh),
            RepairAction::Comprehensive => {
                let backend = self
                    .backend
                    .as_ref()
                    .ok_or(MeshError::BackendUnavailable {
                        backend: backend::BUILTIN_BACKEND,
                    })?;
                let repaired = backend.repair(mesh)?;
                let affected = changed_elements(mesh, &repaired);
                Ok(ActionOutcome::ok(
                    repaired,
                    affected,
                    format!("{} comprehensive repair", backend.name()),
                ))
            }
        }
    }

    fn fill_holes_action(&self, mesh: &Mesh) -> MeshResult<ActionOutcome> {
        if MeshAdjacency::build(&mesh.faces).is_watertight() {
            return Ok(ActionOutcome::ok(
                mesh.clone(),
                0,
                "Mesh already watertight, no holes to fill".to_string(),
            ));
        }

        let mut repaired = mesh.clone();
        let outcome = fill_holes(&mut repaired, self.config.max_hole_edges)?;
        let watertight = MeshAdjacency::build(&repaired.faces).is_watertight();

        Ok(ActionOutcome {
            affected: if watertight { outcome.faces_added } else { 0 },
            description: format!(
                "Filled {} of {} holes with {} triangles (now watertight: {})",
                outcome.holes_filled, outcome.holes_found, outcome.faces_added, watertight
            ),
            success: watertight,
            mesh: repaired,
        })
    }
}

/// Size of the difference between two meshes.
///
/// The change in vertex and face counts, or when both counts match, the
/// number of vertex positions and faces that differ in place.
fn changed_elements(before: &Mesh, after: &Mesh) -> usize {
    let count_delta = before.vertex_count().abs_diff(after.vertex_count())
        + before.face_count().abs_diff(after.face_count());
    if count_delta > 0 {
        return count_delta;
    }

    let moved = before
        .vertices
        .iter()
        .zip(&after.vertices)
        .filter(|(a, b)| a.position != b.position)
        .count();
    let rewired = before
        .faces
        .iter()
        .zip(&after.faces)
        .filter(|(a, b)| a != b)
        .count();
    moved + rewired
}

fn failure_description(action: RepairAction, err: &MeshError) -> String {
    match action {
        RepairAction::FixNormals => format!("Failed to fix normals: {}", err),
        RepairAction::FillHoles => format!("Failed to fill holes: {}", err),
        RepairAction::Comprehensive => format!("Comprehensive repair failed: {}", err),
        RepairAction::MergeVertices | RepairAction::RemoveDegenerate => {
            format!("{} failed: {}", action, err)
        }
    }
}

/// Repair a mesh with the standard pipeline and default thresholds.
pub fn repair_mesh(mesh: &Mesh) -> RepairResult {
    Repairer::default().repair(mesh)
}

fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

/// Merge vertices closer than `epsilon`, keeping the lowest index of each
/// cluster, and compact the vertex array.
///
/// Faces are remapped but not removed; a face that collapses becomes
/// degenerate and is left for [`remove_degenerate_faces`].
///
/// Returns the number of vertices merged away.
pub fn merge_vertices(mesh: &mut Mesh, epsilon: f64) -> usize {
    let original_count = mesh.vertices.len();
    if original_count == 0 || epsilon <= 0.0 {
        return 0;
    }

    // Cell size is twice epsilon so a 3x3x3 neighborhood covers every match.
    let cell_size = epsilon * 2.0;
    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        spatial_hash
            .entry(pos_to_cell(&vertex.position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut canonical: Vec<u32> = (0..original_count as u32).collect();
    let mut merged_count = 0;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if canonical[idx as usize] != idx {
            continue;
        }

        let cell = pos_to_cell(&vertex.position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = spatial_hash.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || canonical[other as usize] != other {
                            continue;
                        }
                        let dist = (vertex.position - mesh.vertices[other as usize].position).norm();
                        if dist < epsilon {
                            canonical[other as usize] = idx;
                            merged_count += 1;
                        }
                    }
                }
            }
        }
    }

    if merged_count == 0 {
        return 0;
    }

    // Canonical vertices keep their relative order.
    let mut new_index = vec![0u32; original_count];
    let mut kept = Vec::with_capacity(original_count - merged_count);
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        if canonical[idx] == idx as u32 {
            new_index[idx] = kept.len() as u32;
            kept.push(vertex.clone());
        }
    }
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = new_index[canonical[*v as usize] as usize];
        }
    }
    mesh.vertices = kept;

    info!(
        "Merged {} vertices (epsilon = {:e}): {} -> {}",
        merged_count,
        epsilon,
        original_count,
        mesh.vertices.len()
    );

    merged_count
}

/// Remove faces whose area is below `area_threshold`.
///
/// Returns the number of faces removed.
pub fn remove_degenerate_faces(mesh: &mut Mesh, area_threshold: f64) -> usize {
    let original_count = mesh.faces.len();
    let vertices = &mesh.vertices;
    mesh.faces.retain(|&[i0, i1, i2]| {
        let tri = Triangle::new(
            vertices[i0 as usize].position,
            vertices[i1 as usize].position,
            vertices[i2 as usize].position,
        );
        !tri.is_degenerate(area_threshold)
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        info!("Removed {} degenerate faces", removed);
    }
    removed
}

/// Drop vertices that no face references and compact indices.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> usize {
    let original_count = mesh.vertices.len();
    let mut referenced = vec![false; original_count];
    for face in &mesh.faces {
        for &v in face {
            referenced[v as usize] = true;
        }
    }

    if referenced.iter().all(|&r| r) {
        return 0;
    }

    let mut remap = vec![0u32; original_count];
    let mut kept = Vec::with_capacity(original_count);
    for (old_idx, vertex) in mesh.vertices.iter().enumerate() {
        if referenced[old_idx] {
            remap[old_idx] = kept.len() as u32;
            kept.push(vertex.clone());
        }
    }
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = remap[*v as usize];
        }
    }

    let removed = original_count - kept.len();
    mesh.vertices = kept;
    debug!("Removed {} unreferenced vertices", removed);
    removed
}

/// Remove faces that repeat another face's vertices, in either winding.
///
/// Returns the number of faces removed.
pub fn remove_duplicate_faces(mesh: &mut Mesh) -> usize {
    // Rotate so the smallest index comes first, keeping cyclic order.
    fn normalize_face(face: [u32; 3]) -> [u32; 3] {
        let min_idx = (0..3).min_by_key(|&i| face[i]).unwrap_or(0);
        [
            face[min_idx],
            face[(min_idx + 1) % 3],
            face[(min_idx + 2) % 3],
        ]
    }

    let original_count = mesh.faces.len();
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(original_count);
    mesh.faces.retain(|face| {
        let fwd = normalize_face(*face);
        let rev = normalize_face([face[0], face[2], face[1]]);
        if seen.contains(&fwd) || seen.contains(&rev) {
            false
        } else {
            seen.insert(fwd);
            true
        }
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        info!("Removed {} duplicate faces", removed);
    }
    removed
}

/// Make every edge shared by at most two faces, keeping the two largest.
///
/// Returns the number of faces removed.
pub fn fix_non_manifold_edges(mesh: &mut Mesh) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut faces_to_remove: HashSet<usize> = HashSet::new();

    for uses in adjacency.edge_to_faces.values().filter(|u| u.len() > 2) {
        let mut by_area: Vec<(usize, f64)> = uses
            .iter()
            .filter(|u| !faces_to_remove.contains(&u.face))
            .map(|u| (u.face, mesh.triangle(u.face).map_or(0.0, |t| t.area())))
            .collect();
        if by_area.len() <= 2 {
            continue;
        }
        by_area.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        faces_to_remove.extend(by_area.iter().skip(2).map(|&(f, _)| f));
    }

    if faces_to_remove.is_empty() {
        return 0;
    }

    let mut idx = 0;
    mesh.faces.retain(|_| {
        let keep = !faces_to_remove.contains(&idx);
        idx += 1;
        keep
    });

    info!(
        "Removed {} faces on non-manifold edges",
        faces_to_remove.len()
    );
    faces_to_remove.len()
}
