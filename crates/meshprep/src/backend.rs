//! Comprehensive repair backends used by aggressive repair.
//!
//! A backend takes a whole mesh and returns a cleaned copy in one step,
//! replacing the per-action pipeline. The built-in [`MeshFix`] backend is
//! compiled in with the `meshfix` feature.

use std::sync::Arc;

use crate::Mesh;
use crate::error::MeshResult;

/// Name reported when no backend is available.
pub const BUILTIN_BACKEND: &str = "meshfix";

/// A one-shot mesh repair engine.
pub trait ComprehensiveRepair: Send + Sync {
    /// Short name used in log entries.
    fn name(&self) -> &'static str;

    /// Return a repaired copy of `mesh`.
    fn repair(&self, mesh: &Mesh) -> MeshResult<Mesh>;
}

/// The backend this build ships with, if any.
pub(crate) fn default_backend() -> Option<Arc<dyn ComprehensiveRepair>> {
    #[cfg(feature = "meshfix")]
    {
        Some(Arc::new(MeshFix::default()))
    }

    #[cfg(not(feature = "meshfix"))]
    {
        tracing::debug!("Built without `meshfix`, aggressive repair unavailable");
        None
    }
}

#[cfg(feature = "meshfix")]
pub use builtin::MeshFix;

#[cfg(feature = "meshfix")]
mod builtin {
    use tracing::{debug, info};

    use super::{BUILTIN_BACKEND, ComprehensiveRepair};
    use crate::Mesh;
    use crate::components::keep_largest_component;
    use crate::error::MeshResult;
    use crate::holes::fill_holes;
    use crate::repair::{
        fix_non_manifold_edges, merge_vertices, remove_degenerate_faces, remove_duplicate_faces,
        remove_unreferenced_vertices,
    };
    use crate::validate::DEGENERATE_AREA_EPSILON;
    use crate::winding::fix_winding_order;

    /// Built-in comprehensive repair.
    ///
    /// Welds, drops degenerate and duplicate faces, resolves non-manifold
    /// edges, keeps the largest body, orients it outward and closes every
    /// hole regardless of size.
    #[derive(Debug, Clone)]
    pub struct MeshFix {
        pub weld_epsilon: f64,
        pub keep_largest: bool,
    }

    impl Default for MeshFix {
        fn default() -> Self {
            Self {
                weld_epsilon: 1e-6,
                keep_largest: true,
            }
        }
    }

    impl ComprehensiveRepair for MeshFix {
        fn name(&self) -> &'static str {
            BUILTIN_BACKEND
        }

        fn repair(&self, mesh: &Mesh) -> MeshResult<Mesh> {
            let mut out = mesh.clone();

            let merged = merge_vertices(&mut out, self.weld_epsilon);
            let degenerate = remove_degenerate_faces(&mut out, DEGENERATE_AREA_EPSILON);
            let duplicates = remove_duplicate_faces(&mut out);
            let non_manifold = fix_non_manifold_edges(&mut out);
            debug!(
                merged,
                degenerate, duplicates, non_manifold, "meshfix cleanup pass"
            );

            if self.keep_largest {
                keep_largest_component(&mut out);
            }
            if out.faces.is_empty() {
                return Ok(out);
            }

            fix_winding_order(&mut out)?;
            let holes = fill_holes(&mut out, usize::MAX)?;
            // Open shells cannot be turned outward until they are closed.
            if holes.faces_added > 0 {
                fix_winding_order(&mut out)?;
            }
            remove_unreferenced_vertices(&mut out);

            info!(
                "meshfix: {} -> {} vertices, {} -> {} faces, {} holes filled",
                mesh.vertex_count(),
                out.vertex_count(),
                mesh.face_count(),
                out.face_count(),
                holes.holes_filled
            );
            Ok(out)
        }
    }

}
