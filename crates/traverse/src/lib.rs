//! Traversal protocol over an arbor scene, plus the per-frame driver and
//! stock culling and picking callbacks.
//!
//! # Invariants
//! - Hooks run in a fixed order: `common`, `operation`, group checks,
//!   children, `operation_after`, `common_after`.
//! - A vetoing hook stops the walk and the result is `false`; a failed group
//!   check only prunes that group's children.
//! - Plain and ordered groups stop at the first failing child. Dummy groups
//!   visit every child and succeed if any child did.
//! - A resource ages at most one frame per frame id, however many shapes
//!   share it.

mod callback;
mod culling;
mod engine;
mod frame;
mod pick;
mod walk;

pub use callback::{TraversalCallback, Visit};
pub use culling::{CullingCallback, RenderBin};
pub use engine::{FrameStats, TraversalEngine};
pub use frame::{FrameInfo, Frustum, Plane, View};
pub use pick::{PickCallback, PickHit, Ray};
pub use walk::traverse;

pub fn crate_info() -> &'static str {
    "arbor-traverse v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("traverse"));
    }
}
