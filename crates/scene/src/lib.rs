//! Scene tree: groups, leaves, parent/child structure and bounds.
//!
//! Nodes live in a [`Scene`] arena and refer to each other by [`NodeId`].
//! Every structural edit goes through the scene so links stay consistent.
//!
//! # Invariants
//! - A node has at most one parent; attaching a parented node moves it.
//! - Growing a group's child storage never reorders existing children.
//! - Out-of-range child indices fail, they are never clamped.
//! - A dummy group never has a parent and is never referenced by any group,
//!   raw or tracked.
//! - The root never has a parent.
//! - A group's bounds are only computed after all of its children's.
//! - A shape's cached bounds go stale as soon as its geometry is edited.

mod children;
mod error;
mod leaf;
mod node;
mod scene;
mod shape;

pub use children::{ChildAccess, ChildList, MAX_CHILD_SLOTS, RawSlots};
pub use error::SceneError;
pub use leaf::{BoundingLeaf, Fog, FogMode, Influence, Leaf, Light, LightKind};
pub use node::{ChildAggregation, Group, GroupKind, Node, NodeId, NodeKind};
pub use scene::{NodeDefaults, Scene, Teardown};
pub use shape::{GeometryObject, ShaderProgram, ShaderSource, ShaderStage, Shape};

pub fn crate_info() -> &'static str {
    "arbor-scene v0.1.0"
}
