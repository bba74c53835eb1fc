use arbor_common::Bounds;

use crate::children::{ChildAccess, ChildList};
use crate::leaf::Leaf;

slotmap::new_key_type! {
    /// Handle to a node in a [`crate::Scene`]. Stale handles are misses.
    pub struct NodeId;
}

/// How a group combines its children's traversal results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildAggregation {
    /// First child that fails stops the walk and fails the group.
    ShortCircuitAnd,
    /// Every child is visited; the group succeeds if any child did.
    CollectAny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Group,
    /// Children are visited and drawn strictly in sequence order.
    Ordered { id: u64 },
    /// Batches references without owning them. Never attachable.
    Dummy,
}

impl GroupKind {
    pub fn access(&self) -> ChildAccess {
        match self {
            GroupKind::Group | GroupKind::Ordered { .. } => ChildAccess::Tracked,
            GroupKind::Dummy => ChildAccess::Raw,
        }
    }

    pub fn aggregation(&self) -> ChildAggregation {
        match self {
            GroupKind::Group | GroupKind::Ordered { .. } => ChildAggregation::ShortCircuitAnd,
            GroupKind::Dummy => ChildAggregation::CollectAny,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GroupKind::Group => "group",
            GroupKind::Ordered { .. } => "ordered group",
            GroupKind::Dummy => "dummy group",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub(crate) kind: GroupKind,
    pub(crate) children: ChildList,
    pub(crate) pickable: bool,
}

impl Group {
    pub(crate) fn new(kind: GroupKind, capacity: usize) -> Self {
        Self {
            kind,
            children: ChildList::new(kind.access(), capacity),
            pickable: false,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn children(&self) -> &ChildList {
        &self.children
    }

    pub fn is_pickable(&self) -> bool {
        self.pickable
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group(Group),
    Leaf(Leaf),
}

/// One element of the scene hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) bounds: Bounds,
    pub(crate) bounds_dirty: bool,
    /// Geometry generation the cached bounds were computed from.
    pub(crate) geometry_generation: u64,
    pub(crate) ignore_bounds: bool,
    pub(crate) pick_host: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, ignore_bounds: bool) -> Self {
        Self {
            name: None,
            parent: None,
            bounds: Bounds::EMPTY,
            bounds_dirty: true,
            geometry_generation: 0,
            ignore_bounds,
            pick_host: None,
            kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Last computed bounds. Only current if `bounds_current()`.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn bounds_dirty(&self) -> bool {
        self.bounds_dirty
    }

    /// Nothing invalidated the cached bounds and, for a shape, its geometry
    /// has not been edited since they were computed.
    ///
    /// A group only sees its own invalidation. Geometry edits below it are
    /// folded in by [`crate::Scene::update_bounds`].
    pub fn bounds_current(&self) -> bool {
        if self.bounds_dirty {
            return false;
        }
        match &self.kind {
            NodeKind::Leaf(Leaf::Shape(shape)) => {
                shape.geometry.generation() == self.geometry_generation
            }
            _ => true,
        }
    }

    /// The cached bounds, if current.
    pub fn current_bounds(&self) -> Option<Bounds> {
        self.bounds_current().then_some(self.bounds)
    }

    pub fn ignore_bounds(&self) -> bool {
        self.ignore_bounds
    }

    /// Nearest pickable ancestor group.
    pub fn pick_host(&self) -> Option<NodeId> {
        self.pick_host
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Group(_) => None,
        }
    }

    pub(crate) fn group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.as_group().is_some()
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Group(group) => group.kind.name(),
            NodeKind::Leaf(leaf) => leaf.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_groups_use_raw_access_and_or_aggregation() {
        assert_eq!(GroupKind::Dummy.access(), ChildAccess::Raw);
        assert_eq!(GroupKind::Dummy.aggregation(), ChildAggregation::CollectAny);
        assert_eq!(
            GroupKind::Ordered { id: 1 }.aggregation(),
            ChildAggregation::ShortCircuitAnd
        );
        assert_eq!(GroupKind::Group.access(), ChildAccess::Tracked);
    }

    #[test]
    fn fresh_node_is_detached_with_dirty_bounds() {
        let node = Node::new(NodeKind::Group(Group::new(GroupKind::Group, 2)), false);
        assert!(node.parent().is_none());
        assert!(node.bounds_dirty());
        assert!(node.bounds().is_empty());
        assert_eq!(node.kind_name(), "group");
        assert_eq!(node.as_group().map(|g| g.children().capacity()), Some(2));
    }
}
