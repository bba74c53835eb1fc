use arbor_scene::{Group, Leaf, Node, NodeId, Scene, Shape};

use crate::frame::FrameInfo;

/// What a hook is looking at.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub scene: &'a Scene,
    pub id: NodeId,
    pub node: &'a Node,
    /// Root of the traversal is depth 0.
    pub depth: usize,
    pub frame: &'a FrameInfo,
}

impl<'a> Visit<'a> {
    pub fn group(&self) -> Option<&'a Group> {
        self.node.as_group()
    }

    pub fn leaf(&self) -> Option<&'a Leaf> {
        self.node.as_leaf()
    }

    pub fn shape(&self) -> Option<&'a Shape> {
        self.leaf().and_then(Leaf::as_shape)
    }
}

/// Hooks driven by [`crate::traverse`].
///
/// Order per node: `common`, `operation`, then for groups
/// `check_group_common` and `check_group` (both true to descend), the
/// children, `operation_after`, `common_after`. Leaves skip the group
/// steps. Any hook other than the two checks returning `false` aborts the
/// walk; a failed check only prunes the group's children.
///
/// Every hook defaults to `true`.
pub trait TraversalCallback {
    fn common(&mut self, _visit: &Visit<'_>) -> bool {
        true
    }

    fn operation(&mut self, _visit: &Visit<'_>) -> bool {
        true
    }

    fn check_group_common(&mut self, _visit: &Visit<'_>) -> bool {
        true
    }

    fn check_group(&mut self, _visit: &Visit<'_>) -> bool {
        true
    }

    fn operation_after(&mut self, _visit: &Visit<'_>) -> bool {
        true
    }

    fn common_after(&mut self, _visit: &Visit<'_>) -> bool {
        true
    }
}

impl<C: TraversalCallback + ?Sized> TraversalCallback for &mut C {
    fn common(&mut self, visit: &Visit<'_>) -> bool {
        (**self).common(visit)
    }

    fn operation(&mut self, visit: &Visit<'_>) -> bool {
        (**self).operation(visit)
    }

    fn check_group_common(&mut self, visit: &Visit<'_>) -> bool {
        (**self).check_group_common(visit)
    }

    fn check_group(&mut self, visit: &Visit<'_>) -> bool {
        (**self).check_group(visit)
    }

    fn operation_after(&mut self, visit: &Visit<'_>) -> bool {
        (**self).operation_after(visit)
    }

    fn common_after(&mut self, visit: &Visit<'_>) -> bool {
        (**self).common_after(visit)
    }
}
