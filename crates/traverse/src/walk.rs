use arbor_scene::{ChildAggregation, Group, NodeId, Scene};
use tracing::trace;

use crate::callback::{TraversalCallback, Visit};
use crate::frame::FrameInfo;

/// Walk the subtree at `root`, driving `callback`'s hooks.
///
/// Returns `true` if every reachable node was visited without a veto. A
/// stale `root` is reported as `false`.
pub fn traverse<C>(scene: &Scene, root: NodeId, frame: &FrameInfo, callback: &mut C) -> bool
where
    C: TraversalCallback + ?Sized,
{
    if !scene.contains(root) {
        tracing::warn!(?root, "traversal root not in scene");
        return false;
    }
    visit(scene, root, 0, frame, callback)
}

fn visit<C>(scene: &Scene, id: NodeId, depth: usize, frame: &FrameInfo, callback: &mut C) -> bool
where
    C: TraversalCallback + ?Sized,
{
    let Some(node) = scene.node(id) else {
        return true;
    };
    let here = Visit {
        scene,
        id,
        node,
        depth,
        frame,
    };
    if !callback.common(&here) || !callback.operation(&here) {
        trace!(?id, depth, "veto before children");
        return false;
    }
    if let Some(group) = node.as_group() {
        if callback.check_group_common(&here) && callback.check_group(&here) {
            if !visit_children(scene, group, depth + 1, frame, &mut *callback) {
                return false;
            }
        } else {
            trace!(?id, depth, "group pruned");
        }
    }
    callback.operation_after(&here) && callback.common_after(&here)
}

fn visit_children<C>(
    scene: &Scene,
    group: &Group,
    depth: usize,
    frame: &FrameInfo,
    callback: &mut C,
) -> bool
where
    C: TraversalCallback + ?Sized,
{
    let mut children = group
        .children()
        .iter()
        .filter(|child| scene.contains(*child));
    match group.kind().aggregation() {
        ChildAggregation::ShortCircuitAnd => {
            children.all(|child| visit(scene, child, depth, frame, &mut *callback))
        }
        ChildAggregation::CollectAny => {
            let mut visited = 0usize;
            let mut any = false;
            for child in children {
                visited += 1;
                any |= visit(scene, child, depth, frame, &mut *callback);
            }
            any || visited == 0
        }
    }
}
