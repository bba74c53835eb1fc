use std::collections::HashSet;
use std::sync::Arc;

use arbor_common::{Bounds, Color, EngineConfig, IdAllocator};
use arbor_resource::ResourceState;
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::children::{ChildAccess, MAX_CHILD_SLOTS, RawSlots};
use crate::leaf::{Fog, Influence, Leaf};
use crate::node::{Group, GroupKind, Node, NodeKind};
use crate::shape::{GeometryObject, ShaderProgram};
use crate::{NodeId, SceneError};

/// Settings applied to nodes at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDefaults {
    pub ignore_bounds: bool,
    pub child_capacity: usize,
}

impl From<&EngineConfig> for NodeDefaults {
    fn from(config: &EngineConfig) -> Self {
        Self {
            ignore_bounds: config.default_ignore_bounds,
            child_capacity: config.initial_child_capacity,
        }
    }
}

/// What [`Scene::destroy`] tore down.
///
/// Objects that lost their last holder are handed back with every context
/// handle already marked for reclamation; each render context reclaims its
/// own handle before the objects are dropped.
#[derive(Debug, Default)]
pub struct Teardown {
    pub nodes_removed: usize,
    /// Per-context handles marked for reclamation.
    pub handles_marked: usize,
    pub released_geometry: Vec<Arc<GeometryObject>>,
    pub released_shaders: Vec<Arc<ShaderProgram>>,
}

impl Teardown {
    pub fn objects_released(&self) -> usize {
        self.released_geometry.len() + self.released_shaders.len()
    }

    /// Resource states of every released object.
    pub fn released_resources(&self) -> impl Iterator<Item = &ResourceState> {
        self.released_geometry
            .iter()
            .map(|g| g.resources())
            .chain(self.released_shaders.iter().map(|s| s.resources()))
    }
}

/// Arena of nodes rooted at a plain group.
///
/// Structural edits take `&mut self`; traversal takes `&self`.
#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    /// Live dummy groups; raw slots refuse them.
    dummies: HashSet<NodeId>,
    defaults: NodeDefaults,
    fog_ids: IdAllocator,
    ordered_group_ids: IdAllocator,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_allocators(config, IdAllocator::new(), IdAllocator::new())
    }

    /// Scene drawing fog and ordered-group ids from the given allocators.
    pub fn with_allocators(
        config: &EngineConfig,
        fog_ids: IdAllocator,
        ordered_group_ids: IdAllocator,
    ) -> Self {
        let defaults = NodeDefaults::from(config);
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(
            NodeKind::Group(Group::new(GroupKind::Group, defaults.child_capacity)),
            defaults.ignore_bounds,
        ));
        Self {
            nodes,
            root,
            dummies: HashSet::new(),
            defaults,
            fog_ids,
            ordered_group_ids,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn defaults(&self) -> NodeDefaults {
        self.defaults
    }

    pub fn fog_ids(&self) -> &IdAllocator {
        &self.fog_ids
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    /// Occupied child slots of `id` in sequence order. Empty for leaves.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id)
            .and_then(Node::as_group)
            .into_iter()
            .flat_map(|group| group.children().iter())
    }

    fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn group_mut(&mut self, id: NodeId) -> Result<&mut Group, SceneError> {
        let node = self.node_mut(id)?;
        let kind = node.kind_name();
        node.group_mut()
            .ok_or_else(|| SceneError::InvalidStructure(format!("a {kind} has no children")))
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind, self.defaults.ignore_bounds))
    }

    fn insert_group(&mut self, kind: GroupKind) -> NodeId {
        let capacity = self.defaults.child_capacity;
        self.insert(NodeKind::Group(Group::new(kind, capacity)))
    }

    // --- creation ---

    pub fn create_group(&mut self) -> NodeId {
        self.insert_group(GroupKind::Group)
    }

    pub fn create_ordered_group(&mut self) -> NodeId {
        let id = self.ordered_group_ids.allocate();
        self.insert_group(GroupKind::Ordered { id })
    }

    pub fn create_dummy_group(&mut self) -> NodeId {
        let id = self.insert_group(GroupKind::Dummy);
        self.dummies.insert(id);
        id
    }

    pub fn create_leaf(&mut self, leaf: impl Into<Leaf>) -> NodeId {
        self.insert(NodeKind::Leaf(leaf.into()))
    }

    pub fn create_linear_fog(&mut self, color: Color, front: f32, back: f32) -> NodeId {
        let fog = Fog::linear(&self.fog_ids, color, front, back);
        self.create_leaf(fog)
    }

    pub fn create_exponential_fog(&mut self, color: Color, density: f32) -> NodeId {
        let fog = Fog::exponential(&self.fog_ids, color, density);
        self.create_leaf(fog)
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(id)?.name = Some(name.into());
        Ok(())
    }

    // --- structure ---

    fn is_dummy(&self, id: NodeId) -> bool {
        self.dummies.contains(&id)
    }

    fn child_access(&self, parent: NodeId) -> Result<ChildAccess, SceneError> {
        let node = self.get(parent)?;
        node.as_group()
            .map(|group| group.children().access())
            .ok_or_else(|| {
                SceneError::InvalidStructure(format!(
                    "cannot attach children to a {}",
                    node.kind_name()
                ))
            })
    }

    /// `ancestor` lies on the parent chain of `id`.
    fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.parent(id) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Dummy groups never take a parent, and no group ever holds one.
    fn reject_dummy_child(&self, parent: NodeId, child: NodeId) -> SceneError {
        warn!(?parent, ?child, "rejected parent for dummy group");
        SceneError::InvalidStructure("a dummy group cannot be given a parent".into())
    }

    fn check_tracked_child(&self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            warn!(?parent, "rejected parent for the scene root");
            return Err(SceneError::InvalidStructure(
                "the scene root cannot be given a parent".into(),
            ));
        }
        if parent == child || self.is_ancestor(child, parent) {
            warn!(?parent, ?child, "rejected attach that would create a cycle");
            return Err(SceneError::InvalidStructure(
                "attaching a node below itself would create a cycle".into(),
            ));
        }
        Ok(())
    }

    /// Insert `child` into `parent` at `index`, shifting later children.
    ///
    /// `index` may lie beyond the current length or capacity; storage grows
    /// and the slots in between stay vacant. A parented child is moved.
    pub fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), SceneError> {
        let access = self.child_access(parent)?;
        self.get(child)?;
        if self.is_dummy(child) {
            return Err(self.reject_dummy_child(parent, child));
        }
        if index >= MAX_CHILD_SLOTS {
            return Err(SceneError::IndexOutOfRange {
                index,
                len: MAX_CHILD_SLOTS,
            });
        }
        match access {
            ChildAccess::Raw => self.group_mut(parent)?.children.insert(index, child),
            ChildAccess::Tracked => {
                self.check_tracked_child(parent, child)?;
                self.detach(child)?;
                self.group_mut(parent)?.children.insert(index, child)?;
                self.adopt(parent, child);
                debug!(?parent, ?child, index, "attached");
                Ok(())
            }
        }
    }

    /// Put `child` into slot `index` of `parent`, returning the previous
    /// occupant. A returned node is already detached.
    pub fn replace(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<Option<NodeId>, SceneError> {
        let access = self.child_access(parent)?;
        let current_parent = self.get(child)?.parent;
        if self.is_dummy(child) {
            return Err(self.reject_dummy_child(parent, child));
        }
        let len = self
            .get(parent)?
            .as_group()
            .map_or(0, |group| group.children().len());
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        match access {
            ChildAccess::Raw => self.group_mut(parent)?.children.replace(index, child),
            ChildAccess::Tracked => {
                if current_parent == Some(parent) {
                    return Err(SceneError::InvalidStructure(
                        "node is already a child of this group".into(),
                    ));
                }
                self.check_tracked_child(parent, child)?;
                self.detach(child)?;
                let previous = self.group_mut(parent)?.children.replace(index, child)?;
                if let Some(previous) = previous {
                    self.orphan(previous);
                }
                self.adopt(parent, child);
                debug!(?parent, ?child, index, ?previous, "replaced");
                Ok(previous)
            }
        }
    }

    /// Remove slot `index` of `parent`, closing the gap.
    pub fn remove(&mut self, parent: NodeId, index: usize) -> Result<Option<NodeId>, SceneError> {
        let group = self.group_mut(parent)?;
        let access = group.children.access();
        let removed = group.children.remove(index)?;
        if access == ChildAccess::Tracked {
            if let Some(child) = removed {
                self.orphan(child);
            }
            self.invalidate_bounds(parent);
            debug!(?parent, index, ?removed, "removed");
        }
        Ok(removed)
    }

    /// Detach `child` from its parent. Returns whether it had one.
    pub fn detach(&mut self, child: NodeId) -> Result<bool, SceneError> {
        let Some(parent) = self.get(child)?.parent else {
            return Ok(false);
        };
        let group = self.group_mut(parent)?;
        if let Some(position) = group.children.position(child) {
            group.children.remove(position)?;
        }
        self.orphan(child);
        self.invalidate_bounds(parent);
        Ok(true)
    }

    /// Detach `child` and append it to the end of `target`.
    pub fn move_to(&mut self, child: NodeId, target: NodeId) -> Result<(), SceneError> {
        if self.child_access(target)? == ChildAccess::Raw {
            return Err(SceneError::Unsupported {
                operation: "move_to",
                kind: GroupKind::Dummy.name(),
            });
        }
        self.get(child)?;
        self.check_tracked_child(target, child)?;
        self.detach(child)?;
        let end = self
            .get(target)?
            .as_group()
            .map_or(0, |group| group.children().len());
        self.attach(target, child, end)
    }

    /// Direct slot access on a dummy group, for batching references
    /// without taking ownership of them.
    ///
    /// Dummy groups are refused as references.
    pub fn dummy_slots(&mut self, dummy: NodeId) -> Result<RawSlots<'_>, SceneError> {
        let node = self
            .nodes
            .get_mut(dummy)
            .ok_or(SceneError::NodeNotFound(dummy))?;
        let kind = node.kind_name();
        let Some(group) = node.group_mut() else {
            return Err(SceneError::InvalidStructure(format!(
                "a {kind} has no children"
            )));
        };
        group.children.raw(&self.dummies).ok_or(SceneError::Unsupported {
            operation: "raw child access",
            kind,
        })
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.refresh_pick_hosts(child);
        self.invalidate_bounds(parent);
    }

    fn orphan(&mut self, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
        self.refresh_pick_hosts(child);
    }

    // --- bounds ---

    /// Mark `id` and every ancestor as needing a bounds recompute.
    pub fn invalidate_bounds(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get_mut(node_id) else {
                break;
            };
            node.bounds_dirty = true;
            current = node.parent;
        }
    }

    pub fn set_ignore_bounds(&mut self, id: NodeId, ignore: bool) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.ignore_bounds = ignore;
        if let Some(parent) = node.parent {
            self.invalidate_bounds(parent);
        }
        Ok(())
    }

    /// Recompute bounds bottom-up from `id`. With `only_dirty`, leaves
    /// whose cached bounds are current keep them and groups only re-union
    /// their children. A shape whose geometry was edited since its bounds
    /// were cached counts as dirty.
    pub fn update_bounds(&mut self, id: NodeId, only_dirty: bool) -> Result<Bounds, SceneError> {
        self.get(id)?;
        Ok(self.recompute_bounds(id, only_dirty))
    }

    fn recompute_bounds(&mut self, id: NodeId, only_dirty: bool) -> Bounds {
        let Some(node) = self.nodes.get(id) else {
            return Bounds::EMPTY;
        };
        let children: Vec<NodeId> = match &node.kind {
            NodeKind::Leaf(leaf) => {
                if only_dirty && node.bounds_current() {
                    return node.bounds;
                }
                // Generation before the scan: a racing edit leaves it stale.
                let generation = leaf.as_shape().map_or(0, |shape| shape.geometry.generation());
                let bounds = leaf.local_bounds();
                self.store_bounds(id, bounds, generation);
                return bounds;
            }
            NodeKind::Group(group) => group.children.iter().collect(),
        };
        let mut bounds = Bounds::EMPTY;
        for child in children {
            let child_bounds = self.recompute_bounds(child, only_dirty);
            if self.nodes.get(child).is_some_and(|node| !node.ignore_bounds) {
                bounds = bounds.union(&child_bounds);
            }
        }
        self.store_bounds(id, bounds, 0);
        bounds
    }

    fn store_bounds(&mut self, id: NodeId, bounds: Bounds, generation: u64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.bounds = bounds;
            node.bounds_dirty = false;
            node.geometry_generation = generation;
        }
    }

    // --- picking ---

    pub fn set_pickable(&mut self, group: NodeId, pickable: bool) -> Result<(), SceneError> {
        self.group_mut(group)?.pickable = pickable;
        self.refresh_pick_hosts(group);
        Ok(())
    }

    pub fn pick_host(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::pick_host)
    }

    /// Host that children of `group` report.
    fn host_below(&self, group: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(group)?;
        match node.as_group() {
            Some(g) if g.pickable => Some(group),
            _ => node.pick_host,
        }
    }

    fn refresh_pick_hosts(&mut self, id: NodeId) {
        let host = self.parent(id).and_then(|parent| self.host_below(parent));
        let mut stack = vec![(id, host)];
        while let Some((current, host)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.pick_host = host;
            if let NodeKind::Group(group) = &node.kind {
                if group.children.access() == ChildAccess::Tracked {
                    let below = if group.pickable { Some(current) } else { host };
                    stack.extend(group.children.iter().map(|child| (child, below)));
                }
            }
        }
    }

    // --- copies ---

    /// Run `f` with `defaults` in force, restoring the previous defaults.
    pub fn with_defaults<R>(&mut self, defaults: NodeDefaults, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.defaults, defaults);
        let result = f(self);
        self.defaults = saved;
        result
    }

    /// Fresh, empty, detached group of the same kind as `id`, keeping its
    /// name, pickability and ignore-bounds flag. Ordered groups get a new id.
    pub fn new_instance(&mut self, id: NodeId) -> Result<NodeId, SceneError> {
        let node = self.get(id)?;
        let Some(group) = node.as_group() else {
            return Err(SceneError::Unsupported {
                operation: "new_instance",
                kind: node.kind_name(),
            });
        };
        let (kind, pickable) = (group.kind, group.pickable);
        let name = node.name.clone();
        let defaults = NodeDefaults {
            ignore_bounds: node.ignore_bounds,
            ..self.defaults
        };
        let copy = self.with_defaults(defaults, |scene| match kind {
            GroupKind::Group => Ok(scene.create_group()),
            GroupKind::Ordered { .. } => Ok(scene.create_ordered_group()),
            GroupKind::Dummy => Err(SceneError::Unsupported {
                operation: "new_instance",
                kind: kind.name(),
            }),
        })?;
        if let Some(node) = self.nodes.get_mut(copy) {
            node.name = name;
            if let Some(group) = node.group_mut() {
                group.pickable = pickable;
            }
        }
        Ok(copy)
    }

    /// Detached copy of `id`. Groups copy empty, fogs take a new id,
    /// shapes share their geometry and shader.
    pub fn duplicate(&mut self, id: NodeId) -> Result<NodeId, SceneError> {
        let node = self.get(id)?;
        let leaf = match &node.kind {
            NodeKind::Group(_) => return self.new_instance(id),
            NodeKind::Leaf(Leaf::Fog(fog)) => Leaf::Fog(fog.copy_with_id(&self.fog_ids)),
            NodeKind::Leaf(leaf) => leaf.clone(),
        };
        let (name, ignore_bounds) = (node.name.clone(), node.ignore_bounds);
        let copy = self.create_leaf(leaf);
        if let Some(node) = self.nodes.get_mut(copy) {
            node.name = name;
            node.ignore_bounds = ignore_bounds;
        }
        Ok(copy)
    }

    // --- teardown ---

    /// Remove `id` and its owned subtree. Geometry and shader objects left
    /// without any other holder have every context handle marked for
    /// reclamation and come back in the [`Teardown`].
    ///
    /// Dummy groups do not own their children; destroying one removes only
    /// the dummy.
    pub fn destroy(&mut self, id: NodeId) -> Result<Teardown, SceneError> {
        if id == self.root {
            return Err(SceneError::InvalidStructure(
                "the root cannot be destroyed".into(),
            ));
        }
        self.get(id)?;
        self.detach(id)?;

        let mut geometries: Vec<Arc<GeometryObject>> = Vec::new();
        let mut shaders: Vec<Arc<ShaderProgram>> = Vec::new();
        let mut report = Teardown::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(current) else {
                continue;
            };
            report.nodes_removed += 1;
            match node.kind {
                NodeKind::Group(group) if group.children.access() == ChildAccess::Tracked => {
                    stack.extend(group.children.iter());
                }
                NodeKind::Group(_) => {
                    self.dummies.remove(&current);
                }
                NodeKind::Leaf(Leaf::Shape(shape)) => {
                    if !geometries.iter().any(|g| Arc::ptr_eq(g, &shape.geometry)) {
                        geometries.push(shape.geometry);
                    }
                    if let Some(shader) = shape.shader {
                        if !shaders.iter().any(|s| Arc::ptr_eq(s, &shader)) {
                            shaders.push(shader);
                        }
                    }
                }
                NodeKind::Leaf(_) => {}
            }
        }

        report.released_geometry = geometries
            .into_iter()
            .filter(|g| Arc::strong_count(g) == 1)
            .collect();
        report.released_shaders = shaders
            .into_iter()
            .filter(|s| Arc::strong_count(s) == 1)
            .collect();
        report.handles_marked = report
            .released_resources()
            .map(ResourceState::release)
            .sum();
        debug!(
            ?id,
            nodes = report.nodes_removed,
            objects = report.objects_released(),
            handles = report.handles_marked,
            "destroyed subtree"
        );
        Ok(report)
    }

    // --- queries ---

    /// Region a fog or light affects, following a bounding-leaf reference.
    pub fn effective_influence(&self, id: NodeId) -> Option<Bounds> {
        match self.nodes.get(id)?.as_leaf()?.influence()? {
            Influence::None => None,
            Influence::Bounds(bounds) => Some(bounds),
            Influence::Leaf(region) => match self.nodes.get(region)?.as_leaf()? {
                Leaf::Bounding(leaf) => Some(leaf.region),
                _ => None,
            },
        }
    }

    /// Edit a leaf payload in place; its bounds and its ancestors' are
    /// invalidated afterwards.
    pub fn edit_leaf<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Leaf) -> R,
    ) -> Result<R, SceneError> {
        let node = self.node_mut(id)?;
        let kind = node.kind_name();
        let NodeKind::Leaf(leaf) = &mut node.kind else {
            return Err(SceneError::Unsupported {
                operation: "edit_leaf",
                kind,
            });
        };
        let result = f(leaf);
        self.invalidate_bounds(id);
        Ok(result)
    }

    /// Every node reachable from `id`, pre-order, including nodes a dummy
    /// group references.
    pub fn reachable(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.push(current);
            if let Some(group) = node.as_group() {
                let start = stack.len();
                stack.extend(group.children().iter());
                stack[start..].reverse();
            }
        }
        out
    }

    /// Call `f` for the geometry and shader state of every shape reachable
    /// from `id`. Shared objects are reported once per shape.
    pub fn for_each_resource(&self, id: NodeId, mut f: impl FnMut(&ResourceState)) {
        for node_id in self.reachable(id) {
            if let Some(shape) = self
                .nodes
                .get(node_id)
                .and_then(Node::as_leaf)
                .and_then(Leaf::as_shape)
            {
                shape.resource_states().for_each(&mut f);
            }
        }
    }
}
