use arbor_resource::ContextId;
use arbor_scene::{Leaf, NodeId};

use crate::callback::{TraversalCallback, Visit};

/// What survived culling, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderBin {
    pub shapes: Vec<NodeId>,
    pub fogs: Vec<NodeId>,
    pub lights: Vec<NodeId>,
}

impl RenderBin {
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.fogs.clear();
        self.lights.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.fogs.is_empty() && self.lights.is_empty()
    }
}

/// Stock view-culling callback for one render context.
///
/// Groups whose current bounds miss the frustum are pruned. Visible shapes
/// go into the [`RenderBin`]; those whose geometry or shader has no live
/// handle in this context, or is dirty, are also listed in `uploads`.
/// Groups with stale or empty bounds are never pruned.
#[derive(Debug)]
pub struct CullingCallback {
    context: ContextId,
    bin: RenderBin,
    uploads: Vec<NodeId>,
    nodes_visited: usize,
    groups_culled: usize,
}

impl CullingCallback {
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            bin: RenderBin::default(),
            uploads: Vec::new(),
            nodes_visited: 0,
            groups_culled: 0,
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn bin(&self) -> &RenderBin {
        &self.bin
    }

    /// Visible shapes that need an upload before drawing.
    pub fn uploads(&self) -> &[NodeId] {
        &self.uploads
    }

    pub fn nodes_visited(&self) -> usize {
        self.nodes_visited
    }

    pub fn groups_culled(&self) -> usize {
        self.groups_culled
    }

    /// Forget the previous frame's results.
    pub fn reset(&mut self) {
        self.bin.clear();
        self.uploads.clear();
        self.nodes_visited = 0;
        self.groups_culled = 0;
    }
}

impl TraversalCallback for CullingCallback {
    fn common(&mut self, _visit: &Visit<'_>) -> bool {
        self.nodes_visited += 1;
        true
    }

    fn operation(&mut self, visit: &Visit<'_>) -> bool {
        match visit.leaf() {
            Some(Leaf::Shape(shape)) => {
                let bounds = visit.node.current_bounds().unwrap_or_else(|| shape.bounds());
                if !visit.frame.may_see(&bounds) {
                    return true;
                }
                self.bin.shapes.push(visit.id);
                if shape
                    .resource_states()
                    .any(|resources| resources.needs_upload(self.context))
                {
                    self.uploads.push(visit.id);
                }
            }
            Some(Leaf::Fog(_)) => self.bin.fogs.push(visit.id),
            Some(Leaf::Light(light)) if light.enabled => self.bin.lights.push(visit.id),
            _ => {}
        }
        true
    }

    fn check_group(&mut self, visit: &Visit<'_>) -> bool {
        let Some(bounds) = visit.node.current_bounds().filter(|b| !b.is_empty()) else {
            return true;
        };
        let visible = visit.frame.may_see(&bounds);
        if !visible {
            self.groups_culled += 1;
            tracing::trace!(id = ?visit.id, "group culled");
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameInfo, Frustum, View};
    use crate::walk::traverse;
    use arbor_common::{Bounds, Color};
    use arbor_geometry::{GeometryArray, Topology, TriangleView};
    use arbor_resource::NativeHandle;
    use arbor_scene::{GeometryObject, Light, LightKind, Scene, Shape};
    use glam::Vec3;
    use std::sync::Arc;

    fn triangle_at(offset: Vec3) -> Arc<GeometryObject> {
        GeometryObject::shared(
            GeometryArray::new(
                Topology::TriangleList,
                vec![offset, offset + Vec3::X, offset + Vec3::Y],
            )
            .unwrap(),
        )
    }

    fn unit_view() -> FrameInfo {
        FrameInfo::default().with_view(
            View::at(Vec3::ZERO).with_frustum(Frustum::from_bounds(Bounds::new(
                Vec3::splat(-2.0),
                Vec3::splat(2.0),
            ))),
        )
    }

    #[test]
    fn far_groups_are_pruned_near_shapes_binned() {
        let mut scene = Scene::new();
        let root = scene.root();
        let near = scene.create_group();
        let far = scene.create_group();
        let near_shape = scene.create_leaf(Shape::new(triangle_at(Vec3::ZERO)));
        let far_shape = scene.create_leaf(Shape::new(triangle_at(Vec3::splat(50.0))));
        scene.attach(near, near_shape, 0).unwrap();
        scene.attach(far, far_shape, 0).unwrap();
        scene.attach(root, near, 0).unwrap();
        scene.attach(root, far, 1).unwrap();
        scene.update_bounds(root, false).unwrap();

        let mut culling = CullingCallback::new(ContextId::new(0));
        assert!(traverse(&scene, root, &unit_view(), &mut culling));
        assert_eq!(culling.bin().shapes, vec![near_shape]);
        assert_eq!(culling.groups_culled(), 1);
        assert_eq!(culling.uploads(), &[near_shape]);
    }

    #[test]
    fn uploaded_clean_shapes_need_no_upload() {
        let mut scene = Scene::new();
        let root = scene.root();
        let geometry = triangle_at(Vec3::ZERO);
        let ctx = ContextId::new(2);
        geometry.resources().table().register(ctx, NativeHandle(1)).unwrap();
        geometry.resources().dirty().clear_dirty();
        let shape = scene.create_leaf(Shape::new(geometry.clone()));
        scene.attach(root, shape, 0).unwrap();

        let mut culling = CullingCallback::new(ctx);
        traverse(&scene, root, &FrameInfo::default(), &mut culling);
        assert!(culling.uploads().is_empty());

        let mut other = CullingCallback::new(ContextId::new(3));
        traverse(&scene, root, &FrameInfo::default(), &mut other);
        assert_eq!(other.uploads(), &[shape]);
    }

    #[test]
    fn environment_leaves_are_binned() {
        let mut scene = Scene::new();
        let root = scene.root();
        let fog = scene.create_exponential_fog(Color::WHITE, 0.1);
        let light = scene.create_leaf(Light::new(LightKind::Ambient, Color::WHITE));
        let off = scene.create_leaf(Light {
            enabled: false,
            ..Light::new(LightKind::Ambient, Color::BLACK)
        });
        for (i, id) in [fog, light, off].into_iter().enumerate() {
            scene.attach(root, id, i).unwrap();
        }

        let mut culling = CullingCallback::new(ContextId::new(0));
        traverse(&scene, root, &FrameInfo::default(), &mut culling);
        assert_eq!(culling.bin().fogs, vec![fog]);
        assert_eq!(culling.bin().lights, vec![light]);
        assert_eq!(culling.nodes_visited(), 4);

        culling.reset();
        assert!(culling.bin().is_empty());
    }

    #[test]
    fn shapes_use_cached_bounds_until_geometry_moves() {
        let mut scene = Scene::new();
        let batch = scene.create_dummy_group();
        let geometry = triangle_at(Vec3::splat(50.0));
        let shape = scene.create_leaf(Shape::new(geometry.clone()));
        scene.dummy_slots(batch).unwrap().push(shape).unwrap();
        scene.update_bounds(shape, false).unwrap();

        let mut culling = CullingCallback::new(ContextId::new(0));
        traverse(&scene, batch, &unit_view(), &mut culling);
        assert!(culling.bin().shapes.is_empty());
        assert_eq!(culling.nodes_visited(), 2);

        // Moved into view; the leaf's cache is stale, so it rescans.
        geometry.edit(|data| {
            for i in 0..3 {
                if let Some(v) = data.vertex(i) {
                    data.write_vertex(i, v - Vec3::splat(50.0));
                }
            }
        });
        culling.reset();
        traverse(&scene, batch, &unit_view(), &mut culling);
        assert_eq!(culling.bin().shapes, vec![shape]);
    }
}
