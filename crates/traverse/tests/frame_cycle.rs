use std::sync::Arc;

use arbor_common::{Bounds, EngineConfig};
use arbor_geometry::{GeometryArray, Topology, TriangleView};
use arbor_resource::{ContextId, ContextRegistry, NativeHandle};
use arbor_scene::{GeometryObject, Scene, Shape};
use arbor_traverse::{CullingCallback, Frustum, TraversalEngine, View};
use glam::Vec3;

fn strip_geometry() -> Arc<GeometryObject> {
    let vertices = (0..6)
        .map(|i| Vec3::new((i / 2) as f32, (i % 2) as f32, 0.0))
        .collect();
    GeometryObject::shared(
        GeometryArray::new(Topology::triangle_strip([6]), vertices).unwrap(),
    )
}

/// Upload whatever the culling pass asked for, the way a backend would.
fn upload(scene: &Scene, culling: &CullingCallback, next_handle: &mut u64) {
    let ctx = culling.context();
    for &id in culling.uploads() {
        let Some(shape) = scene
            .node(id)
            .and_then(|node| node.as_leaf())
            .and_then(|leaf| leaf.as_shape())
        else {
            continue;
        };
        for resources in shape.resource_states() {
            if !resources.table().reference_exists(ctx) {
                *next_handle += 1;
                resources
                    .table()
                    .register(ctx, NativeHandle(*next_handle))
                    .unwrap();
            }
        }
    }
}

#[test]
fn each_context_uploads_once_then_reuses() {
    let mut scene = Scene::new();
    let root = scene.root();
    let geometry = strip_geometry();
    let shape = scene.create_leaf(Shape::new(geometry.clone()));
    scene.attach(root, shape, 0).unwrap();
    scene.update_bounds(root, false).unwrap();

    let registry = ContextRegistry::new(EngineConfig::default().max_render_contexts);
    let contexts = [registry.acquire().unwrap(), registry.acquire().unwrap()];
    let mut handles = 0;

    for ctx in contexts {
        let mut engine = TraversalEngine::default();
        let mut culling = CullingCallback::new(ctx);
        assert!(engine.run_frame(&scene, root, View::default(), &mut culling));
        assert_eq!(culling.uploads(), &[shape]);
        upload(&scene, &culling, &mut handles);
    }
    geometry.resources().dirty().clear_dirty();

    for ctx in contexts {
        let mut culling = CullingCallback::new(ctx);
        TraversalEngine::default().run_frame(&scene, root, View::default(), &mut culling);
        assert_eq!(culling.bin().shapes, vec![shape]);
        assert!(culling.uploads().is_empty());
    }

    geometry.edit(|data| data.set_triangle(0, [Vec3::ZERO, Vec3::Y, Vec3::X]));
    let mut culling = CullingCallback::new(contexts[1]);
    TraversalEngine::default().run_frame(&scene, root, View::default(), &mut culling);
    assert_eq!(culling.uploads(), &[shape]);
}

#[test]
fn render_threads_share_a_scene() {
    let mut scene = Scene::new();
    let root = scene.root();
    let geometry = strip_geometry();
    for i in 0..4 {
        let shape = scene.create_leaf(Shape::new(geometry.clone()));
        scene.attach(root, shape, i).unwrap();
    }

    let registry = ContextRegistry::new(4);
    let scene = &scene;
    std::thread::scope(|threads| {
        for _ in 0..4 {
            let ctx = registry.acquire().unwrap();
            threads.spawn(move || {
                let mut culling = CullingCallback::new(ctx);
                let mut engine = TraversalEngine::default();
                engine.run_frame(scene, root, View::default(), &mut culling);
                assert_eq!(culling.uploads().len(), 4);
                let mut handles = ctx.index() as u64 * 100;
                upload(scene, &culling, &mut handles);
            });
        }
    });

    assert_eq!(geometry.resources().table().live_contexts().len(), 4);
}

#[test]
fn destroyed_shape_releases_every_context() {
    let mut scene = Scene::new();
    let root = scene.root();
    let shape = scene.create_leaf(Shape::new(strip_geometry()));
    scene.attach(root, shape, 0).unwrap();

    let contexts = [ContextId::new(0), ContextId::new(1)];
    let mut handles = 0;
    for ctx in contexts {
        let mut culling = CullingCallback::new(ctx);
        TraversalEngine::default().run_frame(&scene, root, View::default(), &mut culling);
        upload(&scene, &culling, &mut handles);
    }
    let weak = {
        let leaf = scene.node(shape).and_then(|n| n.as_leaf()).unwrap();
        let geometry = &leaf.as_shape().unwrap().geometry;
        Arc::downgrade(geometry)
    };

    let report = scene.destroy(shape).unwrap();
    assert_eq!(report.objects_released(), 1);
    assert_eq!(report.handles_marked, 2);
    for resources in report.released_resources() {
        for ctx in contexts {
            assert!(!resources.table().reference_exists(ctx));
            assert!(resources.table().reclaim(ctx).is_some());
        }
    }
    drop(report);
    assert!(weak.upgrade().is_none());
}

#[test]
fn release_then_reclaim_per_context() {
    let geometry = strip_geometry();
    let table = geometry.resources().table();
    let (a, b) = (ContextId::new(0), ContextId::new(1));
    table.register(a, NativeHandle(10)).unwrap();
    table.register(b, NativeHandle(11)).unwrap();

    geometry.resources().release();
    assert!(!table.reference_exists(a));
    assert!(!table.reference_exists(b));
    assert_eq!(table.reclaim(a), Some(NativeHandle(10)));
    assert_eq!(table.reclaim(a), None);
    assert!(table.pending_destroy(b));
}

#[test]
fn frustum_culling_skips_uploads_for_hidden_shapes() {
    let mut scene = Scene::new();
    let root = scene.root();
    let visible = scene.create_leaf(Shape::new(strip_geometry()));
    let hidden_group = scene.create_group();
    let hidden = scene.create_leaf(Shape::new(GeometryObject::shared(
        GeometryArray::new(
            Topology::TriangleList,
            vec![Vec3::splat(90.0), Vec3::splat(91.0), Vec3::new(90.0, 91.0, 90.0)],
        )
        .unwrap(),
    )));
    scene.attach(hidden_group, hidden, 0).unwrap();
    scene.attach(root, visible, 0).unwrap();
    scene.attach(root, hidden_group, 1).unwrap();
    scene.update_bounds(root, false).unwrap();

    let view = View::at(Vec3::ZERO)
        .with_frustum(Frustum::from_bounds(Bounds::new(Vec3::splat(-5.0), Vec3::splat(5.0))));
    let mut culling = CullingCallback::new(ContextId::new(0));
    let mut engine = TraversalEngine::new(&EngineConfig::default());
    assert!(engine.run_frame(&scene, root, view, &mut culling));
    assert_eq!(culling.bin().shapes, vec![visible]);
    assert_eq!(culling.uploads(), &[visible]);
    assert_eq!(culling.groups_culled(), 1);
    // Culled shapes still age: the frame driver ticks everything reachable.
    assert_eq!(engine.stats().resources_ticked, 2);
}

#[test]
fn edited_geometry_moves_into_view_after_bounds_refresh() {
    let mut scene = Scene::new();
    let root = scene.root();
    let group = scene.create_group();
    let geometry = GeometryObject::shared(
        GeometryArray::new(
            Topology::TriangleList,
            vec![Vec3::splat(50.0), Vec3::new(51.0, 50.0, 50.0), Vec3::splat(51.0)],
        )
        .unwrap(),
    );
    let shape = scene.create_leaf(Shape::new(geometry.clone()));
    scene.attach(group, shape, 0).unwrap();
    scene.attach(root, group, 0).unwrap();
    scene.update_bounds(root, false).unwrap();

    geometry.edit(|data| {
        for i in 0..3 {
            if let Some(v) = data.vertex(i) {
                data.write_vertex(i, v - Vec3::splat(50.0));
            }
        }
    });
    let bounds = scene.update_bounds(root, true).unwrap();
    assert_eq!(bounds, Bounds::new(Vec3::ZERO, Vec3::ONE));

    let view = View::at(Vec3::ZERO)
        .with_frustum(Frustum::from_bounds(Bounds::new(Vec3::splat(-5.0), Vec3::splat(5.0))));
    let mut culling = CullingCallback::new(ContextId::new(0));
    TraversalEngine::default().run_frame(&scene, root, view, &mut culling);
    assert_eq!(culling.bin().shapes, vec![shape]);
    assert_eq!(culling.groups_culled(), 0);
}
