use arbor_common::Bounds;
use arbor_geometry::TriangleView;
use arbor_scene::NodeId;
use glam::Vec3;

use crate::callback::{TraversalCallback, Visit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Slab test. Empty bounds are never hit.
    pub fn hits_bounds(&self, bounds: &Bounds) -> bool {
        if bounds.is_empty() {
            return false;
        }
        let inverse = self.direction.recip();
        let t0 = (bounds.min - self.origin) * inverse;
        let t1 = (bounds.max - self.origin) * inverse;
        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        far >= near.max(0.0)
    }

    /// Möller-Trumbore; distance along the ray to the hit, if any.
    pub fn hits_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub shape: NodeId,
    /// Nearest pickable ancestor, the node a selection should report.
    pub host: Option<NodeId>,
    pub triangle: usize,
    pub distance: f32,
}

/// Collects every shape triangle a ray crosses.
///
/// Groups with current bounds the ray misses are pruned. Triangles that do
/// not resolve, for instance in partially built geometry, are skipped.
#[derive(Debug)]
pub struct PickCallback {
    ray: Ray,
    hits: Vec<PickHit>,
}

impl PickCallback {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            hits: Vec::new(),
        }
    }

    pub fn hits(&self) -> &[PickHit] {
        &self.hits
    }

    pub fn closest(&self) -> Option<&PickHit> {
        self.hits
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl TraversalCallback for PickCallback {
    fn operation(&mut self, visit: &Visit<'_>) -> bool {
        let Some(shape) = visit.shape() else {
            return true;
        };
        let bounds = visit.node.current_bounds().unwrap_or_else(|| shape.bounds());
        if !self.ray.hits_bounds(&bounds) {
            return true;
        }
        let geometry = shape.geometry.read();
        for i in 0..geometry.triangle_count() {
            let Some(corners) = geometry.triangle(i) else {
                continue;
            };
            if let Some(distance) = self.ray.hits_triangle(corners) {
                self.hits.push(PickHit {
                    shape: visit.id,
                    host: visit.node.pick_host(),
                    triangle: i,
                    distance,
                });
            }
        }
        true
    }

    fn check_group(&mut self, visit: &Visit<'_>) -> bool {
        visit
            .node
            .current_bounds()
            .is_none_or(|bounds| bounds.is_empty() || self.ray.hits_bounds(&bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameInfo;
    use crate::walk::traverse;
    use arbor_geometry::{GeometryArray, Topology};
    use arbor_scene::{GeometryObject, Scene, Shape};

    fn quad_at(z: f32) -> Shape {
        let corners = vec![
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(-1.0, 1.0, z),
            Vec3::new(1.0, 1.0, z),
        ];
        Shape::new(GeometryObject::shared(
            GeometryArray::new(Topology::QuadList, corners).unwrap(),
        ))
    }

    #[test]
    fn ray_hits_triangle_in_front() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let distance = ray.hits_triangle(triangle).unwrap();
        assert!((distance - 5.0).abs() < 1e-5);
        let behind = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::Z);
        assert_eq!(behind.hits_triangle(triangle), None);
    }

    #[test]
    fn slab_test() {
        let ray = Ray::new(Vec3::new(0.5, 0.5, -5.0), Vec3::Z);
        assert!(ray.hits_bounds(&Bounds::new(Vec3::ZERO, Vec3::ONE)));
        assert!(!ray.hits_bounds(&Bounds::new(Vec3::splat(2.0), Vec3::splat(3.0))));
    }

    #[test]
    fn closest_hit_reports_pick_host() {
        let mut scene = Scene::new();
        let root = scene.root();
        let host = scene.create_group();
        let near = scene.create_leaf(quad_at(0.0));
        let far = scene.create_leaf(quad_at(-4.0));
        scene.attach(host, near, 0).unwrap();
        scene.attach(root, host, 0).unwrap();
        scene.attach(root, far, 1).unwrap();
        scene.set_pickable(host, true).unwrap();
        scene.update_bounds(root, false).unwrap();

        let mut pick = PickCallback::new(Ray::new(Vec3::new(0.1, 0.3, 10.0), Vec3::NEG_Z));
        assert!(traverse(&scene, root, &FrameInfo::default(), &mut pick));
        assert_eq!(pick.hits().len(), 2);
        let closest = pick.closest().unwrap();
        assert_eq!(closest.shape, near);
        assert_eq!(closest.host, Some(host));
        assert!((closest.distance - 10.0).abs() < 1e-4);
    }
}
