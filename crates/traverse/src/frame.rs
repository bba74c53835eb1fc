use std::time::Duration;

use arbor_common::Bounds;
use glam::{Mat4, Vec3, Vec4};

/// Plane `normal . p + distance = 0`; the positive side is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }.normalized()
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    fn from_row(row: Vec4) -> Self {
        Self {
            normal: row.truncate(),
            distance: row.w,
        }
        .normalized()
    }

    fn normalized(self) -> Self {
        let length = self.normal.length();
        if length <= f32::EPSILON {
            return self;
        }
        Self {
            normal: self.normal / length,
            distance: self.distance / length,
        }
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Six inward-facing planes: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Gribb-Hartmann extraction from a view-projection matrix with a
    /// `[0, 1]` depth range.
    pub fn from_view_projection(view_projection: Mat4) -> Self {
        let rows = [
            view_projection.row(0),
            view_projection.row(1),
            view_projection.row(2),
            view_projection.row(3),
        ];
        Self::new([
            Plane::from_row(rows[3] + rows[0]),
            Plane::from_row(rows[3] - rows[0]),
            Plane::from_row(rows[3] + rows[1]),
            Plane::from_row(rows[3] - rows[1]),
            Plane::from_row(rows[2]),
            Plane::from_row(rows[3] - rows[2]),
        ])
    }

    /// Frustum that is exactly the given box.
    pub fn from_bounds(bounds: Bounds) -> Self {
        Self::new([
            Plane::from_point_normal(bounds.min, Vec3::X),
            Plane::from_point_normal(bounds.max, Vec3::NEG_X),
            Plane::from_point_normal(bounds.min, Vec3::Y),
            Plane::from_point_normal(bounds.max, Vec3::NEG_Y),
            Plane::from_point_normal(bounds.min, Vec3::Z),
            Plane::from_point_normal(bounds.max, Vec3::NEG_Z),
        ])
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Conservative box test: may report a box near a corner as visible,
    /// never reports a visible box as outside.
    pub fn intersects(&self, bounds: &Bounds) -> bool {
        if bounds.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let farthest = Vec3::select(plane.normal.cmpge(Vec3::ZERO), bounds.max, bounds.min);
            plane.distance_to_point(farthest) >= 0.0
        })
    }
}

/// Per-frame context every hook sees.
#[derive(Debug, Clone, Default)]
pub struct FrameInfo {
    pub frame_id: u64,
    /// Time since the engine started.
    pub timestamp: Duration,
    pub view_position: Vec3,
    /// `None` disables view culling.
    pub frustum: Option<Frustum>,
}

impl FrameInfo {
    pub fn new(frame_id: u64, timestamp: Duration) -> Self {
        Self {
            frame_id,
            timestamp,
            ..Self::default()
        }
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view_position = view.position;
        self.frustum = view.frustum;
        self
    }

    /// Whether `bounds` may be visible this frame.
    pub fn may_see(&self, bounds: &Bounds) -> bool {
        self.frustum
            .as_ref()
            .is_none_or(|frustum| frustum.intersects(bounds))
    }
}

/// Viewer state supplied by the renderer each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct View {
    pub position: Vec3,
    pub frustum: Option<Frustum>,
}

impl View {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            frustum: None,
        }
    }

    pub fn with_frustum(mut self, frustum: Frustum) -> Self {
        self.frustum = Some(frustum);
        self
    }
}
