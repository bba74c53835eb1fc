use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding volume.
///
/// An empty volume has `min > max` on every axis so that it is the identity
/// of [`Bounds::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// The empty volume. Contains nothing, intersects nothing.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Smallest volume enclosing every point. Empty for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.expand_to_include(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Smallest volume enclosing both. Empty operands are ignored.
    pub fn union(&self, other: &Bounds) -> Bounds {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        !self.is_empty() && point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.cmple(other.max).all()
            && self.max.cmpge(other.min).all()
    }

    /// Center point. Meaningless for an empty volume.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Linear RGB color, components nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bounds_is_union_identity() {
        let b = Bounds::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(Bounds::empty().union(&b), b);
        assert_eq!(b.union(&Bounds::empty()), b);
        assert!(Bounds::empty().union(&Bounds::empty()).is_empty());
    }

    #[test]
    fn new_orders_corners() {
        let b = Bounds::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ONE);
    }

    #[test]
    fn from_points_encloses_all() {
        let b = Bounds::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 3.0, 5.0),
            Vec3::ZERO,
        ]);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 3.0, 5.0));
        assert!(Bounds::from_points(std::iter::empty()).is_empty());
    }

    #[test]
    fn intersection_and_containment() {
        let a = Bounds::new(Vec3::ZERO, Vec3::splat(2.0));
        let b = Bounds::new(Vec3::ONE, Vec3::splat(3.0));
        let c = Bounds::new(Vec3::splat(5.0), Vec3::splat(6.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&Bounds::empty()));
        assert!(a.contains_point(Vec3::ONE));
        assert!(!a.contains_point(Vec3::splat(2.5)));
        assert_eq!(a.center(), Vec3::ONE);
    }

    #[test]
    fn color_default_is_black() {
        assert_eq!(Color::default(), Color::BLACK);
    }
}
