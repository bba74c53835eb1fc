use arbor_common::{Bounds, Color, IdAllocator};
use glam::Vec3;

use crate::NodeId;
use crate::shape::Shape;

/// Region an environment leaf (fog, light) affects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Influence {
    None,
    Bounds(Bounds),
    /// Shared region owned by a [`BoundingLeaf`] elsewhere in the scene.
    Leaf(NodeId),
}

/// A region other nodes refer to by id. Contributes nothing to its parent's
/// bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingLeaf {
    pub region: Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogMode {
    Linear { front: f32, back: f32 },
    Exponential { density: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fog {
    id: u64,
    pub color: Color,
    pub mode: FogMode,
    pub influence: Influence,
}

impl Fog {
    pub fn linear(ids: &IdAllocator, color: Color, front: f32, back: f32) -> Self {
        Self::with_mode(ids, color, FogMode::Linear { front, back })
    }

    pub fn exponential(ids: &IdAllocator, color: Color, density: f32) -> Self {
        Self::with_mode(ids, color, FogMode::Exponential { density })
    }

    fn with_mode(ids: &IdAllocator, color: Color, mode: FogMode) -> Self {
        Self {
            id: ids.allocate(),
            color,
            mode,
            influence: Influence::None,
        }
    }

    pub fn with_influence(mut self, influence: Influence) -> Self {
        self.influence = influence;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Same parameters under a new id.
    pub fn copy_with_id(&self, ids: &IdAllocator) -> Self {
        Self {
            id: ids.allocate(),
            ..self.clone()
        }
    }

    /// Fog blend factor at `distance` from the eye: 1 is no fog, 0 is fully
    /// fogged.
    pub fn factor(&self, distance: f32) -> f32 {
        match self.mode {
            FogMode::Linear { front, back } => {
                if back <= front {
                    return if distance < front { 1.0 } else { 0.0 };
                }
                ((back - distance) / (back - front)).clamp(0.0, 1.0)
            }
            FogMode::Exponential { density } => (-density * distance).exp().clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional {
        direction: Vec3,
    },
    Point {
        position: Vec3,
        /// Constant, linear and quadratic terms.
        attenuation: Vec3,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub color: Color,
    pub enabled: bool,
    pub kind: LightKind,
    pub influence: Influence,
}

impl Light {
    pub fn new(kind: LightKind, color: Color) -> Self {
        Self {
            color,
            enabled: true,
            kind,
            influence: Influence::None,
        }
    }
}

/// Childless node payloads.
#[derive(Debug, Clone)]
pub enum Leaf {
    Bounding(BoundingLeaf),
    Fog(Fog),
    Light(Light),
    Shape(Shape),
}

impl Leaf {
    pub fn name(&self) -> &'static str {
        match self {
            Leaf::Bounding(_) => "bounding leaf",
            Leaf::Fog(_) => "fog",
            Leaf::Light(_) => "light",
            Leaf::Shape(_) => "shape",
        }
    }

    /// What this leaf adds to its parent's bounds.
    pub fn local_bounds(&self) -> Bounds {
        match self {
            Leaf::Shape(shape) => shape.bounds(),
            Leaf::Bounding(_) | Leaf::Fog(_) | Leaf::Light(_) => Bounds::EMPTY,
        }
    }

    pub fn influence(&self) -> Option<Influence> {
        match self {
            Leaf::Fog(fog) => Some(fog.influence),
            Leaf::Light(light) => Some(light.influence),
            Leaf::Bounding(_) | Leaf::Shape(_) => None,
        }
    }

    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            Leaf::Shape(shape) => Some(shape),
            _ => None,
        }
    }
}

impl From<BoundingLeaf> for Leaf {
    fn from(leaf: BoundingLeaf) -> Self {
        Leaf::Bounding(leaf)
    }
}

impl From<Fog> for Leaf {
    fn from(fog: Fog) -> Self {
        Leaf::Fog(fog)
    }
}

impl From<Light> for Leaf {
    fn from(light: Light) -> Self {
        Leaf::Light(light)
    }
}

impl From<Shape> for Leaf {
    fn from(shape: Shape) -> Self {
        Leaf::Shape(shape)
    }
}
