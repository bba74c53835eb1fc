use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arbor_common::Bounds;
use arbor_geometry::GeometryArray;
use arbor_resource::ResourceState;
use parking_lot::{RwLock, RwLockReadGuard};

/// Vertex data shared between shapes, with its GPU bookkeeping.
///
/// Every mutation goes through [`GeometryObject::edit`], which marks the
/// object dirty so each render context re-uploads it, and bumps the
/// generation that shapes compare against their cached bounds.
#[derive(Debug)]
pub struct GeometryObject {
    data: RwLock<GeometryArray>,
    generation: AtomicU64,
    resources: ResourceState,
}

impl GeometryObject {
    pub fn new(data: GeometryArray) -> Self {
        Self {
            data: RwLock::new(data),
            generation: AtomicU64::new(0),
            resources: ResourceState::new(),
        }
    }

    pub fn shared(data: GeometryArray) -> Arc<Self> {
        Arc::new(Self::new(data))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, GeometryArray> {
        self.data.read()
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut GeometryArray) -> R) -> R {
        let result = f(&mut self.data.write());
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.resources.dirty().mark_dirty();
        result
    }

    /// Number of edits so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn bounds(&self) -> Bounds {
        self.data.read().bounds()
    }

    pub fn resources(&self) -> &ResourceState {
        &self.resources
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub source: String,
}

/// Named set of stage sources. Compiling them is the backend's job.
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    stages: RwLock<Vec<ShaderSource>>,
    resources: ResourceState,
}

impl ShaderProgram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: RwLock::new(Vec::new()),
            resources: ResourceState::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set or replace the source for `stage`.
    pub fn set_stage(&self, stage: ShaderStage, source: impl Into<String>) {
        let source = source.into();
        {
            let mut stages = self.stages.write();
            match stages.iter_mut().find(|s| s.stage == stage) {
                Some(existing) => existing.source = source,
                None => stages.push(ShaderSource { stage, source }),
            }
        }
        self.resources.dirty().mark_dirty();
    }

    pub fn stage(&self, stage: ShaderStage) -> Option<String> {
        self.stages
            .read()
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.source.clone())
    }

    pub fn stage_count(&self) -> usize {
        self.stages.read().len()
    }

    pub fn resources(&self) -> &ResourceState {
        &self.resources
    }
}

/// A drawable leaf. Geometry and shader are shared, not owned.
#[derive(Debug, Clone)]
pub struct Shape {
    pub geometry: Arc<GeometryObject>,
    pub shader: Option<Arc<ShaderProgram>>,
}

impl Shape {
    pub fn new(geometry: Arc<GeometryObject>) -> Self {
        Self {
            geometry,
            shader: None,
        }
    }

    pub fn with_shader(mut self, shader: Arc<ShaderProgram>) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn bounds(&self) -> Bounds {
        self.geometry.bounds()
    }

    /// Resource states this shape draws with, geometry first.
    pub fn resource_states(&self) -> impl Iterator<Item = &ResourceState> {
        std::iter::once(self.geometry.resources())
            .chain(self.shader.as_deref().map(ShaderProgram::resources))
    }
}
