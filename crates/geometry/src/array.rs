use arbor_common::Bounds;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::topology::Topology;
use crate::view::TriangleView;

/// Errors from constructing or resizing a [`GeometryArray`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("strip counts sum to {total} but only {available} elements are stored")]
    StripCountsExceedBuffer { total: usize, available: usize },
    #[error("valid count {requested} exceeds buffer length {len}")]
    ValidCountOutOfRange { requested: usize, len: usize },
    #[error("geometry is not indexed")]
    NotIndexed,
}

/// Vertex storage plus an optional index buffer, read through a [`Topology`].
///
/// Only a prefix of each buffer is "valid": decomposition never reads past
/// `valid_vertex_count` vertices or `valid_index_count` indices, which lets a
/// loader fill buffers incrementally while pickers already sweep them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryArray {
    topology: Topology,
    vertices: Vec<Vec3>,
    indices: Option<Vec<u32>>,
    valid_vertex_count: usize,
    valid_index_count: usize,
}

impl GeometryArray {
    /// Direct (non-indexed) geometry. Every stored vertex starts valid.
    pub fn new(topology: Topology, vertices: Vec<Vec3>) -> Result<Self, GeometryError> {
        check_strip_counts(&topology, vertices.len())?;
        Ok(Self {
            topology,
            valid_vertex_count: vertices.len(),
            vertices,
            indices: None,
            valid_index_count: 0,
        })
    }

    /// Indexed geometry. The topology rule runs over `indices`.
    pub fn indexed(
        topology: Topology,
        vertices: Vec<Vec3>,
        indices: Vec<u32>,
    ) -> Result<Self, GeometryError> {
        check_strip_counts(&topology, indices.len())?;
        Ok(Self {
            topology,
            valid_vertex_count: vertices.len(),
            vertices,
            valid_index_count: indices.len(),
            indices: Some(indices),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn valid_vertex_count(&self) -> usize {
        self.valid_vertex_count
    }

    pub fn valid_index_count(&self) -> usize {
        self.valid_index_count
    }

    pub fn set_valid_vertex_count(&mut self, count: usize) -> Result<(), GeometryError> {
        if count > self.vertices.len() {
            return Err(GeometryError::ValidCountOutOfRange {
                requested: count,
                len: self.vertices.len(),
            });
        }
        self.valid_vertex_count = count;
        Ok(())
    }

    pub fn set_valid_index_count(&mut self, count: usize) -> Result<(), GeometryError> {
        let len = self.indices.as_ref().ok_or(GeometryError::NotIndexed)?.len();
        if count > len {
            return Err(GeometryError::ValidCountOutOfRange {
                requested: count,
                len,
            });
        }
        self.valid_index_count = count;
        Ok(())
    }

    /// Overwrite one index slot. Returns `false` for a non-indexed array or
    /// an out-of-range slot.
    pub fn set_index(&mut self, slot: usize, vertex: u32) -> bool {
        match self.indices.as_mut().and_then(|ix| ix.get_mut(slot)) {
            Some(entry) => {
                *entry = vertex;
                true
            }
            None => false,
        }
    }

    /// Number of elements the topology rule runs over: valid indices for
    /// indexed geometry, valid vertices otherwise.
    pub fn element_count(&self) -> usize {
        if self.indices.is_some() {
            self.valid_index_count
        } else {
            self.valid_vertex_count
        }
    }

    /// Map an element to a vertex index, checking both the element and the
    /// vertex it names against the valid ranges.
    fn resolve(&self, element: usize) -> Option<usize> {
        if element >= self.element_count() {
            return None;
        }
        let vertex = match &self.indices {
            Some(indices) => *indices.get(element)? as usize,
            None => element,
        };
        (vertex < self.valid_vertex_count).then_some(vertex)
    }

    fn resolve_all<const N: usize>(&self, elements: [usize; N]) -> Option<[usize; N]> {
        let mut out = [0; N];
        for (slot, element) in out.iter_mut().zip(elements) {
            *slot = self.resolve(element)?;
        }
        Some(out)
    }

    /// Triangle `i` as element indices, before index resolution.
    fn triangle_elements(&self, i: usize) -> Option<[usize; 3]> {
        let n = self.element_count();
        match &self.topology {
            Topology::TriangleList => {
                (i < n / 3).then(|| [3 * i, 3 * i + 1, 3 * i + 2])
            }
            Topology::TriangleStrip(strips) => {
                let loc = strips.locate_primitive(n, i, 2)?;
                let first = loc.offset + loc.local;
                Some([first, first + 1, first + 2])
            }
            Topology::TriangleFan(strips) => {
                let loc = strips.locate_primitive(n, i, 2)?;
                let hub = loc.offset;
                Some([hub, hub + loc.local + 1, hub + loc.local + 2])
            }
            Topology::QuadList => {
                if i >= n / 4 * 2 {
                    return None;
                }
                let base = (i / 2) * 4;
                if i % 2 == 0 {
                    Some([base, base + 1, base + 2])
                } else {
                    Some([base + 1, base + 2, base + 3])
                }
            }
            Topology::LineList | Topology::LineStrip(_) => None,
        }
    }

    fn line_elements(&self, i: usize) -> Option<[usize; 2]> {
        let n = self.element_count();
        match &self.topology {
            Topology::LineList => (i < n / 2).then(|| [2 * i, 2 * i + 1]),
            Topology::LineStrip(strips) => {
                let loc = strips.locate_primitive(n, i, 1)?;
                let first = loc.offset + loc.local;
                Some([first, first + 1])
            }
            _ => None,
        }
    }

    /// Bounding volume of the valid vertices.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(self.vertices[..self.valid_vertex_count].iter().copied())
    }

    /// Every resolvable triangle with its index. Misses are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = (usize, [Vec3; 3])> + '_ {
        (0..self.triangle_count()).filter_map(|i| self.triangle(i).map(|t| (i, t)))
    }

    /// Every resolvable line segment with its index. Misses are skipped.
    pub fn lines(&self) -> impl Iterator<Item = (usize, [Vec3; 2])> + '_ {
        (0..self.line_count()).filter_map(|i| self.line(i).map(|l| (i, l)))
    }
}

impl TriangleView for GeometryArray {
    fn triangle_count(&self) -> usize {
        let n = self.element_count();
        match &self.topology {
            Topology::TriangleList => n / 3,
            Topology::TriangleStrip(strips) | Topology::TriangleFan(strips) => {
                strips.primitive_count(n, 2)
            }
            Topology::QuadList => n / 4 * 2,
            Topology::LineList | Topology::LineStrip(_) => 0,
        }
    }

    fn triangle_indices(&self, i: usize) -> Option<[usize; 3]> {
        self.resolve_all(self.triangle_elements(i)?)
    }

    fn line_count(&self) -> usize {
        let n = self.element_count();
        match &self.topology {
            Topology::LineList => n / 2,
            Topology::LineStrip(strips) => strips.primitive_count(n, 1),
            _ => 0,
        }
    }

    fn line_indices(&self, i: usize) -> Option<[usize; 2]> {
        self.resolve_all(self.line_elements(i)?)
    }

    fn vertex(&self, index: usize) -> Option<Vec3> {
        (index < self.valid_vertex_count).then(|| self.vertices[index])
    }

    fn write_vertex(&mut self, index: usize, position: Vec3) -> bool {
        if index >= self.valid_vertex_count {
            return false;
        }
        self.vertices[index] = position;
        true
    }
}

fn check_strip_counts(topology: &Topology, available: usize) -> Result<(), GeometryError> {
    if let Some(strips) = topology.strip_table() {
        let total = strips.total();
        if total > available {
            tracing::debug!(total, available, "rejecting strip table");
            return Err(GeometryError::StripCountsExceedBuffer { total, available });
        }
    }
    Ok(())
}
