use glam::Vec3;

/// Topology-independent triangle and line access.
///
/// Implementors only resolve primitive indices to vertex indices and expose
/// raw vertex reads/writes; the coordinate accessors are provided. Every
/// accessor reports a miss with `None`/`false` instead of panicking, so
/// picking code can sweep partially built geometry in a tight loop.
pub trait TriangleView {
    /// Number of triangles under the topology rule.
    fn triangle_count(&self) -> usize;

    /// Vertex indices of triangle `i`, or `None` if any resolves out of range.
    fn triangle_indices(&self, i: usize) -> Option<[usize; 3]>;

    /// Number of line segments under the topology rule.
    fn line_count(&self) -> usize;

    /// Vertex indices of segment `i`, or `None` if any resolves out of range.
    fn line_indices(&self, i: usize) -> Option<[usize; 2]>;

    /// Position of a valid vertex.
    fn vertex(&self, index: usize) -> Option<Vec3>;

    /// Overwrite a valid vertex. Returns `false` if `index` is out of range.
    fn write_vertex(&mut self, index: usize, position: Vec3) -> bool;

    fn triangle(&self, i: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = self.triangle_indices(i)?;
        Some([self.vertex(a)?, self.vertex(b)?, self.vertex(c)?])
    }

    /// Write the three corners of triangle `i` back into vertex storage.
    ///
    /// For indexed geometry this moves the shared vertices, so neighbouring
    /// triangles change too.
    fn set_triangle(&mut self, i: usize, corners: [Vec3; 3]) -> bool {
        let Some(indices) = self.triangle_indices(i) else {
            return false;
        };
        indices
            .iter()
            .zip(corners)
            .all(|(&index, corner)| self.write_vertex(index, corner))
    }

    fn line(&self, i: usize) -> Option<[Vec3; 2]> {
        let [a, b] = self.line_indices(i)?;
        Some([self.vertex(a)?, self.vertex(b)?])
    }

    fn set_line(&mut self, i: usize, ends: [Vec3; 2]) -> bool {
        let Some(indices) = self.line_indices(i) else {
            return false;
        };
        indices
            .iter()
            .zip(ends)
            .all(|(&index, end)| self.write_vertex(index, end))
    }
}
