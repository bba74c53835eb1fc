use serde::{Deserialize, Serialize};

/// How a vertex (or index) sequence is read as primitives.
///
/// Every variant applies to both direct and indexed storage: for indexed
/// geometry the rule runs over the index buffer and each index is then
/// resolved to a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Independent triangles, three elements each.
    TriangleList,
    /// Packed strips; triangle `j` of a strip uses elements `j, j+1, j+2`.
    TriangleStrip(StripTable),
    /// Packed fans; triangle `j` of a fan uses its first element, `j+1`, `j+2`.
    TriangleFan(StripTable),
    /// Independent quads, four elements each, split along a fixed diagonal.
    QuadList,
    /// Independent segments, two elements each.
    LineList,
    /// Packed polylines; segment `j` of a strip uses elements `j, j+1`.
    LineStrip(StripTable),
}

impl Topology {
    pub fn triangle_strip(counts: impl Into<Vec<usize>>) -> Self {
        Self::TriangleStrip(StripTable::new(counts))
    }

    pub fn triangle_fan(counts: impl Into<Vec<usize>>) -> Self {
        Self::TriangleFan(StripTable::new(counts))
    }

    pub fn line_strip(counts: impl Into<Vec<usize>>) -> Self {
        Self::LineStrip(StripTable::new(counts))
    }

    pub fn is_lines(&self) -> bool {
        matches!(self, Self::LineList | Self::LineStrip(_))
    }

    pub fn strip_table(&self) -> Option<&StripTable> {
        match self {
            Self::TriangleStrip(t) | Self::TriangleFan(t) | Self::LineStrip(t) => Some(t),
            _ => None,
        }
    }

    /// Short lowercase name, used in logs and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TriangleList => "triangles",
            Self::TriangleStrip(_) => "triangle-strip",
            Self::TriangleFan(_) => "triangle-fan",
            Self::QuadList => "quads",
            Self::LineList => "lines",
            Self::LineStrip(_) => "line-strip",
        }
    }
}

/// Per-strip element counts for strip and fan topologies.
///
/// An empty table means "one strip spanning every valid element".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripTable {
    counts: Vec<usize>,
}

/// Where a global primitive or element index lands inside a strip table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLocation {
    /// Which strip.
    pub strip: usize,
    /// Index local to that strip.
    pub local: usize,
    /// Element offset of the strip's first element.
    pub offset: usize,
}

impl StripTable {
    pub fn new(counts: impl Into<Vec<usize>>) -> Self {
        Self {
            counts: counts.into(),
        }
    }

    /// A table describing a single strip over every valid element.
    pub fn single() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Sum of the explicit strip lengths (0 for a single implicit strip).
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    fn lengths<'a>(&'a self, element_count: &'a usize) -> &'a [usize] {
        if self.counts.is_empty() {
            std::slice::from_ref(element_count)
        } else {
            &self.counts
        }
    }

    /// Primitives in strip `strip` when each strip of length `L` yields
    /// `L - loss` of them (1 for lines, 2 for triangles).
    pub fn strip_primitive_count(&self, element_count: usize, strip: usize, loss: usize) -> usize {
        self.lengths(&element_count)
            .get(strip)
            .map_or(0, |len| len.saturating_sub(loss))
    }

    /// Total primitives across all strips.
    pub fn primitive_count(&self, element_count: usize, loss: usize) -> usize {
        self.lengths(&element_count)
            .iter()
            .map(|len| len.saturating_sub(loss))
            .sum()
    }

    /// Resolve a global primitive index by walking the strip lengths and
    /// accumulating offsets until the containing strip is found.
    pub fn locate_primitive(
        &self,
        element_count: usize,
        primitive: usize,
        loss: usize,
    ) -> Option<StripLocation> {
        let mut first = 0;
        let mut offset = 0;
        for (strip, &len) in self.lengths(&element_count).iter().enumerate() {
            let n = len.saturating_sub(loss);
            if primitive < first + n {
                return Some(StripLocation {
                    strip,
                    local: primitive - first,
                    offset,
                });
            }
            first += n;
            offset += len;
        }
        None
    }

    /// Resolve a global element (vertex or index slot) to its strip.
    pub fn locate_element(&self, element_count: usize, element: usize) -> Option<StripLocation> {
        self.locate_primitive(element_count, element, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_strip_spans_all_elements() {
        let table = StripTable::single();
        assert_eq!(table.primitive_count(5, 2), 3);
        assert_eq!(table.primitive_count(1, 2), 0);
        assert_eq!(
            table.locate_primitive(5, 2, 2),
            Some(StripLocation {
                strip: 0,
                local: 2,
                offset: 0
            })
        );
        assert!(table.locate_primitive(5, 3, 2).is_none());
    }

    #[test]
    fn line_strip_counts_per_strip() {
        let table = StripTable::new([4, 3]);
        assert_eq!(table.strip_primitive_count(7, 0, 1), 3);
        assert_eq!(table.strip_primitive_count(7, 1, 1), 2);
        assert_eq!(table.primitive_count(7, 1), 5);
    }

    #[test]
    fn locate_walks_strip_table() {
        let table = StripTable::new([4, 3]);
        // Lines 0..3 live in the first strip, lines 3..5 in the second.
        let loc = table.locate_primitive(7, 3, 1).unwrap();
        assert_eq!((loc.strip, loc.local, loc.offset), (1, 0, 4));
        let loc = table.locate_primitive(7, 4, 1).unwrap();
        assert_eq!((loc.strip, loc.local, loc.offset), (1, 1, 4));
        assert!(table.locate_primitive(7, 5, 1).is_none());
    }

    #[test]
    fn element_four_starts_second_strip() {
        let table = StripTable::new([4, 3]);
        let loc = table.locate_element(7, 4).unwrap();
        assert_eq!((loc.strip, loc.local), (1, 0));
        let loc = table.locate_element(7, 3).unwrap();
        assert_eq!((loc.strip, loc.local), (0, 3));
    }

    #[test]
    fn degenerate_strips_yield_nothing() {
        let table = StripTable::new([2, 0, 3]);
        assert_eq!(table.primitive_count(5, 2), 1);
        let loc = table.locate_primitive(5, 0, 2).unwrap();
        assert_eq!((loc.strip, loc.offset), (2, 2));
    }

    #[test]
    fn topology_names() {
        assert_eq!(Topology::QuadList.name(), "quads");
        assert!(Topology::line_strip([2]).is_lines());
        assert!(!Topology::TriangleList.is_lines());
        assert_eq!(Topology::triangle_fan([5]).strip_table().unwrap().total(), 5);
    }
}
