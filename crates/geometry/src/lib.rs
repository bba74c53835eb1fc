//! Geometry storage and the uniform triangle view.
//!
//! Picking, culling and bounds code sees every topology (lists, strips,
//! fans, quads, lines, and their indexed forms) through [`TriangleView`]
//! and never matches on the topology itself.
//!
//! # Invariants
//! - Decomposition reads only the valid prefix of each buffer.
//! - An unresolvable primitive is a miss (`None`/`false`), never a panic.
//! - Quads split along a fixed diagonal: `{0,1,2}` then `{1,2,3}`.

mod array;
mod topology;
mod view;

pub use array::{GeometryArray, GeometryError};
pub use topology::{StripLocation, StripTable, Topology};
pub use view::TriangleView;

pub fn crate_info() -> &'static str {
    "arbor-geometry v0.1.0"
}
