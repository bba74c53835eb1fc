//! Shared value types for the arbor scene graph.
//!
//! # Invariants
//! - An empty [`Bounds`] is the identity of union.
//! - Identifiers come from an owned [`IdAllocator`], never from process globals.

mod config;
mod ids;
mod types;

pub use config::{ConfigError, EngineConfig};
pub use ids::IdAllocator;
pub use types::{Bounds, Color};

pub fn crate_info() -> &'static str {
    "arbor-common v0.1.0"
}
