//! Resource cache: per-object, per-render-context GPU handle bookkeeping.
//!
//! The core never talks to a graphics API. A backend allocates a native
//! handle, registers it here under its [`ContextId`], asks
//! [`ResourceTable::reference_exists`] before reuse, and frees whatever
//! [`ResourceTable::reclaim`] hands back.
//!
//! # Invariants
//! - At most one live handle per (object, context) pair.
//! - A handle only reaches pending-destroy through an explicit request, and
//!   leaves it only by being reclaimed by its own context.
//! - Queries for unknown contexts are misses, never errors.

mod context;
mod dirty;
mod table;

pub use context::{ContextId, ContextRegistry};
pub use dirty::DirtyState;
pub use table::{NativeHandle, ResourceTable};

/// Errors from resource bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{0} already holds a handle for this object")]
    AlreadyRegistered(ContextId),
    #[error("render context limit reached ({max})")]
    TooManyContexts { max: usize },
}

/// Everything a GPU-backed scene object carries: its per-context handle
/// table and its CPU-side dirty state.
#[derive(Debug, Default)]
pub struct ResourceState {
    table: ResourceTable,
    dirty: DirtyState,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn dirty(&self) -> &DirtyState {
        &self.dirty
    }

    /// Whether `ctx` must (re)upload this object before drawing it.
    pub fn needs_upload(&self, ctx: ContextId) -> bool {
        !self.table.reference_exists(ctx) || self.dirty.is_dirty()
    }

    /// End of the object's lifetime: every context should drop its handle.
    pub fn release(&self) -> usize {
        self.table.request_destroy_all()
    }
}

pub fn crate_info() -> &'static str {
    "arbor-resource v0.1.0"
}
