use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::{ContextId, ResourceError};

/// Opaque native handle owned by the graphics backend (buffer name, pipeline
/// index, ...). The core stores it and hands it back; it never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeHandle(pub u64);

const VACANT: u8 = 0;
const LIVE: u8 = 1;
const PENDING_DESTROY: u8 = 2;

/// One (object, context) entry.
#[derive(Debug)]
struct Slot {
    state: AtomicU8,
    handle: AtomicU64,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            state: AtomicU8::new(VACANT),
            handle: AtomicU64::new(0),
        }
    }
}

/// Per-object table of native handles, one slot per render context.
///
/// Each slot moves `vacant -> live -> pending-destroy -> vacant`. Only the
/// owning context registers and reclaims its slot; any thread may request
/// destruction. The table grows to the highest context index ever
/// registered and never shrinks.
#[derive(Debug, Default)]
pub struct ResourceTable {
    slots: RwLock<Vec<Slot>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly allocated handle for `ctx`.
    ///
    /// Fails if the slot still holds a live or pending-destroy handle: a
    /// context must reclaim before it registers again.
    pub fn register(&self, ctx: ContextId, handle: NativeHandle) -> Result<(), ResourceError> {
        self.ensure_slot(ctx);
        let slots = self.slots.read();
        let slot = &slots[ctx.index()];
        if slot.state.load(Ordering::Acquire) != VACANT {
            return Err(ResourceError::AlreadyRegistered(ctx));
        }
        slot.handle.store(handle.0, Ordering::Relaxed);
        slot.state.store(LIVE, Ordering::Release);
        tracing::trace!(%ctx, handle = handle.0, "resource registered");
        Ok(())
    }

    fn ensure_slot(&self, ctx: ContextId) {
        if ctx.index() < self.slots.read().len() {
            return;
        }
        let mut slots = self.slots.write();
        while slots.len() <= ctx.index() {
            slots.push(Slot::vacant());
        }
    }

    fn state(&self, ctx: ContextId) -> u8 {
        self.slots
            .read()
            .get(ctx.index())
            .map_or(VACANT, |slot| slot.state.load(Ordering::Acquire))
    }

    /// Whether a usable handle is registered for `ctx`. Unknown contexts and
    /// handles awaiting destruction both report `false`.
    pub fn reference_exists(&self, ctx: ContextId) -> bool {
        self.state(ctx) == LIVE
    }

    /// The live handle for `ctx`, if any.
    pub fn handle(&self, ctx: ContextId) -> Option<NativeHandle> {
        let slots = self.slots.read();
        let slot = slots.get(ctx.index())?;
        (slot.state.load(Ordering::Acquire) == LIVE)
            .then(|| NativeHandle(slot.handle.load(Ordering::Relaxed)))
    }

    /// Whether `ctx` has a handle waiting to be reclaimed.
    pub fn pending_destroy(&self, ctx: ContextId) -> bool {
        self.state(ctx) == PENDING_DESTROY
    }

    /// Mark the handle for `ctx` for reclamation. Idempotent; a no-op for
    /// contexts without a live handle. Returns whether this call marked it.
    pub fn request_destroy(&self, ctx: ContextId) -> bool {
        let slots = self.slots.read();
        let Some(slot) = slots.get(ctx.index()) else {
            return false;
        };
        let marked = slot
            .state
            .compare_exchange(LIVE, PENDING_DESTROY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if marked {
            tracing::trace!(%ctx, "resource destroy requested");
        }
        marked
    }

    /// Mark every live handle for reclamation. Used when the owning object
    /// is torn down. Returns how many handles were marked.
    pub fn request_destroy_all(&self) -> usize {
        let slots = self.slots.read();
        let marked = slots
            .iter()
            .filter(|slot| {
                slot.state
                    .compare_exchange(LIVE, PENDING_DESTROY, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            })
            .count();
        if marked > 0 {
            tracing::debug!(marked, "all resource handles marked for destroy");
        }
        marked
    }

    /// Called by the owning context: remove a pending-destroy entry and hand
    /// back the native handle so the backend can free it. Live and vacant
    /// slots are left alone.
    pub fn reclaim(&self, ctx: ContextId) -> Option<NativeHandle> {
        let slots = self.slots.read();
        let slot = slots.get(ctx.index())?;
        let handle = NativeHandle(slot.handle.load(Ordering::Relaxed));
        slot.state
            .compare_exchange(PENDING_DESTROY, VACANT, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        tracing::trace!(%ctx, handle = handle.0, "resource reclaimed");
        Some(handle)
    }

    /// Contexts currently holding a live handle.
    pub fn live_contexts(&self) -> Vec<ContextId> {
        self.slots
            .read()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state.load(Ordering::Acquire) == LIVE)
            .map(|(i, _)| ContextId::new(i as u32))
            .collect()
    }

    /// Number of context slots allocated so far.
    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }
}
