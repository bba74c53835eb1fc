use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const NEVER_TICKED: u64 = u64::MAX;

/// Dirty flag and staleness counter for a shared scene object.
///
/// Written by the content thread, read by any number of render threads.
/// Release stores and acquire loads make a `mark_dirty` visible to a render
/// thread no later than the start of its next traversal.
///
/// The counter contract: a `false -> true` transition resets
/// `frames_since_dirty` to 0, and each frame tick while clean adds 1. What a
/// renderer does with that number is its own policy.
#[derive(Debug)]
pub struct DirtyState {
    dirty: AtomicBool,
    frames_since_dirty: AtomicU64,
    last_tick: AtomicU64,
}

impl DirtyState {
    /// A new object has never been synced, so it starts dirty.
    pub fn new() -> Self {
        Self::with_flag(true)
    }

    /// State for an object that is already in sync.
    pub fn clean() -> Self {
        Self::with_flag(false)
    }

    fn with_flag(dirty: bool) -> Self {
        Self {
            dirty: AtomicBool::new(dirty),
            frames_since_dirty: AtomicU64::new(0),
            last_tick: AtomicU64::new(NEVER_TICKED),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// CPU-side data changed.
    pub fn mark_dirty(&self) {
        if !self.dirty.swap(true, Ordering::AcqRel) {
            self.frames_since_dirty.store(0, Ordering::Release);
        }
    }

    /// CPU-side data has been synced to the GPU. The counter restarts from
    /// zero, dropping any tick that raced the preceding `mark_dirty`.
    /// Clearing a clean object keeps its age.
    pub fn clear_dirty(&self) {
        if self.dirty.load(Ordering::Acquire) {
            self.frames_since_dirty.store(0, Ordering::Release);
            self.dirty.store(false, Ordering::Release);
        }
    }

    pub fn set_dirty(&self, dirty: bool) {
        if dirty {
            self.mark_dirty();
        } else {
            self.clear_dirty();
        }
    }

    pub fn frames_since_dirty(&self) -> u64 {
        self.frames_since_dirty.load(Ordering::Acquire)
    }

    /// Advance the staleness counter for frame `frame_id`.
    ///
    /// Counts at most once per frame id, so an object reachable from several
    /// places in the tree ages one frame per frame. Returns the counter.
    pub fn tick(&self, frame_id: u64) -> u64 {
        let previous = self.last_tick.swap(frame_id, Ordering::AcqRel);
        if previous != frame_id && !self.is_dirty() {
            return self.frames_since_dirty.fetch_add(1, Ordering::AcqRel) + 1;
        }
        self.frames_since_dirty()
    }

    /// Clean and unchanged for at least `threshold` frames.
    pub fn is_stable(&self, threshold: u64) -> bool {
        !self.is_dirty() && self.frames_since_dirty() >= threshold
    }
}

impl Default for DirtyState {
    fn default() -> Self {
        Self::new()
    }
}
