use std::time::{Duration, Instant};

use arbor_common::EngineConfig;
use arbor_scene::{NodeId, Scene};

use crate::callback::TraversalCallback;
use crate::frame::{FrameInfo, View};
use crate::walk::traverse;

/// Per-frame statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frame_id: u64,
    pub completed: bool,
    /// Geometry and shader states ticked, once per referencing shape.
    pub resources_ticked: usize,
    pub stable_resources: usize,
    pub dirty_resources: usize,
    pub frame_time: Duration,
}

/// Drives one traversal per frame and ages resource dirty state.
#[derive(Debug)]
pub struct TraversalEngine {
    frame_id: u64,
    started: Instant,
    stable_frame_threshold: u64,
    stats: FrameStats,
}

impl TraversalEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            frame_id: 0,
            started: Instant::now(),
            stable_frame_threshold: config.stable_frame_threshold,
            stats: FrameStats::default(),
        }
    }

    /// Id of the last frame run; 0 before the first.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Run one frame: traverse `root` with `callback`, then tick the dirty
    /// state of every reachable geometry and shader.
    ///
    /// Returns the traversal result.
    pub fn run_frame<C>(&mut self, scene: &Scene, root: NodeId, view: View, callback: &mut C) -> bool
    where
        C: TraversalCallback + ?Sized,
    {
        self.frame_id += 1;
        let frame_id = self.frame_id;
        let _span = tracing::info_span!("frame", frame_id).entered();
        let frame_start = Instant::now();

        let frame = FrameInfo::new(frame_id, self.started.elapsed()).with_view(view);
        let completed = traverse(scene, root, &frame, callback);

        let mut stats = FrameStats {
            frame_id,
            completed,
            ..FrameStats::default()
        };
        let threshold = self.stable_frame_threshold;
        scene.for_each_resource(root, |resources| {
            let dirty = resources.dirty();
            dirty.tick(frame_id);
            stats.resources_ticked += 1;
            if dirty.is_dirty() {
                stats.dirty_resources += 1;
            } else if dirty.is_stable(threshold) {
                stats.stable_resources += 1;
            }
        });
        stats.frame_time = frame_start.elapsed();

        tracing::trace!(
            completed,
            ticked = stats.resources_ticked,
            stable = stats.stable_resources,
            dirty = stats.dirty_resources,
            "frame complete"
        );
        self.stats = stats;
        completed
    }
}

impl Default for TraversalEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
