use smallvec::SmallVec;

use super::{TargetId, TargetRef};
use crate::layers::LayerMask;

/// One executed draw, as recorded in [`BackendStats::draws`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    /// Draw label (`"scene"` for scene renders).
    pub label: &'static str,
    /// Output.
    pub target: TargetRef,
    /// Sampled textures.
    pub inputs: SmallVec<[TargetId; 2]>,
    /// Layer mask of a scene render.
    pub mask: Option<LayerMask>,
    /// Whether the target was cleared before drawing.
    pub cleared: bool,
}

/// Resource lifecycle counters and the draw log of the current frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Targets allocated.
    pub targets_created: u32,
    /// Target reallocations.
    pub targets_resized: u32,
    /// Targets freed.
    pub targets_released: u32,
    /// Quad geometries created.
    pub geometries_created: u32,
    /// Quad geometries freed.
    pub geometries_released: u32,
    /// Materials created.
    pub materials_created: u32,
    /// Materials freed.
    pub materials_released: u32,
    /// Release calls on handles that were already gone.
    pub redundant_releases: u32,
    /// Frames started.
    pub frames: u64,
    /// Draws since the last [`begin_frame`](super::RenderBackend::begin_frame).
    pub draws: Vec<DrawRecord>,
}

impl BackendStats {
    /// Resources currently alive according to the counters.
    #[must_use]
    pub fn live_resources(&self) -> i64 {
        i64::from(self.targets_created) - i64::from(self.targets_released)
            + i64::from(self.geometries_created)
            - i64::from(self.geometries_released)
            + i64::from(self.materials_created)
            - i64::from(self.materials_released)
    }

    /// Number of draws in the log that wrote to `target`.
    #[must_use]
    pub fn writes_to(&self, target: TargetRef) -> usize {
        self.draws.iter().filter(|d| d.target == target).count()
    }

    /// Draws in the log with the given label.
    pub fn draws_labelled<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a DrawRecord> + 'a {
        self.draws.iter().filter(move |d| d.label == label)
    }

    pub(crate) fn record_release(&mut self, released: bool, kind: &str) -> bool {
        if !released {
            self.redundant_releases += 1;
            log::warn!("release of unknown or already released {kind}");
        }
        released
    }
}
