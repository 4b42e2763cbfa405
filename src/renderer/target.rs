//! Render targets sized relative to the physical viewport.

use crate::backend::{RenderBackend, TargetDescriptor, TargetId};
use crate::error::PipelineError;

/// `floor(physical * scale)` per axis.
#[must_use]
pub fn scaled_size(physical: (u32, u32), scale: f32) -> (u32, u32) {
    let scale = scale.max(0.0);
    (
        (physical.0 as f32 * scale).floor() as u32,
        (physical.1 as f32 * scale).floor() as u32,
    )
}

/// An owned off-screen target that follows the viewport at a fixed scale.
///
/// The logical size is always derived from the physical viewport, never
/// from the previous size, so resize sequences cannot drift. A zero logical
/// size is kept as is (the backend holds a 1x1 texture) and reported by
/// [`is_empty`](Self::is_empty) so stages can skip drawing.
#[derive(Debug)]
pub struct ScaledTarget {
    id: TargetId,
    label: &'static str,
    scale: f32,
    size: (u32, u32),
    live: bool,
}

impl ScaledTarget {
    /// Allocate a target for `physical` at `scale`.
    ///
    /// # Errors
    ///
    /// Backend allocation failures such as an unsupported format.
    pub fn new(
        backend: &mut dyn RenderBackend,
        desc: TargetDescriptor,
        physical: (u32, u32),
        scale: f32,
    ) -> Result<Self, PipelineError> {
        let size = scaled_size(physical, scale);
        let id = backend.create_target(&TargetDescriptor {
            width: size.0,
            height: size.1,
            ..desc
        })?;
        log::debug!("created {} at {}x{}", desc.label, size.0, size.1);
        Ok(Self {
            id,
            label: desc.label,
            scale,
            size,
            live: true,
        })
    }

    /// Backend handle.
    #[must_use]
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Logical size.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Scale relative to the physical viewport.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Whether the logical size has zero area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.0 == 0 || self.size.1 == 0
    }

    /// Follow a new physical viewport size. Returns whether the backend
    /// target was reallocated.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StaleHandle`] if the target was released.
    pub fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        physical: (u32, u32),
    ) -> Result<bool, PipelineError> {
        let size = scaled_size(physical, self.scale);
        if size == self.size {
            return Ok(false);
        }
        backend.resize_target(self.id, size.0, size.1)?;
        log::debug!(
            "{}: {}x{} -> {}x{}",
            self.label,
            self.size.0,
            self.size.1,
            size.0,
            size.1
        );
        self.size = size;
        Ok(true)
    }

    /// Change the scale and resize for `physical`.
    ///
    /// # Errors
    ///
    /// See [`resize`](Self::resize).
    pub fn set_scale(
        &mut self,
        backend: &mut dyn RenderBackend,
        scale: f32,
        physical: (u32, u32),
    ) -> Result<bool, PipelineError> {
        self.scale = scale;
        self.resize(backend, physical)
    }

    /// Release the backend target. Later calls do nothing.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if std::mem::take(&mut self.live) {
            let _ = backend.release_target(self.id);
        } else {
            log::warn!("{} released twice", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    #[test]
    fn scaled_size_floors() {
        assert_eq!(scaled_size((800, 600), 0.5), (400, 300));
        assert_eq!(scaled_size((801, 601), 0.5), (400, 300));
        assert_eq!(scaled_size((1, 1), 0.5), (0, 0));
    }

    #[test]
    fn resize_only_reallocates_on_change() {
        let mut backend = SoftwareBackend::new(800, 600);
        let mut target = ScaledTarget::new(
            &mut backend,
            TargetDescriptor::hdr("bloom", 0, 0),
            (800, 600),
            0.5,
        )
        .unwrap();
        assert_eq!(backend.target_size(target.id()), Some((400, 300)));

        assert!(!target.resize(&mut backend, (800, 600)).unwrap());
        assert!(target.resize(&mut backend, (1920, 1080)).unwrap());
        assert!(target.resize(&mut backend, (800, 600)).unwrap());
        assert_eq!(target.size(), (400, 300));
        assert_eq!(backend.target_size(target.id()), Some((400, 300)));
        assert_eq!(backend.stats().targets_resized, 2);
    }

    #[test]
    fn zero_area_is_reported_empty() {
        let mut backend = SoftwareBackend::new(1, 1);
        let mut target = ScaledTarget::new(
            &mut backend,
            TargetDescriptor::hdr("glow", 0, 0),
            (1, 1),
            0.5,
        )
        .unwrap();
        assert!(target.is_empty());
        assert_eq!(backend.target_size(target.id()), Some((1, 1)));

        let _ = target.resize(&mut backend, (4, 4)).unwrap();
        assert!(!target.is_empty());
    }

    #[test]
    fn release_happens_once() {
        let mut backend = SoftwareBackend::new(8, 8);
        let mut target = ScaledTarget::new(
            &mut backend,
            TargetDescriptor::hdr("glow", 0, 0),
            (8, 8),
            1.0,
        )
        .unwrap();
        target.release(&mut backend);
        target.release(&mut backend);
        assert_eq!(backend.stats().targets_released, 1);
        assert_eq!(backend.stats().redundant_releases, 0);
    }
}
