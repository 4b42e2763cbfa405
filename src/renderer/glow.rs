//! Glow capture: glow-tagged geometry into its own reduced-resolution
//! target, sampled later by the composite.

use super::stage::{with_auto_clear, Stage, StageSize};
use super::target::ScaledTarget;
use crate::backend::{
    RenderBackend, SceneView, TargetDescriptor, TargetId, TargetRef,
};
use crate::error::PipelineError;

/// Owns the glow target.
#[derive(Debug)]
pub struct GlowPass {
    target: ScaledTarget,
}

impl GlowPass {
    /// Allocate the glow target for `physical` at `scale`.
    ///
    /// # Errors
    ///
    /// Target allocation failures.
    pub fn new(
        backend: &mut dyn RenderBackend,
        physical: (u32, u32),
        scale: f32,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            target: ScaledTarget::new(
                backend,
                TargetDescriptor::hdr("Glow Target", 0, 0),
                physical,
                scale,
            )?,
        })
    }

    /// The captured glow texture.
    #[must_use]
    pub fn texture(&self) -> TargetId {
        self.target.id()
    }

    /// Logical target size.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.target.size()
    }

    /// Change the resolution scale.
    ///
    /// # Errors
    ///
    /// Target reallocation failures.
    pub fn set_scale(
        &mut self,
        backend: &mut dyn RenderBackend,
        scale: f32,
        physical: (u32, u32),
    ) -> Result<(), PipelineError> {
        let _ = self.target.set_scale(backend, scale, physical)?;
        Ok(())
    }

    /// Clear the target and render `view` into it. Returns `false` when the
    /// target has zero area and nothing was drawn.
    ///
    /// # Errors
    ///
    /// Backend render failures.
    pub fn render(
        &self,
        backend: &mut dyn RenderBackend,
        view: &SceneView<'_>,
    ) -> Result<bool, PipelineError> {
        if self.target.is_empty() {
            log::trace!("glow target is empty, capture skipped");
            return Ok(false);
        }
        let target = TargetRef::Offscreen(self.target.id());
        with_auto_clear(backend, true, |b| b.render_scene(target, view))?;
        Ok(true)
    }
}

impl Stage for GlowPass {
    fn name(&self) -> &'static str {
        "glow"
    }

    fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        size: StageSize,
    ) -> Result<(), PipelineError> {
        let _ = self.target.resize(backend, size.physical)?;
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.target.release(backend);
    }
}
