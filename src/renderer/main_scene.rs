//! Main scene: everything except glow-only geometry, straight to the screen.

use super::stage::with_auto_clear;
use crate::backend::{RenderBackend, SceneView, TargetRef};
use crate::error::PipelineError;

/// Forward render of the visible scene onto the screen after a full clear.
#[derive(Debug, Default)]
pub struct MainScenePass;

impl MainScenePass {
    /// Clear the screen and render `view` onto it.
    ///
    /// # Errors
    ///
    /// Backend render failures.
    pub fn render(
        &self,
        backend: &mut dyn RenderBackend,
        view: &SceneView<'_>,
    ) -> Result<(), PipelineError> {
        with_auto_clear(backend, true, |b| b.render_scene(TargetRef::Screen, view))
    }
}
