//! Lifecycle shared by the pipeline stages.

use crate::backend::RenderBackend;
use crate::error::PipelineError;

/// Viewport information handed to [`Stage::resize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSize {
    /// Physical viewport size in pixels.
    pub physical: (u32, u32),
    /// Viewport aspect ratio.
    pub aspect: f32,
}

/// Uniform resize/release interface of the stages. Per-frame rendering is
/// stage specific since every stage consumes different inputs.
pub trait Stage {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Follow a viewport change. Must not reallocate anything when the size
    /// is unchanged.
    ///
    /// # Errors
    ///
    /// Backend failures while reallocating targets.
    fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        size: StageSize,
    ) -> Result<(), PipelineError>;

    /// Release every owned backend resource. Calling it again is a no-op.
    fn release(&mut self, backend: &mut dyn RenderBackend);
}

/// Run `f` with auto-clear set to `enabled`, then restore the previous
/// setting whether or not `f` failed.
///
/// # Errors
///
/// Whatever `f` returns.
pub fn with_auto_clear<T>(
    backend: &mut dyn RenderBackend,
    enabled: bool,
    f: impl FnOnce(&mut dyn RenderBackend) -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let previous = backend.auto_clear();
    backend.set_auto_clear(enabled);
    let result = f(&mut *backend);
    backend.set_auto_clear(previous);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    #[test]
    fn auto_clear_is_restored_after_failure() {
        let mut backend = SoftwareBackend::new(4, 4);
        let result: Result<(), _> = with_auto_clear(&mut backend, false, |b| {
            assert!(!b.auto_clear());
            Err(PipelineError::Destroyed)
        });
        assert!(result.is_err());
        assert!(backend.auto_clear());
    }
}
