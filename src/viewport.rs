//! Viewport size tracking.

use std::cell::Cell;
use std::rc::Rc;

/// Upper bound applied to the device pixel ratio.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Logical viewport size plus device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Device pixel ratio, at most [`MAX_PIXEL_RATIO`].
    pub pixel_ratio: f32,
}

impl Viewport {
    /// Viewport with the pixel ratio clamped to `(0, MAX_PIXEL_RATIO]`.
    #[must_use]
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        };
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Width over height; 1.0 for a degenerate viewport.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Size in physical pixels.
    #[must_use]
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).floor() as u32,
            (self.height as f32 * self.pixel_ratio).floor() as u32,
        )
    }

    /// Whether either dimension is zero (minimized window).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let (w, h) = self.physical_size();
        w == 0 || h == 0
    }
}

/// Provider of the current viewport.
pub trait ViewportSource {
    /// Current viewport.
    fn viewport(&self) -> Viewport;
}

/// Host-updated viewport cell.
#[derive(Debug, Clone)]
pub struct SharedViewport(Rc<Cell<Viewport>>);

impl SharedViewport {
    /// Shared viewport with an initial value.
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self(Rc::new(Cell::new(viewport)))
    }

    /// Replace the viewport. Call [`RenderPipeline::resize`] afterwards.
    ///
    /// [`RenderPipeline::resize`]: crate::renderer::RenderPipeline::resize
    pub fn set(&self, viewport: Viewport) {
        self.0.set(viewport);
    }
}

impl ViewportSource for SharedViewport {
    fn viewport(&self) -> Viewport {
        self.0.get()
    }
}

impl ViewportSource for Viewport {
    fn viewport(&self) -> Viewport {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_clamped() {
        let vp = Viewport::new(800, 600, 3.0);
        assert_eq!(vp.pixel_ratio, MAX_PIXEL_RATIO);
        assert_eq!(vp.physical_size(), (1600, 1200));
        assert_eq!(Viewport::new(10, 10, f32::NAN).pixel_ratio, 1.0);
    }

    #[test]
    fn degenerate_viewport() {
        let vp = Viewport::new(800, 0, 1.0);
        assert!(vp.is_empty());
        assert_eq!(vp.aspect(), 1.0);
    }

    #[test]
    fn shared_viewport_updates() {
        let shared = SharedViewport::new(Viewport::new(800, 600, 1.0));
        let handle = shared.clone();
        handle.set(Viewport::new(1920, 1080, 1.0));
        assert_eq!(shared.viewport().width, 1920);
    }
}
