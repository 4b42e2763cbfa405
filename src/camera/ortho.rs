use glam::Mat4;

/// Orthographic camera framing a full-screen quad.
///
/// The fixed form spans NDC directly; the aspect-fitted form uses a frustum
/// of height 1 whose width follows the viewport aspect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    /// Left bound.
    pub left: f32,
    /// Right bound.
    pub right: f32,
    /// Top bound.
    pub top: f32,
    /// Bottom bound.
    pub bottom: f32,
    /// Near plane.
    pub near: f32,
    /// Far plane.
    pub far: f32,
}

impl OrthoCamera {
    /// Bounds `(-1, 1, 1, -1)`, matching a 2x2 quad.
    #[must_use]
    pub const fn fullscreen() -> Self {
        Self {
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
            near: -1.0,
            far: 1.0,
        }
    }

    /// Frustum of height `frustum_size` whose width is `aspect` times that.
    #[must_use]
    pub fn fitted(aspect: f32, frustum_size: f32) -> Self {
        let mut camera = Self::fullscreen();
        camera.fit_aspect(aspect, frustum_size);
        camera
    }

    /// Update the bounds for a new aspect ratio.
    pub fn fit_aspect(&mut self, aspect: f32, frustum_size: f32) {
        let half_h = frustum_size * 0.5;
        let half_w = half_h * aspect;
        self.left = -half_w;
        self.right = half_w;
        self.top = half_h;
        self.bottom = -half_h;
    }

    /// Current aspect of the bounds.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        (self.right - self.left) / (self.top - self.bottom)
    }

    /// Projection matrix. Quads lie in the XY plane at z = 0.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

impl Default for OrthoCamera {
    fn default() -> Self {
        Self::fullscreen()
    }
}
