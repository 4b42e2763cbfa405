//! Full-screen quads: geometry, material and the orthographic camera that
//! frames them.

use crate::backend::{
    GeometryId, MaterialDescriptor, MaterialId, QuadDraw, QuadUniforms,
    RenderBackend, TargetId, TargetRef,
};
use crate::camera::OrthoCamera;
use crate::error::PipelineError;

/// Aspect changes at or below this do not regenerate fitted geometry.
pub const ASPECT_EPSILON: f32 = 0.01;

/// Height of the fitted quad frustum.
const FRUSTUM_SIZE: f32 = 1.0;

/// How the quad follows the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadFit {
    /// 2x2 plane under the NDC-spanning camera; never regenerated.
    Fixed,
    /// Plane of height 1 and width `aspect`, regenerated on aspect change.
    Aspect,
}

/// Screen-aligned quad with its own material.
#[derive(Debug)]
pub struct FullScreenQuad {
    geometry: GeometryId,
    material: MaterialId,
    camera: OrthoCamera,
    fit: QuadFit,
    aspect: f32,
    live: bool,
}

impl FullScreenQuad {
    /// Create geometry and material.
    ///
    /// # Errors
    ///
    /// Material creation failures.
    pub fn new(
        backend: &mut dyn RenderBackend,
        material: &MaterialDescriptor,
        fit: QuadFit,
        aspect: f32,
    ) -> Result<Self, PipelineError> {
        let material = backend.create_material(material)?;
        let (geometry, camera) = match fit {
            QuadFit::Fixed => {
                (backend.create_plane(2.0, 2.0), OrthoCamera::fullscreen())
            }
            QuadFit::Aspect => (
                backend.create_plane(FRUSTUM_SIZE * aspect, FRUSTUM_SIZE),
                OrthoCamera::fitted(aspect, FRUSTUM_SIZE),
            ),
        };
        Ok(Self {
            geometry,
            material,
            camera,
            fit,
            aspect,
            live: true,
        })
    }

    /// Orthographic camera used for the quad.
    #[must_use]
    pub fn camera(&self) -> &OrthoCamera {
        &self.camera
    }

    /// Current geometry handle.
    #[must_use]
    pub fn geometry(&self) -> GeometryId {
        self.geometry
    }

    /// Follow a viewport aspect change. Returns whether the geometry was
    /// regenerated.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, aspect: f32) -> bool {
        if self.fit == QuadFit::Fixed
            || (aspect - self.aspect).abs() <= ASPECT_EPSILON
        {
            return false;
        }
        let _ = backend.release_geometry(self.geometry);
        self.geometry = backend.create_plane(FRUSTUM_SIZE * aspect, FRUSTUM_SIZE);
        self.camera.fit_aspect(aspect, FRUSTUM_SIZE);
        log::debug!("quad aspect {:.3} -> {aspect:.3}", self.aspect);
        self.aspect = aspect;
        true
    }

    /// Draw the quad into `target`, sampling `inputs`.
    ///
    /// # Errors
    ///
    /// Whatever the backend rejects (feedback loops, stale handles).
    pub fn draw(
        &self,
        backend: &mut dyn RenderBackend,
        label: &'static str,
        target: TargetRef,
        inputs: &[TargetId],
        uniforms: QuadUniforms,
    ) -> Result<(), PipelineError> {
        backend.draw_quad(&QuadDraw {
            label,
            target,
            geometry: self.geometry,
            material: self.material,
            projection: self.camera.projection(),
            inputs,
            uniforms,
        })
    }

    /// Release geometry and material. Later calls do nothing.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if std::mem::take(&mut self.live) {
            let _ = backend.release_geometry(self.geometry);
            let _ = backend.release_material(self.material);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BlendMode, CompositeKind, QuadShader, SoftwareBackend};

    const COMPOSITE: MaterialDescriptor = MaterialDescriptor {
        label: "composite",
        shader: QuadShader::Composite(CompositeKind::Bloom),
        blend: BlendMode::Additive,
    };

    #[test]
    fn fitted_quad_regenerates_only_past_epsilon() {
        let mut backend = SoftwareBackend::new(8, 8);
        let mut quad =
            FullScreenQuad::new(&mut backend, &COMPOSITE, QuadFit::Aspect, 4.0 / 3.0)
                .unwrap();
        let first = quad.geometry();

        assert!(!quad.resize(&mut backend, 4.0 / 3.0 + 0.005));
        assert_eq!(quad.geometry(), first);
        assert_eq!(backend.stats().geometries_released, 0);

        assert!(quad.resize(&mut backend, 16.0 / 9.0));
        assert_ne!(quad.geometry(), first);
        assert_eq!(backend.stats().geometries_released, 1);
        assert!((quad.camera().aspect() - 16.0 / 9.0).abs() < 1e-5);

        assert!(!quad.resize(&mut backend, 16.0 / 9.0));
        assert_eq!(backend.stats().geometries_released, 1);
    }

    #[test]
    fn fixed_quad_never_regenerates() {
        let mut backend = SoftwareBackend::new(8, 8);
        let mut quad =
            FullScreenQuad::new(&mut backend, &COMPOSITE, QuadFit::Fixed, 1.0)
                .unwrap();
        assert!(!quad.resize(&mut backend, 3.0));
        assert_eq!(*quad.camera(), OrthoCamera::fullscreen());
    }

    #[test]
    fn release_frees_geometry_and_material_once() {
        let mut backend = SoftwareBackend::new(8, 8);
        let mut quad =
            FullScreenQuad::new(&mut backend, &COMPOSITE, QuadFit::Fixed, 1.0)
                .unwrap();
        quad.release(&mut backend);
        quad.release(&mut backend);
        let stats = backend.stats();
        assert_eq!(stats.geometries_released, 1);
        assert_eq!(stats.materials_released, 1);
        assert_eq!(stats.live_resources(), 0);
    }
}
