//! Composite: add the bloom and glow textures onto the main scene already
//! on screen.
//!
//! All draws run with auto-clear off and additive blending. The glow is
//! anchored to the screen projection of the registered glow source.

use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use super::quad::{FullScreenQuad, QuadFit};
use super::stage::{with_auto_clear, Stage, StageSize};
use crate::backend::{
    BlendMode, CompositeKind, CompositeUniforms, MaterialDescriptor,
    QuadShader, QuadUniforms, RenderBackend, TargetId, TargetRef,
};
use crate::camera::Camera;
use crate::error::PipelineError;
use crate::options::{CompositeMode, Options};

/// Composite draws of one frame, in order.
pub type CompositePlan = SmallVec<[CompositeKind; 2]>;

/// Which composite draws to issue. A disabled effect never costs a draw.
#[must_use]
pub fn plan(bloom: bool, glow: bool, mode: CompositeMode) -> CompositePlan {
    let mut plan = CompositePlan::new();
    if bloom && glow && mode == CompositeMode::Combined {
        plan.push(CompositeKind::Combined);
        return plan;
    }
    if bloom {
        plan.push(CompositeKind::Bloom);
    }
    if glow {
        plan.push(CompositeKind::Glow);
    }
    plan
}

/// Textures sampled by the composite. `None` marks an effect that is
/// disabled or produced nothing this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeInputs {
    /// Final bloom texture.
    pub bloom: Option<TargetId>,
    /// Captured glow texture.
    pub glow: Option<TargetId>,
}

fn material(kind: CompositeKind) -> MaterialDescriptor {
    MaterialDescriptor {
        label: match kind {
            CompositeKind::Bloom => "Bloom Composite",
            CompositeKind::Glow => "Glow Composite",
            CompositeKind::Combined => "Combined Composite",
        },
        shader: QuadShader::Composite(kind),
        blend: BlendMode::Additive,
    }
}

/// Owns one additive quad per composite kind.
#[derive(Debug)]
pub struct CompositePass {
    bloom_quad: FullScreenQuad,
    glow_quad: FullScreenQuad,
    combined_quad: FullScreenQuad,
    glow_center: Vec2,
}

impl CompositePass {
    /// Create the composite quads fitted to `aspect`.
    ///
    /// # Errors
    ///
    /// Material creation failures.
    pub fn new(
        backend: &mut dyn RenderBackend,
        aspect: f32,
    ) -> Result<Self, PipelineError> {
        let mut quad = |kind| {
            FullScreenQuad::new(backend, &material(kind), QuadFit::Aspect, aspect)
        };
        Ok(Self {
            bloom_quad: quad(CompositeKind::Bloom)?,
            glow_quad: quad(CompositeKind::Glow)?,
            combined_quad: quad(CompositeKind::Combined)?,
            glow_center: Vec2::splat(0.5),
        })
    }

    /// Glow centre in v-up screen UV.
    #[must_use]
    pub fn glow_center(&self) -> Vec2 {
        self.glow_center
    }

    /// Re-project the glow source. Without a source, or when it sits on or
    /// behind the eye plane, the previous centre is kept.
    pub fn update_glow_center(&mut self, camera: &Camera, source: Option<Vec3>) {
        if let Some(uv) = source.and_then(|p| camera.project_to_uv(p)) {
            self.glow_center = uv;
        }
    }

    fn quad(&self, kind: CompositeKind) -> &FullScreenQuad {
        match kind {
            CompositeKind::Bloom => &self.bloom_quad,
            CompositeKind::Glow => &self.glow_quad,
            CompositeKind::Combined => &self.combined_quad,
        }
    }

    /// Issue the planned draws onto the screen. Returns the number of draws.
    /// Auto-clear is turned off for the draws and restored afterwards, also
    /// when a draw fails.
    ///
    /// # Errors
    ///
    /// Backend draw failures.
    pub fn render(
        &self,
        backend: &mut dyn RenderBackend,
        inputs: CompositeInputs,
        options: &Options,
        time: f32,
    ) -> Result<usize, PipelineError> {
        let plan = plan(
            inputs.bloom.is_some(),
            inputs.glow.is_some(),
            options.composite.mode,
        );
        let (bloom, glow) = match (inputs.bloom, inputs.glow) {
            (None, None) => return Ok(0),
            (Some(bloom), None) => (bloom, bloom),
            (None, Some(glow)) => (glow, glow),
            (Some(bloom), Some(glow)) => (bloom, glow),
        };
        let uniforms = QuadUniforms::Composite(CompositeUniforms {
            time,
            glow_center: self.glow_center,
            tint: Vec3::from(options.glow.tint),
            glow_samples: options.glow.samples,
            bloom_enabled: inputs.bloom.is_some(),
            glow_enabled: inputs.glow.is_some(),
        });

        with_auto_clear(backend, false, |b| {
            for &kind in &plan {
                let (label, textures) = match kind {
                    CompositeKind::Bloom => ("composite_bloom", [bloom, bloom]),
                    CompositeKind::Glow => ("composite_glow", [glow, glow]),
                    CompositeKind::Combined => ("composite_combined", [bloom, glow]),
                };
                let count = QuadShader::Composite(kind).input_count();
                self.quad(kind).draw(
                    b,
                    label,
                    TargetRef::Screen,
                    &textures[..count],
                    uniforms,
                )?;
            }
            Ok(plan.len())
        })
    }
}

impl Stage for CompositePass {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        size: StageSize,
    ) -> Result<(), PipelineError> {
        for quad in [
            &mut self.bloom_quad,
            &mut self.glow_quad,
            &mut self.combined_quad,
        ] {
            let _ = quad.resize(backend, size.aspect);
        }
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.bloom_quad.release(backend);
        self.glow_quad.release(backend);
        self.combined_quad.release(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SoftwareBackend, TargetDescriptor};

    fn targets(backend: &mut SoftwareBackend) -> (TargetId, TargetId) {
        (
            backend
                .create_target(&TargetDescriptor::hdr("bloom", 8, 8))
                .unwrap(),
            backend
                .create_target(&TargetDescriptor::hdr("glow", 8, 8))
                .unwrap(),
        )
    }

    #[test]
    fn plan_skips_disabled_effects() {
        use CompositeKind::{Bloom, Glow};
        use CompositeMode::{Combined, Separate};
        assert_eq!(
            plan(true, true, Combined).as_slice(),
            &[CompositeKind::Combined]
        );
        assert_eq!(plan(true, true, Separate).as_slice(), &[Bloom, Glow]);
        for mode in [Combined, Separate] {
            assert_eq!(plan(false, true, mode).as_slice(), &[Glow]);
            assert_eq!(plan(true, false, mode).as_slice(), &[Bloom]);
            assert!(plan(false, false, mode).is_empty());
        }
    }

    #[test]
    fn bloom_disabled_issues_no_bloom_draw() {
        let mut backend = SoftwareBackend::new(8, 8);
        let composite = CompositePass::new(&mut backend, 1.0).unwrap();
        let (bloom, glow) = targets(&mut backend);
        let inputs = CompositeInputs {
            bloom: None,
            glow: Some(glow),
        };
        let mut options = Options::default();

        for mode in [CompositeMode::Combined, CompositeMode::Separate] {
            options.composite.mode = mode;
            let _ = backend.begin_frame().unwrap();
            assert_eq!(composite.render(&mut backend, inputs, &options, 0.0).unwrap(), 1);
            let stats = backend.stats();
            assert!(stats.draws.iter().all(|d| !d.inputs.contains(&bloom)));
            assert_eq!(stats.draws_labelled("composite_glow").count(), 1);
        }

        let none = CompositeInputs {
            bloom: None,
            glow: None,
        };
        let _ = backend.begin_frame().unwrap();
        assert_eq!(composite.render(&mut backend, none, &options, 0.0).unwrap(), 0);
        assert!(backend.stats().draws.is_empty());
    }

    #[test]
    fn draws_are_additive_onto_screen() {
        let mut backend = SoftwareBackend::new(8, 8);
        let composite = CompositePass::new(&mut backend, 1.0).unwrap();
        let (bloom, glow) = targets(&mut backend);
        let inputs = CompositeInputs {
            bloom: Some(bloom),
            glow: Some(glow),
        };
        let mut options = Options::default();

        let _ = composite.render(&mut backend, inputs, &options, 0.0).unwrap();
        let draw = &backend.stats().draws[0];
        assert_eq!(draw.label, "composite_combined");
        assert_eq!(draw.target, TargetRef::Screen);
        assert_eq!(draw.inputs.as_slice(), &[bloom, glow]);
        assert!(!draw.cleared);
        assert!(backend.auto_clear());

        options.composite.mode = CompositeMode::Separate;
        let _ = backend.begin_frame().unwrap();
        assert_eq!(composite.render(&mut backend, inputs, &options, 0.0).unwrap(), 2);
        let labels: Vec<_> = backend.stats().draws.iter().map(|d| d.label).collect();
        assert_eq!(labels, ["composite_bloom", "composite_glow"]);
    }

    #[test]
    fn auto_clear_restored_when_a_draw_fails() {
        let mut backend = SoftwareBackend::new(8, 8);
        let composite = CompositePass::new(&mut backend, 1.0).unwrap();
        let (bloom, glow) = targets(&mut backend);
        let inputs = CompositeInputs {
            bloom: Some(bloom),
            glow: Some(glow),
        };
        assert!(backend.release_target(glow));

        let result = composite.render(&mut backend, inputs, &Options::default(), 0.0);
        assert!(matches!(result, Err(PipelineError::StaleHandle { kind: "target" })));
        assert!(backend.auto_clear());

        backend.set_auto_clear(false);
        let _ = composite.render(&mut backend, inputs, &Options::default(), 0.0);
        assert!(!backend.auto_clear());
    }

    #[test]
    fn glow_center_keeps_last_visible_projection() {
        let mut backend = SoftwareBackend::new(8, 8);
        let mut composite = CompositePass::new(&mut backend, 1.0).unwrap();
        let camera = Camera::default();

        composite.update_glow_center(&camera, Some(Vec3::ZERO));
        assert!((composite.glow_center() - Vec2::splat(0.5)).length() < 1e-5);

        composite.update_glow_center(&camera, Some(Vec3::new(1.0, 0.0, 0.0)));
        let visible = composite.glow_center();
        assert!(visible.x > 0.5);

        // Behind the eye.
        composite.update_glow_center(&camera, Some(Vec3::new(0.0, 0.0, 10.0)));
        assert_eq!(composite.glow_center(), visible);
        composite.update_glow_center(&camera, None);
        assert_eq!(composite.glow_center(), visible);
    }
}
