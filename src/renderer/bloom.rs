//! Bloom: capture bloom-tagged geometry, soft-threshold it, then blur it
//! with a separable Gaussian that ping-pongs between two targets.
//!
//! Target A holds the capture, the threshold writes A into B, and every
//! blur iteration is a horizontal pass B -> A followed by a vertical pass
//! A -> B. A frame therefore performs `1 + 2 * iterations` filter writes
//! and the result always ends in B; [`BloomPass::output`] still reports the
//! target of the last write rather than assuming it.

use glam::Vec2;

use super::filter::{blur_direction, blur_weights};
use super::quad::{FullScreenQuad, QuadFit};
use super::stage::{with_auto_clear, Stage, StageSize};
use super::target::ScaledTarget;
use crate::backend::{
    BlendMode, MaterialDescriptor, QuadShader, QuadUniforms, RenderBackend,
    SceneView, TargetDescriptor, TargetId, TargetRef,
};
use crate::error::PipelineError;
use crate::options::BloomOptions;

const THRESHOLD_MATERIAL: MaterialDescriptor = MaterialDescriptor {
    label: "Bloom Threshold",
    shader: QuadShader::Threshold,
    blend: BlendMode::Replace,
};

const BLUR_MATERIAL: MaterialDescriptor = MaterialDescriptor {
    label: "Bloom Blur",
    shader: QuadShader::Blur,
    blend: BlendMode::Replace,
};

/// Capture + filter state of the bloom stage.
#[derive(Debug)]
pub struct BloomPass {
    /// `[A, B]`; A doubles as the capture target.
    targets: [ScaledTarget; 2],
    threshold_quad: FullScreenQuad,
    blur_quad: FullScreenQuad,
    /// Index into `targets` of the last write.
    active: usize,
    /// Filter writes issued by the last [`filter`](Self::filter).
    writes: u32,
}

impl BloomPass {
    /// Allocate both targets and the filter quads.
    ///
    /// # Errors
    ///
    /// Target or material creation failures.
    pub fn new(
        backend: &mut dyn RenderBackend,
        physical: (u32, u32),
        scale: f32,
    ) -> Result<Self, PipelineError> {
        let capture = ScaledTarget::new(
            backend,
            TargetDescriptor::hdr("Bloom Target A", 0, 0),
            physical,
            scale,
        )?;
        let ping = ScaledTarget::new(
            backend,
            TargetDescriptor {
                depth: false,
                ..TargetDescriptor::hdr("Bloom Target B", 0, 0)
            },
            physical,
            scale,
        )?;
        Ok(Self {
            targets: [capture, ping],
            threshold_quad: FullScreenQuad::new(
                backend,
                &THRESHOLD_MATERIAL,
                QuadFit::Fixed,
                1.0,
            )?,
            blur_quad: FullScreenQuad::new(
                backend,
                &BLUR_MATERIAL,
                QuadFit::Fixed,
                1.0,
            )?,
            active: 0,
            writes: 0,
        })
    }

    /// The capture target (A).
    #[must_use]
    pub fn capture_target(&self) -> TargetId {
        self.targets[0].id()
    }

    /// Both ping-pong targets, `[A, B]`.
    #[must_use]
    pub fn targets(&self) -> [TargetId; 2] {
        [self.targets[0].id(), self.targets[1].id()]
    }

    /// The target holding the last write of the frame.
    #[must_use]
    pub fn output(&self) -> TargetId {
        self.targets[self.active].id()
    }

    /// Filter writes of the last frame.
    #[must_use]
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Logical target size.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.targets[0].size()
    }

    /// Change the resolution scale of both targets.
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
        for target in &mut self.targets {
            let _ = target.set_scale(backend, scale, physical)?;
        }
        Ok(())
    }

    /// Capture `view` into A and run the filter. Returns `false` when the
    /// targets have zero area and nothing was drawn.
    ///
    /// # Errors
    ///
    /// Backend render failures.
    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        view: &SceneView<'_>,
        options: &BloomOptions,
    ) -> Result<bool, PipelineError> {
        if self.targets[0].is_empty() {
            log::trace!("bloom targets are empty, bloom skipped");
            self.writes = 0;
            return Ok(false);
        }
        let capture = TargetRef::Offscreen(self.targets[0].id());
        with_auto_clear(backend, true, |b| {
            b.render_scene(capture, view)?;
            self.filter(b, options)
        })?;
        Ok(true)
    }

    /// Threshold A into B, then `iterations` horizontal + vertical blur
    /// pairs alternating between the targets.
    ///
    /// # Errors
    ///
    /// Backend draw failures.
    pub fn filter(
        &mut self,
        backend: &mut dyn RenderBackend,
        options: &BloomOptions,
    ) -> Result<(), PipelineError> {
        self.writes = 0;
        self.active = 0;
        self.write(backend, "bloom_threshold", QuadUniforms::Threshold {
            threshold: options.threshold,
            smoothing: options.smoothing,
        })?;

        let (width, height) = self.size();
        let texel = Vec2::new(1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32);
        let weights = blur_weights(options.strength);
        for _ in 0..options.iterations.min(BloomOptions::MAX_ITERATIONS) {
            for horizontal in [true, false] {
                self.write(backend, "bloom_blur", QuadUniforms::Blur {
                    direction: blur_direction(options.radius, horizontal),
                    texel,
                    weights,
                })?;
            }
        }
        log::trace!("bloom filter: {} writes", self.writes);
        Ok(())
    }

    /// One filter draw from the active target into the other one.
    fn write(
        &mut self,
        backend: &mut dyn RenderBackend,
        label: &'static str,
        uniforms: QuadUniforms,
    ) -> Result<(), PipelineError> {
        let src = self.active;
        let dst = 1 - src;
        debug_assert_ne!(self.targets[src].id(), self.targets[dst].id());
        let quad = match uniforms {
            QuadUniforms::Threshold { .. } => &self.threshold_quad,
            _ => &self.blur_quad,
        };
        quad.draw(
            backend,
            label,
            TargetRef::Offscreen(self.targets[dst].id()),
            &[self.targets[src].id()],
            uniforms,
        )?;
        self.active = dst;
        self.writes += 1;
        Ok(())
    }
}

impl Stage for BloomPass {
    fn name(&self) -> &'static str {
        "bloom"
    }

    fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        size: StageSize,
    ) -> Result<(), PipelineError> {
        for target in &mut self.targets {
            let _ = target.resize(backend, size.physical)?;
        }
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn RenderBackend) {
        for target in &mut self.targets {
            target.release(backend);
        }
        self.threshold_quad.release(backend);
        self.blur_quad.release(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    fn filtered(iterations: u32) -> (SoftwareBackend, BloomPass) {
        let mut backend = SoftwareBackend::new(64, 64);
        let mut bloom = BloomPass::new(&mut backend, (64, 64), 0.5).unwrap();
        let options = BloomOptions {
            iterations,
            ..BloomOptions::default()
        };
        bloom.filter(&mut backend, &options).unwrap();
        (backend, bloom)
    }

    #[test]
    fn ping_pong_parity() {
        for iterations in 0..=BloomOptions::MAX_ITERATIONS {
            let (backend, bloom) = filtered(iterations);
            let [a, b] = bloom.targets();
            assert_eq!(bloom.writes(), 1 + 2 * iterations);
            // Odd write count: the result always lands in B.
            assert_eq!(bloom.output(), b);

            let stats = backend.stats();
            assert_eq!(stats.writes_to(TargetRef::Offscreen(b)), 1 + iterations as usize);
            assert_eq!(stats.writes_to(TargetRef::Offscreen(a)), iterations as usize);
            for draw in &stats.draws {
                assert!(!draw.inputs.iter().any(|i| TargetRef::Offscreen(*i) == draw.target));
            }
        }
    }

    #[test]
    fn zero_iterations_leaves_thresholded_capture() {
        let (backend, bloom) = filtered(0);
        let stats = backend.stats();
        assert_eq!(stats.draws.len(), 1);
        assert_eq!(stats.draws[0].label, "bloom_threshold");
        assert_eq!(stats.draws[0].inputs.as_slice(), &[bloom.capture_target()]);
    }

    #[test]
    fn release_frees_targets_and_quads() {
        let mut backend = SoftwareBackend::new(16, 16);
        let mut bloom = BloomPass::new(&mut backend, (16, 16), 0.5).unwrap();
        bloom.release(&mut backend);
        assert_eq!(backend.stats().live_resources(), 0);
        assert_eq!(backend.live_targets(), 0);
    }
}
