//! The graphics seam between the pipeline stages and a concrete renderer.
//!
//! Stages talk to a [`RenderBackend`] through opaque generational handles.
//! [`crate::gpu::WgpuBackend`] renders on the GPU; [`SoftwareBackend`] is a
//! deterministic CPU reference used for headless rendering and tests.

pub mod software;
mod stats;

use glam::{Mat4, Vec2, Vec3};
use slotmap::new_key_type;

pub use software::SoftwareBackend;
pub use stats::{BackendStats, DrawRecord};

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::layers::LayerMask;
use crate::renderer::filter::BLUR_TAPS_PER_SIDE;
use crate::scene::{DrawableId, Scene};

new_key_type! {
    /// Handle to an off-screen render target.
    pub struct TargetId;
    /// Handle to quad geometry.
    pub struct GeometryId;
    /// Handle to a full-screen material (shader + blend state).
    pub struct MaterialId;
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Color formats a render target can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit normalized, clamps to `[0,1]`.
    Rgba8Unorm,
    /// Half-float HDR.
    Rgba16Float,
    /// Full-float HDR.
    Rgba32Float,
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    #[default]
    Linear,
}

/// Off-screen render target description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// Debug label.
    pub label: &'static str,
    /// Width in texels. Zero is allocated as one.
    pub width: u32,
    /// Height in texels. Zero is allocated as one.
    pub height: u32,
    /// Color format.
    pub format: PixelFormat,
    /// Filter used when the target is sampled.
    pub filter: FilterMode,
    /// Whether scene renders into this target need a depth buffer.
    pub depth: bool,
}

impl TargetDescriptor {
    /// Linear-filtered HDR color target with depth.
    #[must_use]
    pub const fn hdr(label: &'static str, width: u32, height: u32) -> Self {
        Self {
            label,
            width,
            height,
            format: PixelFormat::Rgba16Float,
            filter: FilterMode::Linear,
            depth: true,
        }
    }
}

/// Where a draw writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRef {
    /// The presentation surface (or the software screen image).
    Screen,
    /// An off-screen target.
    Offscreen(TargetId),
}

/// Which textures a composite draw adds onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    /// Bloom texture only (input 0).
    Bloom,
    /// Glow texture only (input 0).
    Glow,
    /// Bloom (input 0) and glow (input 1) in one draw.
    Combined,
}

/// Full-screen shader programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuadShader {
    /// Soft luminance threshold.
    Threshold,
    /// One direction of the separable Gaussian blur.
    Blur,
    /// Screen composite.
    Composite(CompositeKind),
}

impl QuadShader {
    /// Number of input textures the shader samples.
    #[must_use]
    pub const fn input_count(self) -> usize {
        match self {
            Self::Composite(CompositeKind::Combined) => 2,
            _ => 1,
        }
    }
}

/// Output blending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    Replace,
    /// `dst + src` (One + One), no depth test or write.
    Additive,
}

/// Full-screen material description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialDescriptor {
    /// Debug label.
    pub label: &'static str,
    /// Shader program.
    pub shader: QuadShader,
    /// Output blending.
    pub blend: BlendMode,
}

/// Composite shader parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeUniforms {
    /// Seconds since start, drives the shimmer.
    pub time: f32,
    /// Projected glow centre in v-up screen UV.
    pub glow_center: Vec2,
    /// Glow tint.
    pub tint: Vec3,
    /// Radial glow taps.
    pub glow_samples: u32,
    /// Whether the combined shader adds the bloom texture.
    pub bloom_enabled: bool,
    /// Whether the combined shader adds the glow texture.
    pub glow_enabled: bool,
}

/// Typed per-draw uniforms, one variant per [`QuadShader`] family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadUniforms {
    /// Soft threshold knobs.
    Threshold {
        /// Full pass-through luminance.
        threshold: f32,
        /// Ramp width below the threshold.
        smoothing: f32,
    },
    /// One separable blur pass.
    Blur {
        /// Tap direction scaled by the radius.
        direction: Vec2,
        /// Size of one source texel in UV.
        texel: Vec2,
        /// Normalised tap weights, centre first.
        weights: [f32; BLUR_TAPS_PER_SIDE + 1],
    },
    /// Screen composite.
    Composite(CompositeUniforms),
}

/// A full-screen quad draw.
#[derive(Debug, Clone, Copy)]
pub struct QuadDraw<'a> {
    /// Label recorded in the draw log.
    pub label: &'static str,
    /// Output.
    pub target: TargetRef,
    /// Quad geometry.
    pub geometry: GeometryId,
    /// Shader + blend.
    pub material: MaterialId,
    /// Orthographic projection of the quad camera.
    pub projection: Mat4,
    /// Sampled textures, in shader binding order.
    pub inputs: &'a [TargetId],
    /// Shader parameters.
    pub uniforms: QuadUniforms,
}

impl QuadDraw<'_> {
    /// Reject draws that sample their own output.
    ///
    /// # Errors
    ///
    /// [`PipelineError::FeedbackLoop`] when the output is also an input.
    pub fn check_feedback(&self) -> Result<(), PipelineError> {
        match self.target {
            TargetRef::Offscreen(out) if self.inputs.contains(&out) => {
                Err(PipelineError::FeedbackLoop { label: self.label })
            }
            _ => Ok(()),
        }
    }

    /// Full pre-encode validation against the material's shader: no
    /// feedback loop, uniforms of the shader's family, enough inputs.
    ///
    /// # Errors
    ///
    /// [`PipelineError::FeedbackLoop`], [`PipelineError::UniformMismatch`]
    /// or [`PipelineError::MissingInput`].
    pub fn validate(&self, shader: QuadShader) -> Result<(), PipelineError> {
        self.check_feedback()?;
        let matches = matches!(
            (shader, &self.uniforms),
            (QuadShader::Threshold, QuadUniforms::Threshold { .. })
                | (QuadShader::Blur, QuadUniforms::Blur { .. })
                | (QuadShader::Composite(_), QuadUniforms::Composite(_))
        );
        if !matches {
            return Err(PipelineError::UniformMismatch { label: self.label });
        }
        if self.inputs.len() < shader.input_count() {
            return Err(PipelineError::MissingInput { label: self.label });
        }
        Ok(())
    }
}

/// A scene render restricted to one layer mask.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    /// Scene content.
    pub scene: &'a Scene,
    /// Viewing camera.
    pub camera: &'a Camera,
    /// Active layer mask.
    pub mask: LayerMask,
    /// Drawables visible through `mask`.
    pub visible: &'a [DrawableId],
}

/// Result of [`RenderBackend::begin_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Draws may proceed.
    Ready,
    /// No output this frame (surface lost/outdated/timed out).
    Skip,
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Renderer operations the pipeline stages need.
///
/// Draws are executed in call order. Release operations are idempotent:
/// releasing an unknown handle returns `false` and is counted as redundant.
pub trait RenderBackend {
    /// Allocate an off-screen target.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnsupportedFormat`] if the backend cannot render to
    /// the requested format.
    fn create_target(
        &mut self,
        desc: &TargetDescriptor,
    ) -> Result<TargetId, PipelineError>;

    /// Reallocate a target at a new size. Contents are undefined afterwards.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StaleHandle`] for an unknown target.
    fn resize_target(
        &mut self,
        id: TargetId,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError>;

    /// Free a target.
    fn release_target(&mut self, id: TargetId) -> bool;

    /// Allocated size of a target.
    fn target_size(&self, id: TargetId) -> Option<(u32, u32)>;

    /// Create an XY plane of the given extents centred on the origin, with
    /// texture-space UVs (v down).
    fn create_plane(&mut self, width: f32, height: f32) -> GeometryId;

    /// Free quad geometry.
    fn release_geometry(&mut self, id: GeometryId) -> bool;

    /// Create a full-screen material.
    ///
    /// # Errors
    ///
    /// Backend-specific pipeline creation failures.
    fn create_material(
        &mut self,
        desc: &MaterialDescriptor,
    ) -> Result<MaterialId, PipelineError>;

    /// Free a material.
    fn release_material(&mut self, id: MaterialId) -> bool;

    /// Resize the screen target.
    fn configure_surface(&mut self, width: u32, height: u32);

    /// Whether draws clear their target first.
    fn auto_clear(&self) -> bool;

    /// Toggle clear-before-draw.
    fn set_auto_clear(&mut self, enabled: bool);

    /// Start a frame.
    ///
    /// # Errors
    ///
    /// Unrecoverable surface failures (out of memory).
    fn begin_frame(&mut self) -> Result<FrameStatus, PipelineError>;

    /// Finish the frame and present.
    fn end_frame(&mut self);

    /// Render the drawables of `view` into `target`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StaleHandle`] for an unknown target.
    fn render_scene(
        &mut self,
        target: TargetRef,
        view: &SceneView<'_>,
    ) -> Result<(), PipelineError>;

    /// Draw a full-screen quad.
    ///
    /// # Errors
    ///
    /// [`PipelineError::FeedbackLoop`] when the output is also sampled, and
    /// [`PipelineError::StaleHandle`] for unknown handles.
    fn draw_quad(&mut self, draw: &QuadDraw<'_>) -> Result<(), PipelineError>;

    /// Resource and draw counters.
    fn stats(&self) -> &BackendStats;

    /// Zero every counter and clear the draw log.
    fn reset_stats(&mut self);
}
