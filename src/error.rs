//! Crate-level error types.

use thiserror::Error;

use crate::backend::PixelFormat;
use crate::gpu::render_context::RenderContextError;

/// Errors produced by the erdtree-fx crate.
///
/// Setup-time contract violations (unsupported formats, invalid pass
/// configuration, GPU initialization) surface from construction. Per-frame
/// problems are either guarded into no-ops by the stages or reported from
/// [`RenderPipeline::render`](crate::renderer::RenderPipeline::render) so the
/// host can keep the last good frame on screen.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// GPU context initialization failure.
    #[error("GPU error: {0}")]
    Gpu(#[from] RenderContextError),
    /// The backend cannot allocate targets of this format.
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(PixelFormat),
    /// A pass name that is not part of the pass registry.
    #[error("unknown render pass {0:?}")]
    UnknownPass(String),
    /// The pass/layer registry violates the partition invariant.
    #[error("invalid pass configuration: {0}")]
    InvalidPassConfig(String),
    /// A handle that does not refer to a live backend resource.
    #[error("stale {kind} handle")]
    StaleHandle {
        /// Resource kind (`"target"`, `"geometry"`, `"material"`).
        kind: &'static str,
    },
    /// A draw would sample the target it writes to.
    #[error("draw {label:?} reads and writes the same target")]
    FeedbackLoop {
        /// Label of the rejected draw.
        label: &'static str,
    },
    /// Quad uniforms of a different shader family than the material.
    #[error("draw {label:?} passes uniforms for another shader")]
    UniformMismatch {
        /// Label of the rejected draw.
        label: &'static str,
    },
    /// A quad draw bound fewer textures than its shader samples.
    #[error("draw {label:?} is missing an input texture")]
    MissingInput {
        /// Label of the rejected draw.
        label: &'static str,
    },
    /// WGSL composition failed.
    #[error("shader composition failed: {0}")]
    Shader(String),
    /// The drawable registered as glow source does not exist.
    #[error("glow source is not part of the scene")]
    UnknownGlowSource,
    /// The pipeline was used after [`destroy`](crate::renderer::RenderPipeline::destroy).
    #[error("render pipeline has been destroyed")]
    Destroyed,
    /// The presentation surface could not provide a frame.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    /// TOML options parsing/serialization failure.
    #[error("options parse error: {0}")]
    OptionsParse(String),
    /// Invalid hex color string.
    #[error("invalid color {0:?}")]
    InvalidColor(String),
    /// Generic I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Viewer event-loop failure.
    #[error("viewer error: {0}")]
    Viewer(String),
}
