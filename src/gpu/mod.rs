//! wgpu implementation of the render backend.
//!
//! Provides device/surface initialization, dynamic buffer management,
//! shader composition and the [`WgpuBackend`] itself.

/// [`RenderBackend`](crate::backend::RenderBackend) on wgpu.
pub mod backend;
/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// Shared wgpu boilerplate helpers for full-screen quad pipelines.
pub mod pipeline_helpers;
/// Byte layout of the quad shader uniform blocks.
pub mod quad_uniforms;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// Layer-filtered scene rasterization.
pub mod scene_renderer;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render-target texture wrappers.
pub mod texture;

pub use backend::WgpuBackend;
