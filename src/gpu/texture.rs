//! GPU render-target textures.

use crate::backend::{FilterMode, PixelFormat, TargetDescriptor};
use crate::error::PipelineError;

/// Depth format shared by every depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// wgpu format for a pixel format.
///
/// # Errors
///
/// [`PipelineError::UnsupportedFormat`] for formats that are not filterable
/// without optional device features.
pub fn texture_format(
    format: PixelFormat,
) -> Result<wgpu::TextureFormat, PipelineError> {
    match format {
        PixelFormat::Rgba8Unorm => Ok(wgpu::TextureFormat::Rgba8Unorm),
        PixelFormat::Rgba16Float => Ok(wgpu::TextureFormat::Rgba16Float),
        PixelFormat::Rgba32Float => {
            Err(PipelineError::UnsupportedFormat(format))
        }
    }
}

/// wgpu sampler filter for a filter mode.
#[must_use]
pub fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// A render-target texture and its default view.
///
/// Created with `RENDER_ATTACHMENT | TEXTURE_BINDING | COPY_SRC` usage, so
/// it can be rendered into, sampled by a later pass, or read back.
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Create a new render-target texture. Zero dimensions become one.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Allocated width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    /// Allocated height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.texture.height()
    }
}

/// Color target plus optional depth buffer and sampling filter.
pub struct GpuTarget {
    /// Debug label.
    pub label: &'static str,
    /// Color attachment.
    pub color: RenderTarget,
    /// Depth attachment for scene renders.
    pub depth: Option<RenderTarget>,
    /// wgpu color format.
    pub format: wgpu::TextureFormat,
    /// Filter used when sampled.
    pub filter: FilterMode,
}

impl GpuTarget {
    /// Allocate from a descriptor.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnsupportedFormat`] for formats the backend cannot
    /// sample.
    pub fn new(
        device: &wgpu::Device,
        desc: &TargetDescriptor,
    ) -> Result<Self, PipelineError> {
        let format = texture_format(desc.format)?;
        let color =
            RenderTarget::new(device, desc.label, desc.width, desc.height, format);
        let depth = desc.depth.then(|| {
            RenderTarget::new(device, desc.label, desc.width, desc.height, DEPTH_FORMAT)
        });
        Ok(Self {
            label: desc.label,
            color,
            depth,
            format,
            filter: desc.filter,
        })
    }

    /// Reallocate both attachments.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.color = RenderTarget::new(device, self.label, width, height, self.format);
        if self.depth.is_some() {
            self.depth = Some(RenderTarget::new(
                device,
                self.label,
                width,
                height,
                DEPTH_FORMAT,
            ));
        }
    }
}
