//! wgpu device, queue and the optional presentation surface.

use thiserror::Error;

/// GPU initialization failures.
#[derive(Debug, Error)]
pub enum RenderContextError {
    /// The window handle could not back a surface.
    #[error("surface creation failed: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No adapter matched the request.
    #[error("no compatible GPU adapter found: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),
    /// The adapter refused the device limits or features.
    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    /// The adapter cannot present to the surface.
    #[error("surface configuration not supported by adapter")]
    UnsupportedSurface,
}

/// Device and queue shared by every backend resource, plus either a window
/// surface or nothing (off-screen rendering).
pub struct RenderContext {
    /// Logical device.
    pub device: wgpu::Device,
    /// Command queue.
    pub queue: wgpu::Queue,
    surface: Option<wgpu::Surface<'static>>,
    config: wgpu::SurfaceConfiguration,
}

async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
    label: &'static str,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), RenderContextError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            compatible_surface: surface,
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        })
        .await?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            ..Default::default()
        })
        .await?;
    log::debug!("GPU adapter: {}", adapter.get_info().name);
    Ok((adapter, device, queue))
}

impl RenderContext {
    /// Context presenting to `window`, configured at `size` with vsync.
    ///
    /// # Errors
    ///
    /// [`RenderContextError`] when the surface, adapter or device cannot be
    /// created, or the adapter cannot present to the surface.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        (width, height): (u32, u32),
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let (adapter, device, queue) =
            request_device(&instance, Some(&surface), "Window Device").await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or(RenderContextError::UnsupportedSurface)?;
        config.present_mode = wgpu::PresentMode::Fifo;
        surface.configure(&device, &config);

        Ok(Self {
            device,
            queue,
            surface: Some(surface),
            config,
        })
    }

    /// Surface-less context on the default adapter. The screen becomes an
    /// off-screen texture of `format`.
    ///
    /// # Errors
    ///
    /// [`RenderContextError`] when no adapter or device is available.
    pub async fn headless(
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let (_, device, queue) =
            request_device(&instance, None, "Headless Device").await?;
        Ok(Self::from_device(device, queue, format, width, height))
    }

    /// Surface-less context on a device owned by the host.
    #[must_use]
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: Vec::new(),
        };
        Self {
            device,
            queue,
            surface: None,
            config,
        }
    }

    /// Screen color format.
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Screen width in physical pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Screen height in physical pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Whether frames are presented to a window.
    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Track a new screen size. Zero extents are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    /// Re-apply the current configuration to the surface.
    pub fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Next swapchain texture, `Ok(None)` without a surface.
    ///
    /// # Errors
    ///
    /// [`wgpu::SurfaceError`] from the swapchain.
    pub fn acquire_frame(
        &self,
    ) -> Result<Option<wgpu::SurfaceTexture>, wgpu::SurfaceError> {
        self.surface
            .as_ref()
            .map(wgpu::Surface::get_current_texture)
            .transpose()
    }

    /// Fresh command encoder.
    #[must_use]
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label),
            })
    }

    /// Finish and submit one encoder.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit([encoder.finish()]);
    }
}
