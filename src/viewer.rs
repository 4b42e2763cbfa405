//! Standalone window rendering the Erdtree demo through the wgpu backend.
//!
//! ```no_run
//! # use erdtree_fx::viewer::Viewer;
//! Viewer::builder()
//!     .with_title("Erdtree")
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Quat, Vec3};
use web_time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::camera::SharedCamera;
use crate::error::PipelineError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::WgpuBackend;
use crate::layers::PassConfig;
use crate::options::{CompositeMode, Options};
use crate::renderer::RenderPipeline;
use crate::scene::demo::erdtree_scene;
use crate::util::frame_timing::{FrameClock, FrameTiming};
use crate::viewport::{SharedViewport, Viewport};

/// Orbit speed of the demo camera, in radians per second.
const ORBIT_SPEED: f32 = 0.15;

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    options: Option<Options>,
    title: String,
    orbit: bool,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            options: None,
            title: "Erdtree".into(),
            orbit: true,
        }
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Enable or disable the slow camera orbit.
    #[must_use]
    pub fn with_orbit(mut self, orbit: bool) -> Self {
        self.orbit = orbit;
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            options: self.options.unwrap_or_default(),
            title: self.title,
            orbit: self.orbit,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A window that displays the demo scene with glow and bloom.
///
/// Keys: `B` toggles bloom, `G` toggles glow, `C` switches the composite
/// mode, `Space` pauses the orbit.
pub struct Viewer {
    options: Options,
    title: String,
    orbit: bool,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Viewer`] if the event loop fails.
    pub fn run(self) -> Result<(), PipelineError> {
        let event_loop =
            EventLoop::new().map_err(|e| PipelineError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            state: None,
            options: self.options,
            title: self.title,
            orbit: self.orbit,
            timing: FrameTiming::new(0),
            last_frame_time: Instant::now(),
            last_fps_log: Instant::now(),
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| PipelineError::Viewer(e.to_string()))
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// Everything created once the window exists.
struct ViewerState {
    pipeline: RenderPipeline<WgpuBackend>,
    viewport: SharedViewport,
    camera: SharedCamera,
    /// Eye offset from the target at orbit angle zero.
    orbit_offset: Vec3,
    orbit_angle: f32,
}

struct ViewerApp {
    window: Option<Arc<Window>>,
    state: Option<ViewerState>,
    options: Options,
    title: String,
    orbit: bool,
    timing: FrameTiming,
    last_frame_time: Instant,
    last_fps_log: Instant,
}

fn window_viewport(window: &Window) -> Viewport {
    let logical = window.inner_size().to_logical::<f64>(window.scale_factor());
    Viewport::new(
        logical.width.round() as u32,
        logical.height.round() as u32,
        window.scale_factor() as f32,
    )
}

impl ViewerApp {
    fn create_state(&self, window: &Arc<Window>) -> Result<ViewerState, PipelineError> {
        let vp = window_viewport(window);
        let viewport = SharedViewport::new(vp);
        let physical = vp.physical_size();
        let context = pollster::block_on(RenderContext::new(
            window.clone(),
            (physical.0.max(1), physical.1.max(1)),
        ))?;
        let backend = WgpuBackend::new(context)?;

        let demo = erdtree_scene(vp.aspect());
        let orbit_offset = demo.camera.eye - demo.camera.target;
        let camera = Rc::new(RefCell::new(demo.camera));
        let pipeline = RenderPipeline::with_config(
            backend,
            demo.scene.into_shared(),
            camera.clone(),
            viewport.clone(),
            FrameClock::new(),
            PassConfig::default(),
            self.options.clone(),
        )?;
        Ok(ViewerState {
            pipeline,
            viewport,
            camera,
            orbit_offset,
            orbit_angle: 0.0,
        })
    }

    fn handle_key(&mut self, code: KeyCode) {
        let Some(state) = &mut self.state else {
            return;
        };
        let mut options = state.pipeline.options().clone();
        match code {
            KeyCode::KeyB => options.bloom.enabled = !options.bloom.enabled,
            KeyCode::KeyG => options.glow.enabled = !options.glow.enabled,
            KeyCode::KeyC => {
                options.composite.mode = match options.composite.mode {
                    CompositeMode::Combined => CompositeMode::Separate,
                    CompositeMode::Separate => CompositeMode::Combined,
                };
            }
            KeyCode::Space => {
                self.orbit = !self.orbit;
                return;
            }
            _ => return,
        }
        log::info!(
            "bloom={} glow={} composite={:?}",
            options.bloom.enabled,
            options.glow.enabled,
            options.composite.mode
        );
        if let Err(e) = state.pipeline.set_options(options) {
            log::error!("failed to apply options: {e}");
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let Some(state) = &mut self.state else {
            return;
        };
        if self.orbit {
            state.orbit_angle += dt * ORBIT_SPEED;
            let mut camera = state.camera.borrow_mut();
            camera.eye = camera.target
                + Quat::from_rotation_y(state.orbit_angle) * state.orbit_offset;
        }

        match state.pipeline.render() {
            Ok(report) if !report.skipped => self.timing.end_frame(),
            Ok(_) => {}
            Err(e) => log::error!("render error: {e}"),
        }

        if now.duration_since(self.last_fps_log) >= Duration::from_secs(5) {
            log::debug!("{:.1} fps", self.timing.fps());
            self.last_fps_log = now;
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.create_state(&window) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("Failed to initialize renderer: {e}");
                event_loop.exit();
                return;
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(state) = &mut self.state {
                    state.pipeline.destroy();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let (Some(window), Some(state)) = (&self.window, &mut self.state) {
                    state.viewport.set(window_viewport(window));
                    if let Err(e) = state.pipeline.resize() {
                        log::error!("resize failed: {e}");
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code);
                }
            }

            _ => (),
        }
    }
}
