//! Frame orchestration: glow capture, bloom, main scene, composite.

use crate::backend::{FrameStatus, RenderBackend, SceneView, TargetId};
use crate::camera::{Camera, SharedCamera};
use crate::error::PipelineError;
use crate::layers::{LayerSwitch, Pass, PassConfig};
use crate::options::Options;
use crate::scene::{Scene, SharedScene};
use crate::util::frame_timing::Clock;
use crate::viewport::ViewportSource;

use super::bloom::BloomPass;
use super::composite::{CompositeInputs, CompositePass};
use super::glow::GlowPass;
use super::main_scene::MainScenePass;
use super::stage::{Stage, StageSize};

/// Outcome of one [`RenderPipeline::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Number of frames rendered so far, this one included.
    pub frame: u64,
    /// Whether the frame was skipped without touching any target.
    pub skipped: bool,
    /// Backend draws issued (scene renders and quads).
    pub draws: usize,
    /// Bloom filter writes (`1 + 2 * iterations`, 0 when bloom was skipped).
    pub bloom_writes: u32,
    /// Additive composite draws onto the screen.
    pub composite_draws: usize,
    /// Layer-mask switches performed.
    pub layer_switches: u64,
}

/// The layered multi-pass renderer.
///
/// Owns every render target, quad and material it creates. Scene and camera
/// are shared with the host; the viewport and the clock are read through
/// their provider traits.
pub struct RenderPipeline<B: RenderBackend> {
    backend: B,
    scene: SharedScene,
    camera: SharedCamera,
    viewport: Box<dyn ViewportSource>,
    clock: Box<dyn Clock>,
    passes: PassConfig,
    options: Options,
    layer_switch: LayerSwitch,
    glow: GlowPass,
    bloom: BloomPass,
    main: MainScenePass,
    composite: CompositePass,
    size: StageSize,
    frame: u64,
    destroyed: bool,
}

impl<B: RenderBackend> RenderPipeline<B> {
    /// Pipeline with the default pass configuration and options.
    ///
    /// # Errors
    ///
    /// See [`with_config`](Self::with_config).
    pub fn new(
        backend: B,
        scene: SharedScene,
        camera: SharedCamera,
        viewport: impl ViewportSource + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self, PipelineError> {
        Self::with_config(
            backend,
            scene,
            camera,
            viewport,
            clock,
            PassConfig::default(),
            Options::default(),
        )
    }

    /// Validate `passes`, then create every target, quad and material for
    /// the current viewport.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidPassConfig`] and backend allocation failures
    /// such as [`PipelineError::UnsupportedFormat`].
    pub fn with_config(
        mut backend: B,
        scene: SharedScene,
        camera: SharedCamera,
        viewport: impl ViewportSource + 'static,
        clock: impl Clock + 'static,
        passes: PassConfig,
        options: Options,
    ) -> Result<Self, PipelineError> {
        passes.validate()?;
        let options = options.sanitized();
        let vp = viewport.viewport();
        let size = StageSize {
            physical: vp.physical_size(),
            aspect: vp.aspect(),
        };
        if !vp.is_empty() {
            backend.configure_surface(size.physical.0, size.physical.1);
            camera.borrow_mut().aspect = size.aspect;
        }

        let glow =
            GlowPass::new(&mut backend, size.physical, options.glow.resolution_scale)?;
        let bloom = BloomPass::new(
            &mut backend,
            size.physical,
            options.bloom.resolution_scale,
        )?;
        let composite = CompositePass::new(&mut backend, size.aspect)?;
        log::debug!(
            "render pipeline created at {}x{}",
            size.physical.0,
            size.physical.1
        );

        Ok(Self {
            backend,
            scene,
            camera,
            viewport: Box::new(viewport),
            clock: Box::new(clock),
            passes,
            options,
            layer_switch: LayerSwitch::new(),
            glow,
            bloom,
            main: MainScenePass,
            composite,
            size,
            frame: 0,
            destroyed: false,
        })
    }

    /// Render one frame: glow capture, bloom capture and filter, main scene,
    /// then the composite draws.
    ///
    /// A zero-area viewport or a frame the backend cannot provide yields a
    /// skipped report. When a stage fails the frame is not presented and
    /// the previous one stays on screen.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Destroyed`] after [`destroy`](Self::destroy), and
    /// backend failures.
    pub fn render(&mut self) -> Result<FrameReport, PipelineError> {
        if self.destroyed {
            return Err(PipelineError::Destroyed);
        }
        let (width, height) = self.size.physical;
        if width == 0 || height == 0 {
            log::trace!("zero-area viewport, frame skipped");
            return Ok(self.skipped());
        }
        if self.backend.begin_frame()? == FrameStatus::Skip {
            return Ok(self.skipped());
        }

        let switches = self.layer_switch.switches();
        let (bloom_writes, composite_draws) = self.render_stages()?;
        self.backend.end_frame();
        self.frame += 1;

        Ok(FrameReport {
            frame: self.frame,
            skipped: false,
            draws: self.backend.stats().draws.len(),
            bloom_writes,
            composite_draws,
            layer_switches: self.layer_switch.switches() - switches,
        })
    }

    fn skipped(&self) -> FrameReport {
        FrameReport {
            frame: self.frame,
            skipped: true,
            draws: 0,
            bloom_writes: 0,
            composite_draws: 0,
            layer_switches: 0,
        }
    }

    fn scene_view<'a>(
        scene: &'a Scene,
        camera: &'a Camera,
        switch: &'a mut LayerSwitch,
        passes: &PassConfig,
        pass: Pass,
    ) -> SceneView<'a> {
        let mask = passes.layers_for(pass);
        SceneView {
            scene,
            camera,
            mask,
            visible: switch.select(scene, mask),
        }
    }

    /// Run the stages in frame order. Returns the bloom writes and the
    /// composite draw count.
    fn render_stages(&mut self) -> Result<(u32, usize), PipelineError> {
        let scene = self.scene.borrow();
        let camera = self.camera.borrow();
        let time = self.clock.elapsed();
        let backend: &mut dyn RenderBackend = &mut self.backend;

        let mut glow = None;
        if self.options.glow.enabled {
            let view = Self::scene_view(
                &scene,
                &camera,
                &mut self.layer_switch,
                &self.passes,
                Pass::GlowCapture,
            );
            if self.glow.render(backend, &view)? {
                glow = Some(self.glow.texture());
            }
        }

        let mut bloom = None;
        let mut bloom_writes = 0;
        if self.options.bloom.enabled {
            let view = Self::scene_view(
                &scene,
                &camera,
                &mut self.layer_switch,
                &self.passes,
                Pass::BloomRender,
            );
            if self.bloom.render(backend, &view, &self.options.bloom)? {
                bloom = Some(self.bloom.output());
                bloom_writes = self.bloom.writes();
            }
        }

        let view = Self::scene_view(
            &scene,
            &camera,
            &mut self.layer_switch,
            &self.passes,
            Pass::MainScene,
        );
        self.main.render(backend, &view)?;

        self.composite
            .update_glow_center(&camera, scene.glow_source_position());
        let composite_draws = self.composite.render(
            backend,
            CompositeInputs { bloom, glow },
            &self.options,
            time,
        )?;
        Ok((bloom_writes, composite_draws))
    }

    /// Re-read the viewport and propagate it: surface, stage targets whose
    /// size changed, aspect-fitted quads and the camera aspect.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Destroyed`] after [`destroy`](Self::destroy), and
    /// target reallocation failures.
    pub fn resize(&mut self) -> Result<(), PipelineError> {
        if self.destroyed {
            return Err(PipelineError::Destroyed);
        }
        let vp = self.viewport.viewport();
        let size = StageSize {
            physical: vp.physical_size(),
            // Keep the last aspect while minimized so quads are not churned.
            aspect: if vp.is_empty() {
                self.size.aspect
            } else {
                vp.aspect()
            },
        };
        if !vp.is_empty() {
            if size.physical != self.size.physical {
                self.backend
                    .configure_surface(size.physical.0, size.physical.1);
            }
            self.camera.borrow_mut().aspect = size.aspect;
        }

        let backend: &mut dyn RenderBackend = &mut self.backend;
        let stages: [&mut dyn Stage; 3] =
            [&mut self.glow, &mut self.bloom, &mut self.composite];
        for stage in stages {
            stage.resize(backend, size)?;
            log::trace!("{} resized", stage.name());
        }
        self.size = size;
        Ok(())
    }

    /// Replace the options (sanitized). A changed resolution scale resizes
    /// the affected targets immediately.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Destroyed`] after [`destroy`](Self::destroy), and
    /// target reallocation failures.
    pub fn set_options(&mut self, options: Options) -> Result<(), PipelineError> {
        if self.destroyed {
            return Err(PipelineError::Destroyed);
        }
        let options = options.sanitized();
        let physical = self.size.physical;
        if options.glow.resolution_scale != self.options.glow.resolution_scale {
            self.glow.set_scale(
                &mut self.backend,
                options.glow.resolution_scale,
                physical,
            )?;
        }
        if options.bloom.resolution_scale != self.options.bloom.resolution_scale {
            self.bloom.set_scale(
                &mut self.backend,
                options.bloom.resolution_scale,
                physical,
            )?;
        }
        self.options = options;
        Ok(())
    }

    /// Release every owned target, quad geometry and material exactly once.
    /// Calling it again only logs.
    pub fn destroy(&mut self) {
        if self.destroyed {
            log::warn!("render pipeline already destroyed");
            return;
        }
        let backend: &mut dyn RenderBackend = &mut self.backend;
        let stages: [&mut dyn Stage; 3] =
            [&mut self.glow, &mut self.bloom, &mut self.composite];
        for stage in stages {
            stage.release(backend);
        }
        self.destroyed = true;
        log::debug!("render pipeline destroyed");
    }

    /// Whether [`destroy`](Self::destroy) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The shared scene handle.
    #[must_use]
    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    /// Current (sanitized) options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Pass to layer mapping.
    #[must_use]
    pub fn passes(&self) -> &PassConfig {
        &self.passes
    }

    /// Physical viewport size the targets follow.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size.physical
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Glow capture target.
    #[must_use]
    pub fn glow_texture(&self) -> TargetId {
        self.glow.texture()
    }

    /// Logical glow target size.
    #[must_use]
    pub fn glow_size(&self) -> (u32, u32) {
        self.glow.size()
    }

    /// Bloom capture target.
    #[must_use]
    pub fn bloom_capture(&self) -> TargetId {
        self.bloom.capture_target()
    }

    /// Final bloom texture of the last frame.
    #[must_use]
    pub fn bloom_output(&self) -> TargetId {
        self.bloom.output()
    }

    /// Logical bloom target size.
    #[must_use]
    pub fn bloom_size(&self) -> (u32, u32) {
        self.bloom.size()
    }

    /// Current glow centre in v-up screen UV.
    #[must_use]
    pub fn glow_center(&self) -> glam::Vec2 {
        self.composite.glow_center()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::{Vec2, Vec3};

    use super::*;
    use crate::backend::{SoftwareBackend, TargetRef};
    use crate::layers::LayerMask;
    use crate::options::CompositeMode;
    use crate::renderer::filter::luminance;
    use crate::scene::{Drawable, Primitive};
    use crate::util::frame_timing::ManualClock;
    use crate::viewport::{SharedViewport, Viewport};

    const CUBE_POSITION: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    const CUBE_SIZE: f32 = 0.05;

    struct Fixture {
        pipeline: RenderPipeline<SoftwareBackend>,
        viewport: SharedViewport,
        camera: SharedCamera,
    }

    /// Glow sphere at the origin, small bloom cube at (1, 0, 0), camera at
    /// (0, 0, 5) looking down -Z.
    fn fixture(width: u32, height: u32, options: Options) -> Fixture {
        let mut scene = Scene::new();
        let sphere = scene.add(Drawable::new(
            "glow sphere",
            Primitive::sphere(0.5),
            Vec3::ZERO,
            Vec3::new(4.0, 3.0, 1.5),
            LayerMask::GLOW,
        ));
        scene.register_glow_source(sphere).unwrap();
        let _ = scene.add(Drawable::new(
            "bloom cube",
            Primitive::cuboid(Vec3::splat(CUBE_SIZE)),
            CUBE_POSITION,
            Vec3::new(6.0, 5.0, 3.0),
            LayerMask::BLOOM,
        ));

        let viewport = SharedViewport::new(Viewport::new(width, height, 1.0));
        let camera = Rc::new(RefCell::new(Camera::looking_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            45.0,
            1.0,
        )));
        let pipeline = RenderPipeline::with_config(
            SoftwareBackend::new(width, height),
            scene.into_shared(),
            Rc::clone(&camera),
            viewport.clone(),
            ManualClock::at(0.0),
            PassConfig::default(),
            options,
        )
        .unwrap();
        Fixture {
            pipeline,
            viewport,
            camera,
        }
    }

    fn pixel_of(camera: &Camera, world: Vec3, width: u32, height: u32) -> (u32, u32) {
        let uv = camera.project_to_uv(world).unwrap();
        let tex = Vec2::new(uv.x, 1.0 - uv.y);
        ((tex.x * width as f32) as u32, (tex.y * height as f32) as u32)
    }

    fn image(pipeline: &RenderPipeline<SoftwareBackend>, id: TargetId) -> &crate::backend::software::Image {
        pipeline.backend().target_image(id).unwrap()
    }

    #[test]
    fn frame_runs_stages_in_order() {
        let mut f = fixture(200, 150, Options::default());
        let report = f.pipeline.render().unwrap();
        assert!(!report.skipped);
        assert_eq!(report.frame, 1);
        assert_eq!(report.bloom_writes, 5);
        assert_eq!(report.composite_draws, 1);
        assert_eq!(report.layer_switches, 3);

        let draws = &f.pipeline.backend().stats().draws;
        let labels: Vec<_> = draws.iter().map(|d| d.label).collect();
        assert_eq!(
            labels,
            [
                "scene",
                "scene",
                "bloom_threshold",
                "bloom_blur",
                "bloom_blur",
                "bloom_blur",
                "bloom_blur",
                "scene",
                "composite_combined",
            ]
        );
        assert_eq!(report.draws, draws.len());
        assert_eq!(draws[0].target, TargetRef::Offscreen(f.pipeline.glow_texture()));
        assert_eq!(draws[0].mask, Some(LayerMask::GLOW));
        assert_eq!(draws[1].target, TargetRef::Offscreen(f.pipeline.bloom_capture()));
        assert_eq!(draws[1].mask, Some(LayerMask::BLOOM));
        assert_eq!(draws[7].target, TargetRef::Screen);
        assert!(draws[7].cleared);
        let main = draws[7].mask.unwrap();
        assert!(!main.contains(LayerMask::GLOW));
        assert!(!draws[8].cleared);
        assert!(f.pipeline.backend().auto_clear());
    }

    #[test]
    fn bloom_writes_follow_iterations() {
        for iterations in 0..=4 {
            let mut options = Options::default();
            options.bloom.iterations = iterations;
            let mut f = fixture(64, 64, options);
            let report = f.pipeline.render().unwrap();
            assert_eq!(report.bloom_writes, 1 + 2 * iterations);
            let stats = f.pipeline.backend().stats();
            let bloom_draws = stats.draws_labelled("bloom_threshold").count()
                + stats.draws_labelled("bloom_blur").count();
            assert_eq!(bloom_draws as u32, 1 + 2 * iterations);
            assert_eq!(
                stats.draws.last().unwrap().inputs[0],
                f.pipeline.bloom_output()
            );
        }
    }

    #[test]
    fn disabled_effects_skip_their_passes() {
        let mut options = Options::default();
        options.bloom.enabled = false;
        for mode in [CompositeMode::Combined, CompositeMode::Separate] {
            options.composite.mode = mode;
            let mut f = fixture(64, 64, options.clone());
            let report = f.pipeline.render().unwrap();
            assert_eq!(report.bloom_writes, 0);
            assert_eq!(report.composite_draws, 1);
            let stats = f.pipeline.backend().stats();
            assert_eq!(stats.draws_labelled("bloom_threshold").count(), 0);
            assert_eq!(stats.draws_labelled("composite_bloom").count(), 0);
            assert_eq!(stats.draws_labelled("composite_combined").count(), 0);
            assert_eq!(stats.draws_labelled("composite_glow").count(), 1);
            let capture = TargetRef::Offscreen(f.pipeline.bloom_capture());
            assert_eq!(stats.writes_to(capture), 0);
        }
    }

    #[test]
    fn end_to_end_scenario() {
        let (width, height) = (800, 600);
        let mut options = Options::default();
        options.bloom.iterations = 0;
        let mut f = fixture(width, height, options.clone());
        let camera = *f.camera.borrow();
        assert!((camera.aspect - 4.0 / 3.0).abs() < 1e-6);

        // Iterations 0: the bloom output is the thresholded capture.
        let _ = f.pipeline.render().unwrap();
        let unblurred = image(&f.pipeline, f.pipeline.bloom_output());
        let (peak_before, total_before) =
            (unblurred.peak_luminance(), unblurred.total_luminance());
        assert!(peak_before > 0.0);

        options.bloom.iterations = 2;
        f.pipeline.set_options(options.clone()).unwrap();
        let _ = f.pipeline.render().unwrap();

        // (a) The glow target holds the sphere where it projects.
        let glow = image(&f.pipeline, f.pipeline.glow_texture());
        let (gw, gh) = f.pipeline.glow_size();
        let (sx, sy) = pixel_of(&camera, Vec3::ZERO, gw, gh);
        assert!(luminance(glow.get(sx, sy).truncate()) > 1.0);
        assert_eq!(luminance(glow.get(0, 0).truncate()), 0.0);

        // (c) Blur spreads the cube: lower peak, energy conserved, cluster
        // stays around the cube.
        let bloom = image(&f.pipeline, f.pipeline.bloom_output());
        assert!(bloom.peak_luminance() < peak_before);
        let total_after = bloom.total_luminance();
        assert!((total_after - total_before).abs() / total_before < 0.05);
        let (bw, bh) = f.pipeline.bloom_size();
        let (bx, by) = pixel_of(&camera, CUBE_POSITION, bw, bh);
        assert!(bloom.window_luminance(bx, by, 10) > 0.9 * total_after);

        let (cx, cy) = pixel_of(&camera, CUBE_POSITION, width, height);
        let composited = f.pipeline.backend().screen().window_luminance(cx, cy, 8);

        // (b) Without effects the screen shows the cube and no raw sphere.
        options.bloom.enabled = false;
        options.glow.enabled = false;
        f.pipeline.set_options(options).unwrap();
        let report = f.pipeline.render().unwrap();
        assert_eq!(report.draws, 1);
        assert_eq!(report.composite_draws, 0);
        let screen = f.pipeline.backend().screen();
        let (sx, sy) = pixel_of(&camera, Vec3::ZERO, width, height);
        assert_eq!(luminance(screen.get(sx, sy).truncate()), 0.0);
        assert!(luminance(screen.get(cx, cy).truncate()) > 1.0);

        // The composite added light around the cube.
        assert!(composited > screen.window_luminance(cx, cy, 8));
    }

    #[test]
    fn separate_mode_reports_one_composite_per_effect() {
        let mut options = Options::default();
        options.composite.mode = CompositeMode::Separate;
        let mut f = fixture(64, 64, options);
        let report = f.pipeline.render().unwrap();
        assert_eq!(report.composite_draws, 2);
        let stats = f.pipeline.backend().stats();
        assert_eq!(stats.draws_labelled("composite_bloom").count(), 1);
        assert_eq!(stats.draws_labelled("composite_glow").count(), 1);
    }

    #[test]
    fn mixed_glow_tag_stays_off_the_screen() {
        let (width, height) = (200, 150);
        let mut options = Options::default();
        options.bloom.enabled = false;
        options.glow.enabled = false;
        let mut f = fixture(width, height, options);
        {
            let mut scene = f.pipeline.scene().borrow_mut();
            let _ = scene.add(Drawable::new(
                "mixed",
                Primitive::sphere(0.5),
                Vec3::ZERO,
                Vec3::new(2.0, 2.0, 2.0),
                LayerMask::GLOW | LayerMask::DEFAULT,
            ));
        }
        let _ = f.pipeline.render().unwrap();
        let camera = *f.camera.borrow();
        let (sx, sy) = pixel_of(&camera, Vec3::ZERO, width, height);
        let screen = f.pipeline.backend().screen();
        assert_eq!(luminance(screen.get(sx, sy).truncate()), 0.0);
    }

    #[test]
    fn tiny_viewport_renders_without_targets() {
        let mut f = fixture(1, 1, Options::default());
        let report = f.pipeline.render().unwrap();
        assert!(!report.skipped);
    }

    #[test]
    fn glow_center_tracks_source_projection() {
        let mut f = fixture(200, 200, Options::default());
        let _ = f.pipeline.render().unwrap();
        assert!((f.pipeline.glow_center() - Vec2::splat(0.5)).length() < 1e-5);

        f.camera.borrow_mut().eye = Vec3::new(0.0, 0.0, -5.0);
        f.camera.borrow_mut().target = Vec3::new(0.0, 0.0, -10.0);
        let _ = f.pipeline.render().unwrap();
        assert!((f.pipeline.glow_center() - Vec2::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut f = fixture(800, 600, Options::default());
        f.viewport.set(Viewport::new(1024, 512, 1.0));
        f.pipeline.resize().unwrap();
        let after_first = f.pipeline.backend().stats().clone();

        f.pipeline.resize().unwrap();
        let after_second = f.pipeline.backend().stats();
        assert_eq!(after_second.targets_resized, after_first.targets_resized);
        assert_eq!(
            after_second.geometries_released,
            after_first.geometries_released
        );
        assert_eq!(
            after_second.geometries_created,
            after_first.geometries_created
        );
        assert_eq!(f.pipeline.glow_size(), (512, 256));
    }

    #[test]
    fn resize_round_trip_restores_sizes() {
        let mut f = fixture(800, 600, Options::default());
        let original = (f.pipeline.glow_size(), f.pipeline.bloom_size());

        f.viewport.set(Viewport::new(1920, 1080, 1.0));
        f.pipeline.resize().unwrap();
        assert_eq!(f.pipeline.glow_size(), (960, 540));
        assert!((f.camera.borrow().aspect - 16.0 / 9.0).abs() < 1e-6);

        f.viewport.set(Viewport::new(800, 600, 1.0));
        f.pipeline.resize().unwrap();
        assert_eq!((f.pipeline.glow_size(), f.pipeline.bloom_size()), original);
        let backend = f.pipeline.backend();
        assert_eq!(backend.target_size(f.pipeline.glow_texture()), Some((400, 300)));
        for id in [f.pipeline.bloom_capture(), f.pipeline.bloom_output()] {
            assert_eq!(backend.target_size(id), Some((400, 300)));
        }
        assert_eq!(backend.screen().width(), 800);
    }

    #[test]
    fn zero_area_viewport_skips_frame() {
        let mut f = fixture(64, 64, Options::default());
        f.viewport.set(Viewport::new(0, 64, 1.0));
        f.pipeline.resize().unwrap();
        let frames = f.pipeline.backend().stats().frames;

        let report = f.pipeline.render().unwrap();
        assert!(report.skipped);
        assert_eq!(report.draws, 0);
        assert_eq!(f.pipeline.backend().stats().frames, frames);

        f.viewport.set(Viewport::new(64, 64, 1.0));
        f.pipeline.resize().unwrap();
        assert!(!f.pipeline.render().unwrap().skipped);
    }

    #[test]
    fn resolution_scale_change_resizes_targets() {
        let mut f = fixture(100, 80, Options::default());
        let mut options = f.pipeline.options().clone();
        options.glow.resolution_scale = 1.0;
        f.pipeline.set_options(options).unwrap();
        assert_eq!(f.pipeline.glow_size(), (100, 80));
        assert_eq!(f.pipeline.bloom_size(), (50, 40));
    }

    #[test]
    fn invalid_pass_config_fails_construction() {
        let passes = PassConfig::new(LayerMask::GLOW, LayerMask::BLOOM, LayerMask::all());
        let result = RenderPipeline::with_config(
            SoftwareBackend::new(8, 8),
            Scene::new().into_shared(),
            Rc::new(RefCell::new(Camera::default())),
            Viewport::new(8, 8, 1.0),
            ManualClock::at(0.0),
            passes,
            Options::default(),
        );
        assert!(matches!(result, Err(PipelineError::InvalidPassConfig(_))));
    }

    #[test]
    fn destroy_releases_everything_once() {
        let mut f = fixture(64, 64, Options::default());
        let _ = f.pipeline.render().unwrap();
        f.pipeline.destroy();

        let stats = f.pipeline.backend().stats().clone();
        assert_eq!(stats.live_resources(), 0);
        assert_eq!(stats.targets_released, stats.targets_created);
        assert_eq!(stats.redundant_releases, 0);
        assert_eq!(f.pipeline.backend().live_targets(), 0);
        assert_eq!(f.pipeline.backend().live_geometries(), 0);
        assert_eq!(f.pipeline.backend().live_materials(), 0);

        f.pipeline.destroy();
        assert_eq!(f.pipeline.backend().stats(), &stats);
        assert!(matches!(f.pipeline.render(), Err(PipelineError::Destroyed)));
        assert!(matches!(f.pipeline.resize(), Err(PipelineError::Destroyed)));
    }
}
