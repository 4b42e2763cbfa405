//! CPU reference backend.
//!
//! Renders into linear `f32` RGBA images with the same filter math as the
//! WGSL shaders. Deterministic and GPU-free, so it drives the headless CLI
//! and the pipeline tests.

mod image;
mod raster;

use glam::{Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

pub use self::image::Image;
use self::raster::{clip_near, rasterize_polygon, ClipVertex};
use super::{
    BackendStats, BlendMode, CompositeKind, DrawRecord, FilterMode,
    FrameStatus, GeometryId, MaterialDescriptor, MaterialId, PixelFormat,
    QuadDraw, QuadShader, QuadUniforms, RenderBackend, SceneView,
    TargetDescriptor, TargetId, TargetRef,
};
use crate::error::PipelineError;
use crate::layers::LayerMask;
use crate::renderer::filter;
use crate::scene::MeshData;

/// Color + depth storage of one target.
#[derive(Debug, Clone)]
struct SoftTarget {
    label: &'static str,
    image: Image,
    depth: Vec<f32>,
    filter: FilterMode,
}

impl SoftTarget {
    fn new(
        label: &'static str,
        width: u32,
        height: u32,
        format: PixelFormat,
        filter: FilterMode,
    ) -> Self {
        let image = Image::new(width, height, format);
        let depth = vec![1.0; (image.width() * image.height()) as usize];
        Self {
            label,
            image,
            depth,
            filter,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image.resize(width, height);
        self.depth = vec![1.0; (self.image.width() * self.image.height()) as usize];
    }

    fn clear(&mut self, color: Vec4) {
        self.image.clear(color);
        self.depth.fill(1.0);
    }
}

/// Quad vertices `[top-left, top-right, bottom-left, bottom-right]`.
#[derive(Debug, Clone, Copy)]
struct Quad {
    positions: [Vec3; 4],
    uvs: [Vec2; 4],
}

/// Deterministic CPU implementation of [`RenderBackend`].
#[derive(Debug)]
pub struct SoftwareBackend {
    targets: SlotMap<TargetId, SoftTarget>,
    geometries: SlotMap<GeometryId, Quad>,
    materials: SlotMap<MaterialId, MaterialDescriptor>,
    screen: SoftTarget,
    auto_clear: bool,
    clear_color: Vec4,
    meshes: FxHashMap<(u8, [u32; 3]), MeshData>,
    stats: BackendStats,
}

impl SoftwareBackend {
    /// Backend with an HDR screen image of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            targets: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            screen: SoftTarget::new(
                "screen",
                width,
                height,
                PixelFormat::Rgba16Float,
                FilterMode::Linear,
            ),
            auto_clear: true,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            meshes: FxHashMap::default(),
            stats: BackendStats::default(),
        }
    }

    /// Replace the clear color used by auto-clear.
    #[must_use]
    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = color;
        self
    }

    /// The screen image.
    #[must_use]
    pub fn screen(&self) -> &Image {
        &self.screen.image
    }

    /// Contents of an off-screen target.
    #[must_use]
    pub fn target_image(&self, id: TargetId) -> Option<&Image> {
        self.targets.get(id).map(|t| &t.image)
    }

    /// Image addressed by a [`TargetRef`].
    #[must_use]
    pub fn image(&self, target: TargetRef) -> Option<&Image> {
        match target {
            TargetRef::Screen => Some(self.screen()),
            TargetRef::Offscreen(id) => self.target_image(id),
        }
    }

    /// Number of live off-screen targets.
    #[must_use]
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    /// Number of live quad geometries.
    #[must_use]
    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    /// Number of live materials.
    #[must_use]
    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    fn target_mut(
        &mut self,
        target: TargetRef,
    ) -> Result<&mut SoftTarget, PipelineError> {
        match target {
            TargetRef::Screen => Ok(&mut self.screen),
            TargetRef::Offscreen(id) => self
                .targets
                .get_mut(id)
                .ok_or(PipelineError::StaleHandle { kind: "target" }),
        }
    }

    fn record(
        &mut self,
        label: &'static str,
        target: TargetRef,
        inputs: &[TargetId],
        mask: Option<LayerMask>,
    ) {
        self.stats.draws.push(DrawRecord {
            label,
            target,
            inputs: SmallVec::from_slice(inputs),
            mask,
            cleared: self.auto_clear,
        });
    }
}

impl RenderBackend for SoftwareBackend {
    fn create_target(
        &mut self,
        desc: &TargetDescriptor,
    ) -> Result<TargetId, PipelineError> {
        let id = self.targets.insert(SoftTarget::new(
            desc.label,
            desc.width,
            desc.height,
            desc.format,
            desc.filter,
        ));
        self.stats.targets_created += 1;
        Ok(id)
    }

    fn resize_target(
        &mut self,
        id: TargetId,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        let target = self
            .targets
            .get_mut(id)
            .ok_or(PipelineError::StaleHandle { kind: "target" })?;
        target.resize(width, height);
        log::debug!("resized {} to {width}x{height}", target.label);
        self.stats.targets_resized += 1;
        Ok(())
    }

    fn release_target(&mut self, id: TargetId) -> bool {
        let released = self.targets.remove(id).is_some();
        if released {
            self.stats.targets_released += 1;
        }
        self.stats.record_release(released, "target")
    }

    fn target_size(&self, id: TargetId) -> Option<(u32, u32)> {
        self.targets
            .get(id)
            .map(|t| (t.image.width(), t.image.height()))
    }

    fn create_plane(&mut self, width: f32, height: f32) -> GeometryId {
        let (hw, hh) = (width * 0.5, height * 0.5);
        self.stats.geometries_created += 1;
        self.geometries.insert(Quad {
            positions: [
                Vec3::new(-hw, hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
            ],
            uvs: [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE],
        })
    }

    fn release_geometry(&mut self, id: GeometryId) -> bool {
        let released = self.geometries.remove(id).is_some();
        if released {
            self.stats.geometries_released += 1;
        }
        self.stats.record_release(released, "geometry")
    }

    fn create_material(
        &mut self,
        desc: &MaterialDescriptor,
    ) -> Result<MaterialId, PipelineError> {
        self.stats.materials_created += 1;
        Ok(self.materials.insert(*desc))
    }

    fn release_material(&mut self, id: MaterialId) -> bool {
        let released = self.materials.remove(id).is_some();
        if released {
            self.stats.materials_released += 1;
        }
        self.stats.record_release(released, "material")
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        if (self.screen.image.width(), self.screen.image.height())
            != (width.max(1), height.max(1))
        {
            self.screen.resize(width, height);
        }
    }

    fn auto_clear(&self) -> bool {
        self.auto_clear
    }

    fn set_auto_clear(&mut self, enabled: bool) {
        self.auto_clear = enabled;
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, PipelineError> {
        self.stats.frames += 1;
        self.stats.draws.clear();
        Ok(FrameStatus::Ready)
    }

    fn end_frame(&mut self) {}

    fn render_scene(
        &mut self,
        target: TargetRef,
        view: &SceneView<'_>,
    ) -> Result<(), PipelineError> {
        let clear = self.auto_clear.then_some(self.clear_color);
        let view_proj = view.camera.view_projection();

        for &id in view.visible {
            if let Some(drawable) = view.scene.get(id) {
                let _ = self
                    .meshes
                    .entry(drawable.primitive.cache_key())
                    .or_insert_with(|| drawable.primitive.mesh());
            }
        }

        let meshes = &self.meshes;
        let out = match target {
            TargetRef::Screen => &mut self.screen,
            TargetRef::Offscreen(id) => self
                .targets
                .get_mut(id)
                .ok_or(PipelineError::StaleHandle { kind: "target" })?,
        };
        if let Some(color) = clear {
            out.clear(color);
        }
        let (width, height) = (out.image.width(), out.image.height());

        for &id in view.visible {
            let Some(drawable) = view.scene.get(id) else {
                continue;
            };
            let Some(mesh) = meshes.get(&drawable.primitive.cache_key()) else {
                continue;
            };
            let mvp = view_proj * drawable.model_matrix();
            let color = drawable.color.extend(1.0);
            for tri in mesh.triangles() {
                let verts = tri.map(|p| ClipVertex {
                    clip: mvp * p.extend(1.0),
                    attr: Vec2::ZERO,
                });
                let polygon = clip_near(verts);
                rasterize_polygon(width, height, &polygon, |f| {
                    let index = (f.y * width + f.x) as usize;
                    if f.depth < out.depth[index] {
                        out.depth[index] = f.depth;
                        out.image.set(f.x, f.y, color);
                    }
                });
            }
        }

        log::trace!("scene {:?} -> {target:?}", view.mask);
        self.record("scene", target, &[], Some(view.mask));
        Ok(())
    }

    fn draw_quad(&mut self, draw: &QuadDraw<'_>) -> Result<(), PipelineError> {
        let material = *self
            .materials
            .get(draw.material)
            .ok_or(PipelineError::StaleHandle { kind: "material" })?;
        let quad = *self
            .geometries
            .get(draw.geometry)
            .ok_or(PipelineError::StaleHandle { kind: "geometry" })?;
        draw.validate(material.shader)?;
        if draw.inputs.iter().any(|id| !self.targets.contains_key(*id)) {
            return Err(PipelineError::StaleHandle { kind: "target" });
        }

        let clear = self.auto_clear.then_some(self.clear_color);
        let out = self.target_mut(draw.target)?;
        if let Some(color) = clear {
            out.clear(color);
        }
        // Detach the output so the inputs can be borrowed alongside it.
        let placeholder = Image::new(1, 1, PixelFormat::Rgba32Float);
        let mut image = std::mem::replace(&mut out.image, placeholder);
        {
            let inputs: SmallVec<[(&Image, FilterMode); 2]> = draw
                .inputs
                .iter()
                .filter_map(|id| self.targets.get(*id))
                .map(|t| (&t.image, t.filter))
                .collect();
            shade_quad(&mut image, &quad, draw, &material, &inputs);
        }
        self.target_mut(draw.target)?.image = image;

        log::trace!("quad {} -> {:?}", draw.label, draw.target);
        self.record(draw.label, draw.target, draw.inputs, None);
        Ok(())
    }

    fn stats(&self) -> &BackendStats {
        &self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = BackendStats::default();
    }
}

fn shade_quad(
    out: &mut Image,
    quad: &Quad,
    draw: &QuadDraw<'_>,
    material: &MaterialDescriptor,
    inputs: &[(&Image, FilterMode)],
) {
    let (width, height) = (out.width(), out.height());
    let vertex = |i: usize| ClipVertex {
        clip: draw.projection * quad.positions[i].extend(1.0),
        attr: quad.uvs[i],
    };
    let sample = |input: usize, uv: Vec2| {
        inputs
            .get(input)
            .map_or(Vec3::ZERO, |(image, filter)| image.sample(uv, *filter))
    };

    for tri in [[0, 2, 1], [1, 2, 3]] {
        let polygon = tri.map(vertex);
        rasterize_polygon(width, height, &polygon, |f| {
            let rgb = shade(material.shader, &draw.uniforms, f.attr, &sample);
            match material.blend {
                BlendMode::Replace => out.set(f.x, f.y, rgb.extend(1.0)),
                BlendMode::Additive => out.add(f.x, f.y, rgb),
            }
        });
    }
}

/// Fragment stage of the full-screen shaders.
fn shade(
    shader: QuadShader,
    uniforms: &QuadUniforms,
    uv: Vec2,
    sample: &impl Fn(usize, Vec2) -> Vec3,
) -> Vec3 {
    match (shader, uniforms) {
        (
            QuadShader::Threshold,
            QuadUniforms::Threshold {
                threshold,
                smoothing,
            },
        ) => filter::soft_threshold(sample(0, uv), *threshold, *smoothing),
        (
            QuadShader::Blur,
            QuadUniforms::Blur {
                direction,
                texel,
                weights,
            },
        ) => filter::blur_sample(uv, *direction, *texel, weights, |p| {
            sample(0, p)
        }),
        (QuadShader::Composite(kind), QuadUniforms::Composite(u)) => {
            let (bloom, glow) = match kind {
                CompositeKind::Bloom => (Some(0), None),
                CompositeKind::Glow => (None, Some(0)),
                CompositeKind::Combined => (
                    u.bloom_enabled.then_some(0),
                    u.glow_enabled.then_some(1),
                ),
            };
            let mut rgb = Vec3::ZERO;
            if let Some(input) = bloom {
                rgb += sample(input, uv);
            }
            if let Some(input) = glow {
                let center = filter::screen_uv_to_texture(u.glow_center);
                rgb += filter::radial_glow(uv, center, u.glow_samples, |p| {
                    sample(input, p)
                }) * u.tint
                    * filter::glow_shimmer(u.time);
            }
            rgb
        }
        _ => Vec3::ZERO,
    }
}
