//! [`RenderBackend`] on wgpu.
//!
//! Every scene render and quad draw is encoded into its own command buffer
//! and submitted immediately, so uniform writes made for one draw can never
//! be observed by another and draws execute in call order.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use wgpu::util::DeviceExt;

use super::pipeline_helpers::{
    clamp_sampler, create_quad_pipeline, filtering_sampler, texture_2d,
    uniform_buffer, ADDITIVE_BLEND,
};
use super::quad_uniforms::{quad_uniform_bytes, MAX_UNIFORM_SIZE};
use super::render_context::RenderContext;
use super::scene_renderer::SceneRenderer;
use super::shader_composer::{
    ShaderComposer, BLUR_WGSL, COMPOSITE_WGSL, THRESHOLD_WGSL,
};
use super::texture::{filter_mode, GpuTarget, RenderTarget, DEPTH_FORMAT};
use crate::backend::{
    BackendStats, BlendMode, CompositeKind, DrawRecord, FilterMode,
    FrameStatus, GeometryId, MaterialDescriptor, MaterialId, QuadDraw,
    QuadShader, RenderBackend, SceneView, TargetDescriptor, TargetId,
    TargetRef,
};
use crate::error::PipelineError;

struct GpuQuad {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct GpuMaterial {
    desc: MaterialDescriptor,
    uniforms: wgpu::Buffer,
}

struct QuadShaders {
    threshold: wgpu::ShaderModule,
    blur: wgpu::ShaderModule,
    composite: wgpu::ShaderModule,
}

impl QuadShaders {
    fn module_and_entry(&self, shader: QuadShader) -> (&wgpu::ShaderModule, &'static str) {
        match shader {
            QuadShader::Threshold => (&self.threshold, "fs_main"),
            QuadShader::Blur => (&self.blur, "fs_main"),
            QuadShader::Composite(CompositeKind::Bloom) => {
                (&self.composite, "fs_bloom")
            }
            QuadShader::Composite(CompositeKind::Glow) => {
                (&self.composite, "fs_glow")
            }
            QuadShader::Composite(CompositeKind::Combined) => {
                (&self.composite, "fs_combined")
            }
        }
    }
}

/// Color and depth attachments resolved for a [`TargetRef`].
struct Attachments<'a> {
    color: &'a wgpu::TextureView,
    depth: Option<&'a wgpu::TextureView>,
    format: wgpu::TextureFormat,
}

type PipelineKey = (QuadShader, BlendMode, wgpu::TextureFormat);

/// GPU implementation of [`RenderBackend`].
pub struct WgpuBackend {
    context: RenderContext,
    targets: SlotMap<TargetId, GpuTarget>,
    geometries: SlotMap<GeometryId, GpuQuad>,
    materials: SlotMap<MaterialId, GpuMaterial>,
    shaders: QuadShaders,
    quad_layout: wgpu::BindGroupLayout,
    quad_pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    scene: SceneRenderer,
    screen_depth: RenderTarget,
    /// Screen stand-in when the context has no surface.
    offscreen_screen: Option<RenderTarget>,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
    auto_clear: bool,
    clear_color: wgpu::Color,
    stats: BackendStats,
}

impl WgpuBackend {
    /// Build the backend on an initialized context.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Shader`] when a shader fails to compose.
    pub fn new(context: RenderContext) -> Result<Self, PipelineError> {
        let device = &context.device;
        let mut composer = ShaderComposer::new()?;
        let shaders = QuadShaders {
            threshold: composer.compose(
                device,
                "Threshold Shader",
                THRESHOLD_WGSL,
                "threshold.wgsl",
            )?,
            blur: composer.compose(device, "Blur Shader", BLUR_WGSL, "blur.wgsl")?,
            composite: composer.compose(
                device,
                "Composite Shader",
                COMPOSITE_WGSL,
                "composite.wgsl",
            )?,
        };
        let scene = SceneRenderer::new(device, &mut composer)?;

        let quad_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Quad Layout"),
                entries: &[
                    uniform_buffer(0, false),
                    filtering_sampler(1),
                    texture_2d(2),
                    texture_2d(3),
                ],
            });

        let (width, height) = (context.width(), context.height());
        let screen_depth =
            RenderTarget::new(device, "Screen Depth", width, height, DEPTH_FORMAT);
        let offscreen_screen = (!context.has_surface()).then(|| {
            RenderTarget::new(device, "Screen", width, height, context.format())
        });

        Ok(Self {
            nearest_sampler: clamp_sampler(
                device,
                "Nearest Sampler",
                wgpu::FilterMode::Nearest,
            ),
            linear_sampler: clamp_sampler(
                device,
                "Linear Sampler",
                wgpu::FilterMode::Linear,
            ),
            targets: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            shaders,
            quad_layout,
            quad_pipelines: FxHashMap::default(),
            scene,
            screen_depth,
            offscreen_screen,
            frame: None,
            auto_clear: true,
            clear_color: wgpu::Color::BLACK,
            stats: BackendStats::default(),
            context,
        })
    }

    /// The underlying render context.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// The screen texture in surface-less mode.
    #[must_use]
    pub fn offscreen_screen(&self) -> Option<&wgpu::Texture> {
        self.offscreen_screen.as_ref().map(|t| &t.texture)
    }

    fn attachments(
        &self,
        target: TargetRef,
    ) -> Result<Option<Attachments<'_>>, PipelineError> {
        match target {
            TargetRef::Screen => {
                let color = match (&self.frame, &self.offscreen_screen) {
                    (Some((_, view)), _) => view,
                    (None, Some(screen)) => &screen.view,
                    (None, None) => return Ok(None),
                };
                Ok(Some(Attachments {
                    color,
                    depth: Some(&self.screen_depth.view),
                    format: self.context.format(),
                }))
            }
            TargetRef::Offscreen(id) => {
                let t = self
                    .targets
                    .get(id)
                    .ok_or(PipelineError::StaleHandle { kind: "target" })?;
                Ok(Some(Attachments {
                    color: &t.color.view,
                    depth: t.depth.as_ref().map(|d| &d.view),
                    format: t.format,
                }))
            }
        }
    }

    fn target_format(
        &self,
        target: TargetRef,
    ) -> Result<(wgpu::TextureFormat, bool), PipelineError> {
        match target {
            TargetRef::Screen => Ok((self.context.format(), true)),
            TargetRef::Offscreen(id) => self
                .targets
                .get(id)
                .map(|t| (t.format, t.depth.is_some()))
                .ok_or(PipelineError::StaleHandle { kind: "target" }),
        }
    }

    fn color_load(&self) -> wgpu::LoadOp<wgpu::Color> {
        if self.auto_clear {
            wgpu::LoadOp::Clear(self.clear_color)
        } else {
            wgpu::LoadOp::Load
        }
    }

    fn depth_load(&self) -> wgpu::LoadOp<f32> {
        if self.auto_clear {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        }
    }

    fn ensure_quad_pipeline(&mut self, key: PipelineKey) {
        let (shader, blend, format) = key;
        let (module, entry) = self.shaders.module_and_entry(shader);
        let device = &self.context.device;
        let layout = &self.quad_layout;
        let _ = self.quad_pipelines.entry(key).or_insert_with(|| {
            let blend = match blend {
                BlendMode::Replace => None,
                BlendMode::Additive => Some(ADDITIVE_BLEND),
            };
            create_quad_pipeline(
                device,
                &format!("{shader:?}"),
                module,
                entry,
                format,
                blend,
                &[layout],
            )
        });
    }

    fn record(
        &mut self,
        label: &'static str,
        target: TargetRef,
        inputs: &[TargetId],
        mask: Option<crate::layers::LayerMask>,
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

impl RenderBackend for WgpuBackend {
    fn create_target(
        &mut self,
        desc: &TargetDescriptor,
    ) -> Result<TargetId, PipelineError> {
        let target = GpuTarget::new(&self.context.device, desc)?;
        self.stats.targets_created += 1;
        Ok(self.targets.insert(target))
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
        target.resize(&self.context.device, width, height);
        log::debug!("resized {} to {width}x{height}", target.label);
        self.stats.targets_resized += 1;
        Ok(())
    }

    fn release_target(&mut self, id: TargetId) -> bool {
        let released = match self.targets.remove(id) {
            Some(target) => {
                target.color.texture.destroy();
                if let Some(depth) = target.depth {
                    depth.texture.destroy();
                }
                self.stats.targets_released += 1;
                true
            }
            None => false,
        };
        self.stats.record_release(released, "target")
    }

    fn target_size(&self, id: TargetId) -> Option<(u32, u32)> {
        self.targets
            .get(id)
            .map(|t| (t.color.width(), t.color.height()))
    }

    fn create_plane(&mut self, width: f32, height: f32) -> GeometryId {
        let (hw, hh) = (width * 0.5, height * 0.5);
        #[rustfmt::skip]
        let vertices: [f32; 20] = [
            -hw,  hh, 0.0, 0.0, 0.0,
             hw,  hh, 0.0, 1.0, 0.0,
            -hw, -hh, 0.0, 0.0, 1.0,
             hw, -hh, 0.0, 1.0, 1.0,
        ];
        let indices: [u16; 6] = [0, 2, 1, 1, 2, 3];
        let device = &self.context.device;
        let quad = GpuQuad {
            vertices: device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("Quad Vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                },
            ),
            indices: device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("Quad Indices"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                },
            ),
        };
        self.stats.geometries_created += 1;
        self.geometries.insert(quad)
    }

    fn release_geometry(&mut self, id: GeometryId) -> bool {
        let released = match self.geometries.remove(id) {
            Some(quad) => {
                quad.vertices.destroy();
                quad.indices.destroy();
                self.stats.geometries_released += 1;
                true
            }
            None => false,
        };
        self.stats.record_release(released, "geometry")
    }

    fn create_material(
        &mut self,
        desc: &MaterialDescriptor,
    ) -> Result<MaterialId, PipelineError> {
        let uniforms = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: MAX_UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.stats.materials_created += 1;
        Ok(self.materials.insert(GpuMaterial {
            desc: *desc,
            uniforms,
        }))
    }

    fn release_material(&mut self, id: MaterialId) -> bool {
        let released = match self.materials.remove(id) {
            Some(material) => {
                material.uniforms.destroy();
                self.stats.materials_released += 1;
                true
            }
            None => false,
        };
        self.stats.record_release(released, "material")
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context.resize(width, height);
        let device = &self.context.device;
        if (self.screen_depth.width(), self.screen_depth.height()) != (width, height)
        {
            self.screen_depth =
                RenderTarget::new(device, "Screen Depth", width, height, DEPTH_FORMAT);
            if self.offscreen_screen.is_some() {
                self.offscreen_screen = Some(RenderTarget::new(
                    device,
                    "Screen",
                    width,
                    height,
                    self.context.format(),
                ));
            }
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
        match self.context.acquire_frame() {
            Ok(None) => Ok(FrameStatus::Ready),
            Ok(Some(texture)) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some((texture, view));
                Ok(FrameStatus::Ready)
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.context.reconfigure();
                Ok(FrameStatus::Skip)
            }
            Err(err @ wgpu::SurfaceError::OutOfMemory) => Err(err.into()),
            Err(err) => {
                log::warn!("skipping frame: {err}");
                Ok(FrameStatus::Skip)
            }
        }
    }

    fn end_frame(&mut self) {
        if let Some((texture, _)) = self.frame.take() {
            texture.present();
        }
    }

    fn render_scene(
        &mut self,
        target: TargetRef,
        view: &SceneView<'_>,
    ) -> Result<(), PipelineError> {
        let (format, depth) = self.target_format(target)?;
        let draws = self.scene.prepare(
            &self.context.device,
            &self.context.queue,
            view,
            format,
            depth,
        );

        let Some(attachments) = self.attachments(target)? else {
            log::trace!("no screen texture this frame, scene render dropped");
            return Ok(());
        };
        let mut encoder = self.context.create_encoder("Scene Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachments.color,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: self.color_load(),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: attachments.depth.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: self.depth_load(),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                ..Default::default()
            });
            self.scene.draw(&mut pass, &draws, attachments.format, depth);
        }
        self.context.submit(encoder);

        log::trace!("scene {:?} -> {target:?}", view.mask);
        self.record("scene", target, &[], Some(view.mask));
        Ok(())
    }

    fn draw_quad(&mut self, draw: &QuadDraw<'_>) -> Result<(), PipelineError> {
        let desc = self
            .materials
            .get(draw.material)
            .ok_or(PipelineError::StaleHandle { kind: "material" })?
            .desc;
        draw.validate(desc.shader)?;
        if !self.geometries.contains_key(draw.geometry) {
            return Err(PipelineError::StaleHandle { kind: "geometry" });
        }
        let mut filter = FilterMode::Linear;
        for (i, id) in draw.inputs.iter().enumerate() {
            let input = self
                .targets
                .get(*id)
                .ok_or(PipelineError::StaleHandle { kind: "target" })?;
            if i == 0 {
                filter = input.filter;
            }
        }

        let (format, _) = self.target_format(draw.target)?;
        self.ensure_quad_pipeline((desc.shader, desc.blend, format));

        let Some(attachments) = self.attachments(draw.target)? else {
            log::trace!("no screen texture this frame, {} dropped", draw.label);
            return Ok(());
        };
        let (Some(material), Some(quad)) = (
            self.materials.get(draw.material),
            self.geometries.get(draw.geometry),
        ) else {
            return Err(PipelineError::StaleHandle { kind: "material" });
        };
        let Some(pipeline) =
            self.quad_pipelines.get(&(desc.shader, desc.blend, format))
        else {
            return Err(PipelineError::Shader(format!(
                "no pipeline for {:?}",
                desc.shader
            )));
        };
        // Input views borrow `self.targets`; they must be gone before `record`.
        {
            let views: SmallVec<[&wgpu::TextureView; 2]> = draw
                .inputs
                .iter()
                .filter_map(|id| self.targets.get(*id))
                .map(|t| &t.color.view)
                .collect();
            let Some(&first) = views.first() else {
                return Err(PipelineError::MissingInput { label: draw.label });
            };
            let second = views.get(1).copied().unwrap_or(first);
            let sampler = match filter_mode(filter) {
                wgpu::FilterMode::Nearest => &self.nearest_sampler,
                wgpu::FilterMode::Linear => &self.linear_sampler,
            };

            self.context.queue.write_buffer(
                &material.uniforms,
                0,
                &quad_uniform_bytes(draw.projection, &draw.uniforms),
            );
            let bind_group =
                self.context
                    .device
                    .create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(draw.label),
                        layout: &self.quad_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: material.uniforms.as_entire_binding(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::Sampler(sampler),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: wgpu::BindingResource::TextureView(first),
                            },
                            wgpu::BindGroupEntry {
                                binding: 3,
                                resource: wgpu::BindingResource::TextureView(second),
                            },
                        ],
                    });

            let mut encoder = self.context.create_encoder(draw.label);
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(draw.label),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: attachments.color,
                        resolve_target: None,
                        depth_slice: None,
                        ops: wgpu::Operations {
                            load: self.color_load(),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    ..Default::default()
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.set_vertex_buffer(0, quad.vertices.slice(..));
                pass.set_index_buffer(quad.indices.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..6, 0, 0..1);
            }
            self.context.submit(encoder);
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QuadUniforms;
    use crate::camera::OrthoCamera;

    /// A backend on the default adapter, or `None` on machines without one.
    fn headless_backend() -> Option<WgpuBackend> {
        let context = pollster::block_on(RenderContext::headless(
            wgpu::TextureFormat::Rgba16Float,
            8,
            8,
        ))
        .ok()?;
        WgpuBackend::new(context).ok()
    }

    #[test]
    fn quad_draw_is_recorded_after_submission() {
        let Some(mut backend) = headless_backend() else {
            return;
        };
        let src = backend
            .create_target(&TargetDescriptor::hdr("src", 8, 8))
            .unwrap();
        let dst = backend
            .create_target(&TargetDescriptor::hdr("dst", 8, 8))
            .unwrap();
        let geometry = backend.create_plane(2.0, 2.0);
        let material = backend
            .create_material(&MaterialDescriptor {
                label: "threshold",
                shader: QuadShader::Threshold,
                blend: BlendMode::Replace,
            })
            .unwrap();

        let inputs = [src];
        backend
            .draw_quad(&QuadDraw {
                label: "threshold",
                target: TargetRef::Offscreen(dst),
                geometry,
                material,
                projection: OrthoCamera::fullscreen().projection(),
                inputs: &inputs,
                uniforms: QuadUniforms::Threshold {
                    threshold: 0.5,
                    smoothing: 0.1,
                },
            })
            .unwrap();

        let draws = &backend.stats().draws;
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].label, "threshold");
        assert_eq!(draws[0].target, TargetRef::Offscreen(dst));
        assert_eq!(draws[0].inputs.as_slice(), &[src]);
    }
}
