//! Forward rendering of scene drawables for one layer mask.
//!
//! Meshes are uploaded once per distinct primitive and shared between
//! drawables. Per-object transforms and colors live in one dynamic-offset
//! uniform buffer that is rewritten for every scene render.

use std::num::NonZeroU64;

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use super::dynamic_buffer::DynamicBuffer;
use super::pipeline_helpers::{uniform_buffer, SCENE_VERTEX_LAYOUT};
use super::shader_composer::{ShaderComposer, SCENE_WGSL};
use super::texture::DEPTH_FORMAT;
use crate::backend::SceneView;
use crate::camera::CameraUniform;
use crate::error::PipelineError;
use crate::scene::Primitive;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

type MeshKey = (u8, [u32; 3]);

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// A drawable ready to be issued.
#[derive(Debug, Clone, Copy)]
pub struct PreparedDraw {
    mesh: MeshKey,
    offset: u32,
}

/// Pipelines, mesh cache and uniforms of the scene pass.
pub struct SceneRenderer {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<(wgpu::TextureFormat, bool), wgpu::RenderPipeline>,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    objects: DynamicBuffer,
    object_bind_group: wgpu::BindGroup,
    object_stride: usize,
    meshes: FxHashMap<MeshKey, GpuMesh>,
}

impl SceneRenderer {
    /// Compile the scene shader and allocate the uniform buffers.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Shader`] when the scene shader fails to compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Result<Self, PipelineError> {
        let shader =
            composer.compose(device, "Scene Shader", SCENE_WGSL, "scene.wgsl")?;

        let camera_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Camera Layout"),
                entries: &[uniform_buffer(0, false)],
            });
        let object_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Object Layout"),
                entries: &[uniform_buffer(0, true)],
            });
        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&camera_layout, &object_layout],
                push_constant_ranges: &[],
            });

        let camera_buffer =
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Scene Camera Buffer"),
                size: std::mem::size_of::<CameraUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        let camera_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Scene Camera Bind Group"),
                layout: &camera_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                }],
            });

        let alignment =
            device.limits().min_uniform_buffer_offset_alignment as usize;
        let object_stride = std::mem::size_of::<ObjectUniform>()
            .div_ceil(alignment)
            * alignment;
        let objects = DynamicBuffer::new(
            device,
            "Scene Object Buffer",
            object_stride * 64,
            wgpu::BufferUsages::UNIFORM,
        );
        let object_bind_group =
            Self::create_object_bind_group(device, &object_layout, &objects);

        Ok(Self {
            shader,
            pipeline_layout,
            pipelines: FxHashMap::default(),
            camera_buffer,
            camera_bind_group,
            object_layout,
            objects,
            object_bind_group,
            object_stride,
            meshes: FxHashMap::default(),
        })
    }

    fn create_object_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        objects: &DynamicBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: objects.buffer(),
                    offset: 0,
                    size: NonZeroU64::new(
                        std::mem::size_of::<ObjectUniform>() as u64,
                    ),
                }),
            }],
        })
    }

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        depth: bool,
    ) {
        let _ = self.pipelines.entry((format, depth)).or_insert_with(|| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[SCENE_VERTEX_LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: depth.then(|| wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
    }

    fn ensure_mesh(&mut self, device: &wgpu::Device, primitive: &Primitive) {
        let _ = self
            .meshes
            .entry(primitive.cache_key())
            .or_insert_with(|| {
                let mesh = primitive.mesh();
                GpuMesh {
                    vertices: device.create_buffer_init(
                        &wgpu::util::BufferInitDescriptor {
                            label: Some("Scene Mesh Vertices"),
                            contents: bytemuck::cast_slice(&mesh.positions),
                            usage: wgpu::BufferUsages::VERTEX,
                        },
                    ),
                    indices: device.create_buffer_init(
                        &wgpu::util::BufferInitDescriptor {
                            label: Some("Scene Mesh Indices"),
                            contents: bytemuck::cast_slice(&mesh.indices),
                            usage: wgpu::BufferUsages::INDEX,
                        },
                    ),
                    index_count: mesh.indices.len() as u32,
                }
            });
    }

    /// Upload camera and object uniforms for `view` and make sure every
    /// mesh and the pipeline for `format` exist.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &SceneView<'_>,
        format: wgpu::TextureFormat,
        depth: bool,
    ) -> Vec<PreparedDraw> {
        self.ensure_pipeline(device, format, depth);
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&view.camera.uniform()),
        );

        let mut objects = Vec::with_capacity(view.visible.len());
        let mut draws = Vec::with_capacity(view.visible.len());
        for &id in view.visible {
            let Some(drawable) = view.scene.get(id) else {
                continue;
            };
            self.ensure_mesh(device, &drawable.primitive);
            draws.push(PreparedDraw {
                mesh: drawable.primitive.cache_key(),
                offset: (objects.len() * self.object_stride) as u32,
            });
            objects.push(ObjectUniform {
                model: drawable.model_matrix().to_cols_array_2d(),
                color: drawable.color.extend(1.0).to_array(),
            });
        }

        if self
            .objects
            .write_strided(device, queue, &objects, self.object_stride)
        {
            self.object_bind_group = Self::create_object_bind_group(
                device,
                &self.object_layout,
                &self.objects,
            );
        }
        draws
    }

    /// Issue the prepared draws into an open render pass.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        draws: &[PreparedDraw],
        format: wgpu::TextureFormat,
        depth: bool,
    ) {
        let Some(pipeline) = self.pipelines.get(&(format, depth)) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        for draw in draws {
            let Some(mesh) = self.meshes.get(&draw.mesh) else {
                continue;
            };
            pass.set_bind_group(1, &self.object_bind_group, &[draw.offset]);
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_index_buffer(
                mesh.indices.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
