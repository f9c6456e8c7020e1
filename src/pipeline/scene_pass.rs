//! The forward scene pass: shadow depth pre-pass plus mesh and line drawing.

use bytemuck::{Pod, Zeroable};
use glamx::Mat4;
use wgpu::util::DeviceExt;

use crate::camera::Camera3d;
use crate::light::{Light, LightKind};
use crate::pipeline::Environment;
use crate::scene::{LineGeometry, Material, NodeKind, SceneNode, TriGeometry};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GlobalUniforms {
    view_proj: [[f32; 4]; 4],
    shadow_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    fog_color_near: [f32; 4],
    fog_far_shadow: [f32; 4],
    light_dirs: [[f32; 4]; 2],
    light_colors: [[f32; 4]; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct LineVertex {
    position: [f32; 3],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Instance {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    // x = receive_shadow, y = shadow catcher, z = opacity.
    misc: [f32; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuLines {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

struct MeshDraw {
    gpu_index: usize,
    instance_index: u32,
    cast_shadow: bool,
    transparent: bool,
}

struct LineDraw {
    gpu_index: usize,
    instance_index: u32,
}

/// Everything one frame needs from the scene tree, gathered in a single
/// world-transform traversal. GPU-free, so the gathering logic is testable
/// on its own.
#[derive(Default)]
struct FrameData {
    mesh_instances: Vec<Instance>,
    line_instances: Vec<Instance>,
    mesh_draws: Vec<MeshDraw>,
    line_draws: Vec<LineDraw>,
    mesh_geometries: Vec<TriGeometry>,
    line_geometries: Vec<LineGeometry>,
    lights: Vec<Light>,
}

impl FrameData {
    fn gather(scene: &SceneNode) -> Self {
        let mut data = FrameData::default();

        scene.visit_world(&mut |node, world, scale| match node.kind() {
            NodeKind::Mesh {
                geometry,
                material,
                cast_shadow,
                receive_shadow,
            } => {
                let model = SceneNode::model_matrix(world, scale).to_cols_array_2d();
                let (color, misc) = match *material {
                    Material::Standard { color } => {
                        ([color.r, color.g, color.b, color.a],
                         [*receive_shadow as u32 as f32, 0.0, 1.0, 0.0])
                    }
                    Material::ShadowCatcher { opacity } => {
                        ([0.0, 0.0, 0.0, 1.0],
                         [*receive_shadow as u32 as f32, 1.0, opacity, 0.0])
                    }
                };
                data.mesh_draws.push(MeshDraw {
                    gpu_index: data.mesh_geometries.len(),
                    instance_index: data.mesh_instances.len() as u32,
                    cast_shadow: *cast_shadow,
                    transparent: material.is_transparent(),
                });
                data.mesh_geometries.push(geometry.clone());
                data.mesh_instances.push(Instance { model, color, misc });
            }
            NodeKind::Lines { geometry, opacity } => {
                let model = SceneNode::model_matrix(world, scale).to_cols_array_2d();
                data.line_draws.push(LineDraw {
                    gpu_index: data.line_geometries.len(),
                    instance_index: data.line_instances.len() as u32,
                });
                data.line_geometries.push(geometry.clone());
                data.line_instances.push(Instance {
                    model,
                    // Opacity rides in the color field; see the line
                    // instance layout.
                    color: [*opacity, 0.0, 0.0, 0.0],
                    misc: [0.0; 4],
                });
            }
            NodeKind::Light(light) => {
                let mut light = *light;
                light.position = world.translation;
                data.lights.push(light);
            }
            NodeKind::Group => {}
        });

        data
    }
}

/// Renders the scene tree: an optional shadow depth pre-pass from the first
/// shadow-casting directional light, then a forward pass over meshes and
/// line sets.
///
/// Geometry buffers are built on first use and rebuilt when the gathered
/// geometry no longer matches what was uploaded, so re-activating a host
/// with different content picks up the new shapes even through a reused
/// renderer.
pub(crate) struct ScenePass {
    shadow_pipeline: wgpu::RenderPipeline,
    mesh_pipeline: wgpu::RenderPipeline,
    mesh_blend_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    scene_bind_group: wgpu::BindGroup,

    shadow_view: wgpu::TextureView,

    mesh_instance_buffer: wgpu::Buffer,
    mesh_instance_capacity: usize,
    line_instance_buffer: wgpu::Buffer,
    line_instance_capacity: usize,

    meshes: Vec<GpuMesh>,
    lines: Vec<GpuLines>,
    // Source geometry behind `meshes`/`lines`, kept to detect staleness.
    mesh_sources: Vec<TriGeometry>,
    line_sources: Vec<LineGeometry>,
}

impl ScenePass {
    pub(crate) fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        shadow_map_size: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_globals"),
            size: std::mem::size_of::<GlobalUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: shadow_map_size,
                height: shadow_map_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Comparison sampler with linear filtering gives hardware PCF.
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let mesh_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };
        let mesh_instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![
                2 => Float32x4, 3 => Float32x4, 4 => Float32x4, 5 => Float32x4,
                6 => Float32x4, 7 => Float32x4
            ],
        };
        let line_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4],
        };
        // Lines reuse the mesh `Instance` struct; location 6 lands on its
        // `color` field, which carries the opacity for line draws.
        let line_instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![
                2 => Float32x4, 3 => Float32x4, 4 => Float32x4, 5 => Float32x4,
                6 => Float32x4
            ],
        };

        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow_pipeline_layout"),
                bind_group_layouts: &[&globals_layout],
                push_constant_ranges: &[],
            });
        let scene_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("scene_pipeline_layout"),
                bind_group_layouts: &[&scene_layout],
                push_constant_ranges: &[],
            });

        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_shadow"),
                buffers: &[mesh_vertex_layout.clone(), mesh_instance_layout.clone()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let make_mesh_pipeline = |label: &str, blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&scene_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_mesh"),
                    buffers: &[mesh_vertex_layout.clone(), mesh_instance_layout.clone()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_mesh"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: blend.is_none(),
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let mesh_pipeline = make_mesh_pipeline("mesh_pipeline", None);
        let mesh_blend_pipeline =
            make_mesh_pipeline("mesh_blend_pipeline", Some(wgpu::BlendState::ALPHA_BLENDING));

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line_pipeline"),
            layout: Some(&scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_line"),
                buffers: &[line_vertex_layout, line_instance_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_line"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let mesh_instance_buffer = Self::create_instance_buffer(device, "mesh_instances", 16);
        let line_instance_buffer = Self::create_instance_buffer(device, "line_instances", 16);

        ScenePass {
            shadow_pipeline,
            mesh_pipeline,
            mesh_blend_pipeline,
            line_pipeline,
            globals_buffer,
            shadow_bind_group,
            scene_bind_group,
            shadow_view,
            mesh_instance_buffer,
            mesh_instance_capacity: 16,
            line_instance_buffer,
            line_instance_capacity: 16,
            meshes: Vec::new(),
            lines: Vec::new(),
            mesh_sources: Vec::new(),
            line_sources: Vec::new(),
        }
    }

    fn create_instance_buffer(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<Instance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Renders the scene into `color_view`.
    pub(crate) fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        scene: &SceneNode,
        camera: &dyn Camera3d,
        environment: &Environment,
    ) {
        let (mesh_draws, line_draws, shadow_light) =
            self.collect(device, queue, scene, camera, environment);

        if shadow_light.is_some() {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.shadow_bind_group, &[]);
            shadow_pass.set_vertex_buffer(1, self.mesh_instance_buffer.slice(..));
            for draw in mesh_draws.iter().filter(|d| d.cast_shadow) {
                let mesh = &self.meshes[draw.gpu_index];
                shadow_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                shadow_pass
                    .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                shadow_pass.draw_indexed(
                    0..mesh.index_count,
                    0,
                    draw.instance_index..draw.instance_index + 1,
                );
            }
        }

        let bg = environment.background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("forward_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: bg.r as f64,
                        g: bg.g as f64,
                        b: bg.b as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.scene_bind_group, &[]);
        pass.set_vertex_buffer(1, self.mesh_instance_buffer.slice(..));

        // Opaque meshes first, transparent ones after, lines last.
        for transparent in [false, true] {
            pass.set_pipeline(if transparent {
                &self.mesh_blend_pipeline
            } else {
                &self.mesh_pipeline
            });
            for draw in mesh_draws.iter().filter(|d| d.transparent == transparent) {
                let mesh = &self.meshes[draw.gpu_index];
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(
                    0..mesh.index_count,
                    0,
                    draw.instance_index..draw.instance_index + 1,
                );
            }
        }

        pass.set_pipeline(&self.line_pipeline);
        pass.set_vertex_buffer(1, self.line_instance_buffer.slice(..));
        for draw in &line_draws {
            let lines = &self.lines[draw.gpu_index];
            pass.set_vertex_buffer(0, lines.vertex_buffer.slice(..));
            pass.draw(
                0..lines.vertex_count,
                draw.instance_index..draw.instance_index + 1,
            );
        }
    }

    /// Walks the scene, uploads globals and instances, and (re)builds
    /// geometry buffers when the gathered geometry differs from what the
    /// current buffers hold.
    fn collect(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &SceneNode,
        camera: &dyn Camera3d,
        environment: &Environment,
    ) -> (Vec<MeshDraw>, Vec<LineDraw>, Option<Light>) {
        let FrameData {
            mesh_instances,
            line_instances,
            mesh_draws,
            line_draws,
            mesh_geometries,
            line_geometries,
            lights,
        } = FrameData::gather(scene);

        if self.mesh_sources != mesh_geometries {
            self.meshes = mesh_geometries
                .iter()
                .map(|geometry| {
                    let vertices: Vec<MeshVertex> = geometry
                        .positions
                        .iter()
                        .zip(&geometry.normals)
                        .map(|(p, n)| MeshVertex {
                            position: p.to_array(),
                            normal: n.to_array(),
                        })
                        .collect();
                    let indices: Vec<u32> = geometry
                        .indices
                        .iter()
                        .flat_map(|tri| tri.iter().copied())
                        .collect();
                    GpuMesh {
                        vertex_buffer: device.create_buffer_init(
                            &wgpu::util::BufferInitDescriptor {
                                label: Some("mesh_vertices"),
                                contents: bytemuck::cast_slice(&vertices),
                                usage: wgpu::BufferUsages::VERTEX,
                            },
                        ),
                        index_buffer: device.create_buffer_init(
                            &wgpu::util::BufferInitDescriptor {
                                label: Some("mesh_indices"),
                                contents: bytemuck::cast_slice(&indices),
                                usage: wgpu::BufferUsages::INDEX,
                            },
                        ),
                        index_count: indices.len() as u32,
                    }
                })
                .collect();
            self.mesh_sources = mesh_geometries;
        }

        if self.line_sources != line_geometries {
            self.lines = line_geometries
                .iter()
                .map(|geometry| {
                    let vertices: Vec<LineVertex> = geometry
                        .positions
                        .iter()
                        .zip(&geometry.colors)
                        .map(|(p, c)| LineVertex {
                            position: p.to_array(),
                            color: [c.r, c.g, c.b, c.a],
                        })
                        .collect();
                    GpuLines {
                        vertex_buffer: device.create_buffer_init(
                            &wgpu::util::BufferInitDescriptor {
                                label: Some("line_vertices"),
                                contents: bytemuck::cast_slice(&vertices),
                                usage: wgpu::BufferUsages::VERTEX,
                            },
                        ),
                        vertex_count: vertices.len() as u32,
                    }
                })
                .collect();
            self.line_sources = line_geometries;
        }

        if mesh_instances.len() > self.mesh_instance_capacity {
            self.mesh_instance_capacity = mesh_instances.len().next_power_of_two();
            self.mesh_instance_buffer =
                Self::create_instance_buffer(device, "mesh_instances", self.mesh_instance_capacity);
        }
        if line_instances.len() > self.line_instance_capacity {
            self.line_instance_capacity = line_instances.len().next_power_of_two();
            self.line_instance_buffer =
                Self::create_instance_buffer(device, "line_instances", self.line_instance_capacity);
        }
        if !mesh_instances.is_empty() {
            queue.write_buffer(
                &self.mesh_instance_buffer,
                0,
                bytemuck::cast_slice(&mesh_instances),
            );
        }
        if !line_instances.is_empty() {
            queue.write_buffer(
                &self.line_instance_buffer,
                0,
                bytemuck::cast_slice(&line_instances),
            );
        }

        let shadow_light = lights.iter().find(|l| l.casts_shadow()).copied();
        let globals = self.build_globals(camera, environment, &lights, shadow_light.as_ref());
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        (mesh_draws, line_draws, shadow_light)
    }

    fn build_globals(
        &self,
        camera: &dyn Camera3d,
        environment: &Environment,
        lights: &[Light],
        shadow_light: Option<&Light>,
    ) -> GlobalUniforms {
        let mut ambient = [0.0f32; 4];
        let mut light_dirs = [[0.0f32; 4]; 2];
        let mut light_colors = [[0.0f32; 4]; 2];

        // Slot 0 is the shadow caster; other directional lights follow.
        let mut slot = usize::from(shadow_light.is_some());
        for light in lights {
            match light.kind {
                LightKind::Ambient => {
                    ambient[0] += light.color.r * light.intensity;
                    ambient[1] += light.color.g * light.intensity;
                    ambient[2] += light.color.b * light.intensity;
                }
                LightKind::Directional { .. } => {
                    let index = if light.casts_shadow() {
                        0
                    } else {
                        let index = slot;
                        slot += 1;
                        index
                    };
                    if index < light_dirs.len() {
                        let dir = light.direction();
                        light_dirs[index] = [dir.x, dir.y, dir.z, light.intensity];
                        light_colors[index] =
                            [light.color.r, light.color.g, light.color.b, 1.0];
                    }
                }
            }
        }

        let shadow_view_proj = shadow_light
            .and_then(Light::shadow_view_proj)
            .unwrap_or(Mat4::IDENTITY);
        let eye = camera.eye();
        let fog = environment.fog_color;

        GlobalUniforms {
            view_proj: camera.transformation().to_cols_array_2d(),
            shadow_view_proj: shadow_view_proj.to_cols_array_2d(),
            camera_pos: [eye.x, eye.y, eye.z, 1.0],
            ambient,
            fog_color_near: [fog.r, fog.g, fog.b, environment.fog_near],
            fog_far_shadow: [
                environment.fog_far,
                shadow_light.is_some() as u32 as f32,
                0.0,
                0.0,
            ],
            light_dirs,
            light_colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_scene(side: f32) -> SceneNode {
        let mut scene = SceneNode::group("scene");
        scene.add_cube("box", side, side, side);
        scene.add_grid("grid", 2000.0, 100, 0.1);
        scene
    }

    #[test]
    fn equal_census_with_different_geometry_is_stale() {
        let first = FrameData::gather(&box_scene(100.0));
        let second = FrameData::gather(&box_scene(50.0));

        // Same counts, so a count check alone would reuse the old buffers.
        assert_eq!(first.mesh_geometries.len(), second.mesh_geometries.len());
        assert_ne!(first.mesh_geometries, second.mesh_geometries);
    }

    #[test]
    fn regathering_an_unchanged_scene_is_not_stale() {
        let scene = box_scene(100.0);
        let first = FrameData::gather(&scene);
        let second = FrameData::gather(&scene);

        assert_eq!(first.mesh_geometries, second.mesh_geometries);
        assert_eq!(first.line_geometries, second.line_geometries);
    }

    #[test]
    fn draws_line_up_with_gathered_geometry() {
        let data = FrameData::gather(&box_scene(100.0));

        assert_eq!(data.mesh_draws.len(), data.mesh_geometries.len());
        assert_eq!(data.line_draws.len(), data.line_geometries.len());
        for (i, draw) in data.mesh_draws.iter().enumerate() {
            assert_eq!(draw.gpu_index, i);
            assert_eq!(draw.instance_index, i as u32);
        }
    }
}
