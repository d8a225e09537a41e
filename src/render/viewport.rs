//! 3D viewport drawn inside an egui panel.
//!
//! The scene is rendered into an offscreen colour + depth target during
//! `prepare`, then blitted into egui's pass during `paint`.

use super::camera::OrbitCamera;
use super::draw::DrawList;
use super::lighting::MAX_POINT_LIGHTS;
use crate::geometry::{MeshData, MeshId, Topology};
use crate::materials::ShadingParams;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use std::ops::Range;
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    pub sky: [f32; 4],
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub point_position: [[f32; 4]; MAX_POINT_LIGHTS],
    pub point_color: [[f32; 4]; MAX_POINT_LIGHTS],
}

fn rgb4(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

impl FrameUniforms {
    pub fn new(list: &DrawList, view_proj: Mat4, camera_pos: Vec3) -> Self {
        let lights = &list.lights;
        let (sky, has_env) = match lights.environment {
            Some(env) => (env.sky_tint(), 1.0),
            None => ([0.0; 3], 0.0),
        };
        let sun_direction = Vec3::from(lights.directional.position).normalize_or(Vec3::Y);
        let mut point_position = [[0.0; 4]; MAX_POINT_LIGHTS];
        let mut point_color = [[0.0; 4]; MAX_POINT_LIGHTS];
        for (slot, light) in lights.active_points().enumerate() {
            point_position[slot] = rgb4(light.position, 1.0);
            point_color[slot] = rgb4(light.radiance(), 0.0);
        }
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.extend(1.0).to_array(),
            ambient: rgb4(lights.ambient_radiance(), 0.0),
            sky: rgb4(sky, has_env),
            sun_direction: sun_direction.extend(0.0).to_array(),
            sun_color: rgb4(lights.directional.radiance(), 0.0),
            point_position,
            point_color,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: [f32; 4],
    pub emissive: [f32; 4],
    pub params: [f32; 4],
    pub params2: [f32; 4],
    pub params3: [f32; 4],
}

fn flag(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}

impl From<&ShadingParams> for MaterialUniforms {
    fn from(s: &ShadingParams) -> Self {
        let opacity = if s.transparent { s.opacity.clamp(0.0, 1.0) } else { 1.0 };
        Self {
            base_color: rgb4(s.color, opacity),
            emissive: rgb4(s.emissive.map(|c| c * s.emissive_intensity), 0.0),
            params: [s.metalness, s.roughness, s.env_map_intensity, s.clearcoat],
            params2: [
                s.transmission,
                flag(s.flat_shading),
                flag(s.unlit),
                flag(s.tone_mapped),
            ],
            params3: [s.clearcoat_roughness, s.reflectivity, s.ior, s.thickness],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pass {
    Opaque,
    Lines,
    Blended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedDraw {
    pub item: usize,
    pub pass: Pass,
    /// Draw the triangle mesh's edges instead of its faces.
    pub edges: bool,
}

/// Order the list for drawing: opaque faces, then lines, then blended faces
/// from far to near. Empty meshes and instance lists are skipped.
pub fn plan_draws(list: &DrawList, camera_pos: Vec3) -> Vec<PlannedDraw> {
    let mut planned: Vec<(PlannedDraw, f32)> = list
        .items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.mesh.is_empty() && !item.instances.is_empty())
        .map(|(index, item)| {
            let lines = item.mesh.topology == Topology::Lines;
            let (pass, edges) = if lines || item.shading.wireframe {
                (Pass::Lines, !lines)
            } else if item.shading.is_blended() {
                (Pass::Blended, false)
            } else {
                (Pass::Opaque, false)
            };
            let distance = item.instances[0].w_axis.truncate().distance(camera_pos);
            (PlannedDraw { item: index, pass, edges }, distance)
        })
        .collect();
    planned.sort_by(|(a, da), (b, db)| {
        a.pass.cmp(&b.pass).then_with(|| {
            if a.pass == Pass::Blended {
                db.total_cmp(da)
            } else {
                std::cmp::Ordering::Equal
            }
        })
    });
    planned.into_iter().map(|(draw, _)| draw).collect()
}

/// Everything one frame of the viewport needs on the GPU side.
pub struct ViewportFrame {
    pub list: DrawList,
    pub uniforms: FrameUniforms,
    pub size_px: [u32; 2],
}

pub struct ViewportCallback {
    pub frame: ViewportFrame,
}

impl egui_wgpu::CallbackTrait for ViewportCallback {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        egui_encoder: &mut wgpu::CommandEncoder,
        callback_resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        match callback_resources.get_mut::<ViewportResources>() {
            Some(resources) => resources.render_scene(device, queue, egui_encoder, &self.frame),
            None => log::warn!("Viewport resources missing, skipping 3D pass"),
        }
        Vec::new()
    }

    fn paint(
        &self,
        info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        callback_resources: &egui_wgpu::CallbackResources,
    ) {
        let Some(resources) = callback_resources.get::<ViewportResources>() else {
            return;
        };
        let vp = info.viewport_in_pixels();
        render_pass.set_viewport(
            vp.left_px as f32,
            vp.top_px as f32,
            vp.width_px as f32,
            vp.height_px as f32,
            0.0,
            1.0,
        );
        render_pass.set_pipeline(&resources.blit_pipeline);
        render_pass.set_bind_group(0, &resources.blit_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

/// Outcome of the pointer handling for one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ViewportInteraction {
    pub changed: bool,
    /// A drag was released or a wheel step applied.
    pub ended: bool,
}

/// Fill the remaining space of `ui` with the 3D view of `list` and apply
/// orbit (left drag), pan (right or middle drag) and zoom (wheel).
pub fn show_viewport(ui: &mut egui::Ui, camera: &mut OrbitCamera, list: DrawList) -> ViewportInteraction {
    let rect = ui.available_rect_before_wrap();
    let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
    let mut interaction = ViewportInteraction::default();

    let delta = response.drag_delta();
    if response.dragged_by(egui::PointerButton::Primary) {
        camera.orbit_drag([delta.x, delta.y]);
        interaction.changed = true;
    } else if response.dragged_by(egui::PointerButton::Secondary)
        || response.dragged_by(egui::PointerButton::Middle)
    {
        camera.pan([delta.x, delta.y], rect.height());
        interaction.changed = true;
    }
    if response.drag_stopped() {
        interaction.ended = true;
    }
    if response.hovered() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            camera.zoom((-scroll * 0.002).exp());
            interaction.changed = true;
            interaction.ended = true;
        }
    }

    let pixels_per_point = ui.ctx().pixels_per_point();
    let size_px = [
        (rect.width() * pixels_per_point).round().max(1.0) as u32,
        (rect.height() * pixels_per_point).round().max(1.0) as u32,
    ];
    let aspect = rect.width() / rect.height().max(1.0);
    let uniforms = FrameUniforms::new(&list, camera.view_projection(aspect), camera.position);
    ui.painter().add(egui_wgpu::Callback::new_paint_callback(
        rect,
        ViewportCallback {
            frame: ViewportFrame {
                list,
                uniforms,
                size_px,
            },
        },
    ));
    interaction
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    faces: Option<(wgpu::Buffer, u32)>,
    edges: Option<(wgpu::Buffer, u32)>,
    last_frame: u64,
}

struct Target {
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    size: [u32; 2],
}

struct DrawCommand {
    mesh: MeshId,
    pass: Pass,
    edges: bool,
    material_offset: u32,
    instances: Range<u32>,
}

fn align_to(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

fn index_buffer(device: &wgpu::Device, label: &str, indices: &[u32]) -> Option<(wgpu::Buffer, u32)> {
    if indices.is_empty() {
        return None;
    }
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    Some((buffer, indices.len() as u32))
}

/// GPU state for the viewport, stored in egui's callback resources.
pub struct ViewportResources {
    format: wgpu::TextureFormat,
    opaque_pipeline: wgpu::RenderPipeline,
    blended_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    material_stride: u64,
    instance_buffer: wgpu::Buffer,
    meshes: HashMap<MeshId, GpuMesh>,
    frame_index: u64,
    target: Target,
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    blit_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
}

const MATERIAL_SIZE: u64 = std::mem::size_of::<MaterialUniforms>() as u64;
const INSTANCE_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

impl ViewportResources {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("viewport_shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!("shader.wgsl"))),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("viewport_frame_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("viewport_material_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(MATERIAL_SIZE),
                },
                count: None,
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("viewport_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let opaque_pipeline = scene_pipeline(
            device,
            &layout,
            &shader,
            format,
            "viewport_opaque",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::REPLACE,
            true,
        );
        let blended_pipeline = scene_pipeline(
            device,
            &layout,
            &shader,
            format,
            "viewport_blended",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );
        let line_pipeline = scene_pipeline(
            device,
            &layout,
            &shader,
            format,
            "viewport_lines",
            wgpu::PrimitiveTopology::LineList,
            wgpu::BlendState::ALPHA_BLENDING,
            true,
        );

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("viewport_frame_uniforms"),
            contents: bytemuck::bytes_of(&FrameUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("viewport_frame_bg"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let material_stride = align_to(MATERIAL_SIZE, alignment);
        let material_buffer = uniform_array(device, material_stride * 16);
        let material_bind_group = material_bind_group(device, &material_layout, &material_buffer);
        let instance_buffer = instance_array(device, INSTANCE_SIZE * 256);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("viewport_blit_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let (blit_pipeline, blit_layout) = blit_pipeline(device, format);
        let target = create_target(device, format, [1, 1]);
        let blit_bind_group = blit_bind_group(device, &blit_layout, &target.color_view, &sampler);

        log::info!(
            "Viewport pipelines ready ({:?}, material stride {} bytes)",
            format,
            material_stride
        );

        Self {
            format,
            opaque_pipeline,
            blended_pipeline,
            line_pipeline,
            frame_buffer,
            frame_bind_group,
            material_layout,
            material_buffer,
            material_bind_group,
            material_stride,
            instance_buffer,
            meshes: HashMap::new(),
            frame_index: 0,
            target,
            blit_pipeline,
            blit_layout,
            blit_bind_group,
            sampler,
        }
    }

    fn ensure_target(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        let size = [size[0].max(1), size[1].max(1)];
        if self.target.size == size {
            return;
        }
        log::debug!("Viewport target resized to {}x{}", size[0], size[1]);
        self.target = create_target(device, self.format, size);
        self.blit_bind_group = blit_bind_group(device, &self.blit_layout, &self.target.color_view, &self.sampler);
    }

    fn upload_mesh(&mut self, device: &wgpu::Device, mesh: &MeshData, edges: bool) {
        let frame_index = self.frame_index;
        let gpu = self.meshes.entry(mesh.id()).or_insert_with(|| {
            let vertices: Vec<Vertex> = mesh
                .positions
                .iter()
                .zip(mesh.normals.iter().chain(std::iter::repeat(&[0.0, 1.0, 0.0])))
                .map(|(position, normal)| Vertex {
                    position: *position,
                    normal: *normal,
                })
                .collect();
            let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("viewport_mesh_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let (faces, edges) = match mesh.topology {
                Topology::Triangles => (index_buffer(device, "viewport_mesh_faces", &mesh.indices), None),
                Topology::Lines => (None, index_buffer(device, "viewport_mesh_lines", &mesh.indices)),
            };
            GpuMesh {
                vertices,
                faces,
                edges,
                last_frame: frame_index,
            }
        });
        gpu.last_frame = frame_index;
        if edges && gpu.edges.is_none() {
            gpu.edges = index_buffer(device, "viewport_mesh_edges", &mesh.edge_indices());
        }
    }

    fn render_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &ViewportFrame,
    ) {
        self.frame_index += 1;
        self.ensure_target(device, frame.size_px);

        let plan = plan_draws(&frame.list, Vec3::from_slice(&frame.uniforms.camera_pos[..3]));
        let stride = self.material_stride as usize;
        let mut materials = vec![0u8; plan.len().max(1) * stride];
        let mut instances: Vec<[[f32; 4]; 4]> = Vec::new();
        let mut commands = Vec::with_capacity(plan.len());
        for (slot, draw) in plan.iter().enumerate() {
            let item = &frame.list.items[draw.item];
            self.upload_mesh(device, &item.mesh, draw.edges);
            let uniforms = MaterialUniforms::from(&item.shading);
            let offset = slot * stride;
            materials[offset..offset + MATERIAL_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&uniforms));
            let first = instances.len() as u32;
            instances.extend(item.instances.iter().map(|m| m.to_cols_array_2d()));
            commands.push(DrawCommand {
                mesh: item.mesh.id(),
                pass: draw.pass,
                edges: draw.edges,
                material_offset: offset as u32,
                instances: first..instances.len() as u32,
            });
        }

        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame.uniforms));
        if materials.len() as u64 > self.material_buffer.size() {
            self.material_buffer = uniform_array(device, (materials.len() as u64).next_power_of_two());
            self.material_bind_group = material_bind_group(device, &self.material_layout, &self.material_buffer);
        }
        queue.write_buffer(&self.material_buffer, 0, &materials);
        let instance_bytes = (instances.len() as u64) * INSTANCE_SIZE;
        if instance_bytes > self.instance_buffer.size() {
            self.instance_buffer = instance_array(device, instance_bytes.next_power_of_two());
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let [r, g, b] = frame.list.background.map(f64::from);
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewport_scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for command in &commands {
                let Some(mesh) = self.meshes.get(&command.mesh) else {
                    continue;
                };
                let indices = if command.edges || command.pass == Pass::Lines {
                    mesh.edges.as_ref()
                } else {
                    mesh.faces.as_ref()
                };
                let Some((index_buffer, count)) = indices else {
                    continue;
                };
                let pipeline = match command.pass {
                    Pass::Opaque => &self.opaque_pipeline,
                    Pass::Blended => &self.blended_pipeline,
                    Pass::Lines => &self.line_pipeline,
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &self.material_bind_group, &[command.material_offset]);
                pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..*count, 0, command.instances.clone());
            }
        }

        let frame_index = self.frame_index;
        let before = self.meshes.len();
        self.meshes.retain(|_, mesh| mesh.last_frame == frame_index);
        if self.meshes.len() != before {
            log::trace!("Evicted {} GPU meshes", before - self.meshes.len());
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    topology: wgpu::PrimitiveTopology,
    blend: wgpu::BlendState,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                },
                wgpu::VertexBufferLayout {
                    array_stride: INSTANCE_SIZE,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        2 => Float32x4,
                        3 => Float32x4,
                        4 => Float32x4,
                        5 => Float32x4
                    ],
                },
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // double sided, the shader flips normals toward the eye
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn uniform_array(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("viewport_material_uniforms"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn instance_array(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("viewport_instances"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("viewport_material_bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(MATERIAL_SIZE),
            }),
        }],
    })
}

fn create_target(device: &wgpu::Device, format: wgpu::TextureFormat, size: [u32; 2]) -> Target {
    let extent = wgpu::Extent3d {
        width: size[0].max(1),
        height: size[1].max(1),
        depth_or_array_layers: 1,
    };
    let texture = |label: &str, format: wgpu::TextureFormat, usage: wgpu::TextureUsages| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };
    Target {
        color_view: texture(
            "viewport_color",
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        ),
        depth_view: texture("viewport_depth", DEPTH_FORMAT, wgpu::TextureUsages::RENDER_ATTACHMENT),
        size: [extent.width, extent.height],
    }
}

fn blit_pipeline(device: &wgpu::Device, format: wgpu::TextureFormat) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("viewport_blit_shader"),
        source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(BLIT_SHADER)),
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("viewport_blit_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("viewport_blit_pipeline_layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("viewport_blit_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        // egui's pass here has no depth attachment
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });
    (pipeline, layout)
}

fn blit_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("viewport_blit_bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

const BLIT_SHADER: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VsOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 3.0, -1.0),
        vec2<f32>(-1.0,  3.0)
    );
    var out: VsOut;
    out.position = vec4<f32>(positions[vi], 0.0, 1.0);
    out.uv = vec2<f32>((out.position.x + 1.0) * 0.5, 1.0 - (out.position.y + 1.0) * 0.5);
    return out;
}

@group(0) @binding(0) var t_scene: texture_2d<f32>;
@group(0) @binding(1) var s_scene: sampler;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return textureSample(t_scene, s_scene, in.uv);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;
    use crate::render::lighting::LightRig;
    use std::sync::Arc;

    #[test]
    fn uniform_layouts_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 80);
        assert_eq!(align_to(80, 256), 256);
        assert_eq!(align_to(80, 0), 80);
    }

    #[test]
    fn material_uniforms_pack_shading() {
        let mut shading = ShadingParams::baseline([0.2, 0.4, 0.6]);
        shading.emissive = [1.0, 0.5, 0.0];
        shading.emissive_intensity = 2.0;
        shading.flat_shading = true;
        shading.opacity = 0.3;
        let packed = MaterialUniforms::from(&shading);
        // opacity only counts for transparent materials
        assert_eq!(packed.base_color[3], 1.0);
        assert_eq!(packed.emissive, [2.0, 1.0, 0.0, 0.0]);
        assert_eq!(packed.params2, [0.0, 1.0, 0.0, 1.0]);

        shading.transparent = true;
        shading.tone_mapped = false;
        let packed = MaterialUniforms::from(&shading);
        assert_eq!(packed.base_color[3], 0.3);
        assert_eq!(packed.params2[3], 0.0);
    }

    #[test]
    fn frame_uniforms_pack_only_enabled_points() {
        let mut rig = LightRig::advanced_gallery();
        let list = DrawList::new(rig.clone());
        let frame = FrameUniforms::new(&list, Mat4::IDENTITY, Vec3::splat(5.0));
        assert_eq!(frame.point_color, [[0.0; 4]; MAX_POINT_LIGHTS]);
        assert_eq!(frame.sky[3], 1.0);
        assert_eq!(frame.camera_pos, [5.0, 5.0, 5.0, 1.0]);

        rig.points[0].enabled = true;
        rig.environment = None;
        let frame = FrameUniforms::new(&DrawList::new(rig), Mat4::IDENTITY, Vec3::ZERO);
        assert!(frame.point_color[0][2] > 0.0);
        assert_eq!(frame.point_position[0], [5.0, 5.0, 5.0, 1.0]);
        assert_eq!(frame.sky, [0.0; 4]);
    }

    #[test]
    fn draws_are_ordered_opaque_lines_blended() {
        let mut list = DrawList::new(LightRig::viewer());
        let cube = Arc::new(primitives::box_mesh(1.0, 1.0, 1.0));
        let glass = ShadingParams {
            transparent: true,
            opacity: 0.3,
            ..ShadingParams::baseline([1.0; 3])
        };
        let near = Mat4::from_translation(Vec3::new(4.0, 4.0, 4.0));
        let far = Mat4::from_translation(Vec3::new(-4.0, 0.0, -4.0));
        list.push(cube.clone(), near, glass);
        list.push(cube.clone(), far, glass);
        list.push(
            cube.clone(),
            Mat4::IDENTITY,
            ShadingParams {
                wireframe: true,
                ..ShadingParams::baseline([1.0; 3])
            },
        );
        list.push_grid(10.0, 10, DrawList::GRID_COLOR);
        list.push(cube.clone(), Mat4::IDENTITY, ShadingParams::baseline([1.0; 3]));
        list.push(Arc::new(MeshData::lines(Vec::new(), Vec::new())), Mat4::IDENTITY, ShadingParams::unlit([1.0; 3]));

        let plan = plan_draws(&list, Vec3::splat(5.0));
        let summary: Vec<(usize, Pass, bool)> = plan.iter().map(|d| (d.item, d.pass, d.edges)).collect();
        assert_eq!(
            summary,
            vec![
                (4, Pass::Opaque, false),
                (2, Pass::Lines, true),
                (3, Pass::Lines, false),
                (1, Pass::Blended, false),
                (0, Pass::Blended, false),
            ]
        );
    }
}
