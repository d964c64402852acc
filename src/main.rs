// Mandible morph viewer: instanced wgpu rendering of the mandible parts with
// an egui controls panel. Falls back to an egui-only flat diagram when no
// hardware adapter is available.

use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;
use winit::{
    event::{Event as WinitEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::KeyCode,
    window::Window,
};

use mandible_morph::{config, engine, error, prediction};

use config::{Backend, RenderConfig, ViewerConfig};
use engine::catalog::{find_by_name, FeatureId};
use engine::diagram;
use engine::hud::{FrameStats, Hud, HudFrame};
use engine::input::{shortcut, InputEvent, InputState, PointerEvent};
use engine::loader::LoadedMesh;
use engine::mesh::{GpuVertex, PrimitiveShape, RenderMesh};
use engine::systems::DrawItem;
use engine::viewer::{FrameOutput, ModelSource, Viewer, ViewerAction, ViewerEvent};
use engine::MeshRef;
use error::ViewerError;
use prediction::{Measurements, PredictionResponse};

// ============================================================================
// COMMAND LINE
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "mandible-morph", about = "Interactive mandible gender-morph viewer")]
struct Cli {
    /// TOML config file (defaults to $MANDIBLE_CONFIG, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// OBJ model to load instead of the configured one
    #[arg(long)]
    asset: Option<PathBuf>,

    /// Skip the asset and draw the procedural model
    #[arg(long)]
    procedural: bool,

    /// Draw the flat front-view diagram instead of 3D
    #[arg(long)]
    flat: bool,

    /// Comma-separated M1..M15 values shown in the landmark labels
    #[arg(long, conflicts_with = "sample")]
    measurements: Option<String>,

    /// Use the sample measurement set
    #[arg(long)]
    sample: bool,

    /// Saved prediction response (JSON) used to tint the highlight
    #[arg(long)]
    prediction: Option<PathBuf>,

    /// Feature selected at startup, by id ("M9") or name ("Gonial Angle")
    #[arg(long)]
    select: Option<String>,
}

// ============================================================================
// INSTANCE DATA (per-part)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4], // x used, rest padding
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance, // One per instance, not per vertex
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn from_draw_item(item: &DrawItem) -> Self {
        Self {
            model: item.model.to_cols_array_2d(),
            color: item.style.rgba(),
            emissive: [item.style.emissive, 0.0, 0.0, 0.0],
        }
    }
}

/// Consecutive instances sharing one mesh.
#[derive(Debug, Clone, PartialEq)]
struct DrawBatch {
    mesh: MeshRef,
    instances: Range<u32>,
}

/// Opaque parts first, then translucent ones far to near, merged into runs per mesh.
fn batch_draw_items(items: &[DrawItem], eye: Vec3) -> (Vec<InstanceData>, Vec<DrawBatch>) {
    let depth = |item: &DrawItem| item.model.w_axis.truncate().distance_squared(eye);
    let (mut opaque, mut translucent): (Vec<&DrawItem>, Vec<&DrawItem>) =
        items.iter().partition(|item| item.style.opacity >= 1.0);
    opaque.sort_by_key(|item| mesh_order(item.mesh));
    translucent.sort_by(|a, b| depth(b).total_cmp(&depth(a)));

    let mut instances = Vec::with_capacity(items.len());
    let mut batches: Vec<DrawBatch> = Vec::new();
    for item in opaque.into_iter().chain(translucent) {
        let idx = instances.len() as u32;
        instances.push(InstanceData::from_draw_item(item));
        match batches.last_mut() {
            Some(last) if last.mesh == item.mesh => last.instances.end = idx + 1,
            _ => batches.push(DrawBatch { mesh: item.mesh, instances: idx..idx + 1 }),
        }
    }
    (instances, batches)
}

fn mesh_order(mesh: MeshRef) -> (u8, usize) {
    match mesh {
        MeshRef::Primitive(shape) => (0, shape as usize),
        MeshRef::SubMesh(idx) => (1, idx),
    }
}

// ============================================================================
// UNIFORM DATA (camera only)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            eye: [0.0, 0.0, 1.0, 1.0],
        }
    }
}

// ============================================================================
// GPU MESHES
// ============================================================================

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &RenderMesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertex_buffer, index_buffer, index_count: mesh.index_count() as u32 }
    }
}

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.05, g: 0.05, b: 0.1, a: 1.0 };
const INITIAL_INSTANCES: usize = 64;

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// 3D SCENE RENDERER
// ============================================================================

struct SceneRenderer {
    render_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    max_instances: usize,
    depth_view: wgpu::TextureView,
    primitives: HashMap<PrimitiveShape, GpuMesh>,
    sub_meshes: Vec<GpuMesh>,
}

impl SceneRenderer {
    fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
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
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let instance_buffer = create_instance_buffer(device, INITIAL_INSTANCES);

        // Unit primitives are shared by every procedural part
        let primitives = PrimitiveShape::ALL
            .into_iter()
            .map(|shape| (shape, GpuMesh::upload(device, &format!("{shape:?}"), &shape.render_mesh())))
            .collect();

        Self {
            render_pipeline,
            uniform_buffer,
            uniform_bind_group,
            instance_buffer,
            max_instances: INITIAL_INSTANCES,
            depth_view: create_depth_view(device, config),
            primitives,
            sub_meshes: Vec::new(),
        }
    }

    fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) {
        self.depth_view = create_depth_view(device, config);
    }

    fn upload_loaded_mesh(&mut self, device: &wgpu::Device, mesh: &LoadedMesh) {
        self.sub_meshes = mesh
            .sub_meshes
            .iter()
            .map(|sub| GpuMesh::upload(device, &sub.name, &sub.mesh))
            .collect();
        log::info!("Uploaded {} sub-meshes", self.sub_meshes.len());
    }

    fn mesh(&self, mesh: MeshRef) -> Option<&GpuMesh> {
        match mesh {
            MeshRef::Primitive(shape) => self.primitives.get(&shape),
            MeshRef::SubMesh(idx) => self.sub_meshes.get(idx),
        }
    }

    /// Draw the frame's parts. Returns the number of draw calls.
    fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        frame: &FrameOutput,
    ) -> u32 {
        let uniforms = Uniforms {
            view_proj: frame.camera.view_proj.to_cols_array_2d(),
            eye: frame.camera.eye.extend(1.0).to_array(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        // Write instance data to buffer BEFORE render pass
        let (instances, batches) = batch_draw_items(&frame.draw_items, frame.camera.eye);
        if instances.len() > self.max_instances {
            self.max_instances = instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.max_instances);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

        let mut draw_calls = 0;
        for batch in &batches {
            let Some(mesh) = self.mesh(batch.mesh) else {
                continue;
            };
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, batch.instances.clone());
            draw_calls += 1;
        }
        draw_calls
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceData>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Background only; the flat diagram is drawn by the HUD on top.
fn clear_pass(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Clear Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    /// `None` in flat mode.
    scene: Option<SceneRenderer>,
    hud: Hud,

    viewer: Viewer,
    input: InputState,
    start: Instant,

    // FPS tracking
    frame_count: u32,
    frame_time_accum: f32,
    last_frame: Instant,
    last_fps_update: Instant,
    stats: FrameStats,
}

impl State {
    async fn new(window: Arc<Window>, render: &RenderConfig, viewer: Viewer) -> error::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let mut flat = render.backend == Backend::Flat;
        let hardware = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await;
        let adapter = match hardware {
            Some(adapter) => adapter,
            None => {
                log::warn!("No hardware adapter, requesting a fallback adapter");
                flat = true;
                instance
                    .request_adapter(&wgpu::RequestAdapterOptions {
                        power_preference: wgpu::PowerPreference::LowPower,
                        compatible_surface: Some(&surface),
                        force_fallback_adapter: true,
                    })
                    .await
                    .ok_or_else(|| {
                        log::error!("No graphics adapter at all, not even a software one; the viewer cannot draw");
                        ViewerError::NoAdapter
                    })?
            }
        };
        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            flat = true;
        }
        log::info!(
            "Adapter: {} ({:?}, {:?}) - {} mode",
            info.name,
            info.device_type,
            info.backend,
            if flat { "flat" } else { "3D" }
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(ViewerError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let scene = (!flat).then(|| SceneRenderer::new(&device, &config));
        let hud = Hud::new(&window, &device, config.format);

        let input = InputState::new();
        let now = Instant::now();

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            scene,
            hud,
            viewer,
            input,
            start: now,
            frame_count: 0,
            frame_time_accum: 0.0,
            last_frame: now,
            last_fps_update: now,
            stats: FrameStats {
                fps: 0,
                frame_time_avg_ms: 0.0,
                entity_count: 0,
                draw_calls: 0,
                resolution: (size.width, size.height),
            },
        })
    }

    /// Time since startup; every animation in the viewer runs on this clock.
    fn clock(&self) -> Duration {
        self.start.elapsed()
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            if let Some(scene) = &mut self.scene {
                scene.resize(&self.device, &self.config);
            }
            self.stats.resolution = (new_size.width, new_size.height);
        }
    }

    /// `captured`: egui is using the pointer, so only a drag release reaches the camera.
    fn handle_input(&mut self, input: InputEvent, captured: bool) {
        let now = self.clock();
        match input {
            InputEvent::KeyPressed(KeyCode::F3) => self.hud.toggle_stats(),
            InputEvent::KeyPressed(key) => {
                if let Some(action) = shortcut(key) {
                    self.viewer.handle_action(action, now);
                }
            }
            InputEvent::Pointer(PointerEvent::Up) => self.viewer.handle_pointer(PointerEvent::Up),
            InputEvent::Pointer(pointer) if !captured => self.viewer.handle_pointer(pointer),
            InputEvent::Pointer(_) => {}
        }
    }

    fn handle_viewer_events(&mut self) {
        for event in self.viewer.drain_events() {
            match event {
                ViewerEvent::SelectionChanged(Some(id)) => {
                    log::info!("Selected {} {}", id, id.definition().display_name);
                }
                ViewerEvent::SelectionChanged(None) => log::info!("Selection cleared"),
                ViewerEvent::ModelSourceChanged(source) => {
                    log::debug!("Model source: {}", source.label());
                    if let (ModelSource::Asset, Some(scene), Some(mesh)) =
                        (source, &mut self.scene, self.viewer.model().loaded_mesh())
                    {
                        scene.upload_loaded_mesh(&self.device, mesh);
                    }
                }
            }
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = self.clock();
        let viewport = Vec2::new(self.size.width as f32, self.size.height as f32);
        let frame = self.viewer.frame(now, viewport);
        self.handle_viewer_events();

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let (draw_calls, diagram) = match &mut self.scene {
            Some(scene) => (scene.draw(&self.device, &self.queue, &mut encoder, &view, &frame), None),
            None => {
                clear_pass(&mut encoder, &view);
                let primitives = self.viewer.primitives();
                let diagram = diagram::front_view(&primitives, frame.indicator.as_ref(), &frame.landmarks);
                (0, Some(diagram))
            }
        };
        self.stats.draw_calls = draw_calls;
        self.stats.entity_count = frame.draw_items.len();

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let snapshot = self.viewer.snapshot();
        let hud_frame = HudFrame {
            snapshot: &snapshot,
            measurements: self.viewer.measurements(),
            indicator: frame.screen_indicator.as_ref(),
            landmarks: &frame.screen_landmarks,
            diagram: diagram.as_ref(),
            stats: Some(&self.stats),
        };
        let actions = self.hud.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &hud_frame,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for action in actions {
            self.viewer.handle_action(action, now);
        }
        self.track_frame_time();
        Ok(())
    }

    fn track_frame_time(&mut self) {
        let now = Instant::now();
        self.frame_time_accum += (now - self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        self.frame_count += 1;
        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            self.stats.fps = self.frame_count;
            self.stats.frame_time_avg_ms = self.frame_time_accum / self.frame_count as f32;
            log::debug!(
                "FPS: {} | Parts: {} | Draw calls: {}",
                self.stats.fps,
                self.stats.entity_count,
                self.stats.draw_calls
            );
            self.frame_count = 0;
            self.frame_time_accum = 0.0;
            self.last_fps_update = now;
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

/// `--sample` or `--measurements`, else the config file.
fn load_measurements(cli: &Cli, config: &ViewerConfig) -> Measurements {
    if cli.sample {
        return Measurements::sample();
    }
    match cli.measurements.as_ref().or(config.measurements.as_ref()) {
        Some(list) => {
            let measurements = Measurements::parse(list);
            log::info!("{} of 15 measurements given", measurements.filled());
            measurements
        }
        None => Measurements::default(),
    }
}

fn load_prediction(cli: &Cli) -> Option<PredictionResponse> {
    let path = cli.prediction.as_ref()?;
    match PredictionResponse::load(path) {
        Ok(response) if response.success => Some(response),
        Ok(response) => {
            log::warn!(
                "Prediction response reports failure: {}",
                response.error.as_deref().unwrap_or("no error message")
            );
            None
        }
        Err(e) => {
            log::warn!("Ignoring prediction {}: {}", path.display(), e);
            None
        }
    }
}

fn parse_feature(text: &str) -> anyhow::Result<FeatureId> {
    text.parse::<FeatureId>()
        .or_else(|e| find_by_name(text).map(|def| def.id).ok_or(e))
        .map_err(anyhow::Error::msg)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = ViewerConfig::resolve(cli.config.as_deref()).context("loading viewer config")?;
    if let Some(asset) = &cli.asset {
        config.asset.path = Some(asset.clone());
    }
    if cli.procedural {
        config.asset.path = None;
    }
    if cli.flat {
        config.render.backend = Backend::Flat;
    }
    let initial_selection = cli.select.as_deref().map(parse_feature).transpose()?;
    let render = config.render.clone();
    let measurements = load_measurements(&cli, &config);
    let viewer = Viewer::new(config, measurements, load_prediction(&cli).as_ref());

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Mandible Morph")
        .with_inner_size(winit::dpi::LogicalSize::new(render.window_width, render.window_height));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), &render, viewer))
        .context("initializing renderer")?;
    let now = state.clock();
    state.viewer.start(now);
    if let Some(id) = initial_selection {
        state.viewer.handle_action(ViewerAction::Select(id), now);
    }

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                // egui sees every event first
                let captured = state.hud.handle_window_event(&window, event).consumed;

                match event {
                    WindowEvent::CloseRequested => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("Surface out of memory");
                                control_flow.exit();
                            }
                            Err(e) => log::warn!("Surface error: {:?}", e),
                        }
                    }
                    _ => {}
                }

                // A drag that started on the model keeps the pointer even over the panel
                let dragging = state.input.is_dragging();
                if let Some(input) = state.input.process_event(event) {
                    state.handle_input(input, captured && !dragging);
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
