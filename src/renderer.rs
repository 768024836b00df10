// renderer.rs - wgpu implementation of the Scene the view adapters drive

use crate::camera::ViewerCamera;
use crate::loader::ModelData;
use anyhow::{Context, Result};
use glam::{EulerRot, Mat4, Quat, Vec3};
use image::RgbaImage;
use std::collections::{HashMap, VecDeque};
use stereo_viewer::error::SceneError;
use stereo_viewer::media::SourceKind;
use stereo_viewer::mesh::{build_plane, build_sphere, MeshData, Vertex};
use stereo_viewer::scene::{
    EntityId, Geometry, LoadToken, Pose, Scene, Shading, TextureId, TextureSource,
};
use stereo_viewer::stereo::{Eye, FrameContext, UvTransform, Viewport};
use stereo_viewer::ViewDispatcher;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Decoded images kept around so switching back to recent media is instant.
const DECODED_CACHE: usize = 4;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct EntityUniform {
    mvp: [[f32; 4]; 4],
    uv_repeat: [f32; 2],
    uv_offset: [f32; 2],
    shading: u32, // 0=standard, 1=legacy half-turn
    eye: u32,
    half_turn: u32,
    flip_v: u32,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct Drawable {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct ModelPart {
    drawable: Drawable,
    // keeps the texture alive for the bind group
    _texture: GpuTexture,
}

struct GpuEntity {
    label: &'static str,
    geometry: Geometry,
    pose: Pose,
    content_offset: Vec3,
    visible: bool,
    texture: Option<TextureId>,
    uv: UvTransform,
    shading: Shading,
    /// Plane or sphere mesh; models draw their parts instead.
    surface: Option<Drawable>,
    parts: Vec<ModelPart>,
    pending_model: Option<LoadToken>,
}

impl GpuEntity {
    fn model_matrix(&self) -> Mat4 {
        let r = self.pose.rotation;
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            r.y.to_radians(),
            r.x.to_radians(),
            r.z.to_radians(),
        );
        Mat4::from_scale_rotation_translation(self.pose.scale, rotation, self.pose.position)
            * Mat4::from_translation(self.content_offset)
    }

    fn uniform(&self, view_proj: Mat4, textured_like_gltf: bool) -> EntityUniform {
        let (shading, eye, half_turn) = match self.shading {
            Shading::Standard => (0, 0, 0),
            Shading::LegacyHalfTurn { eye, half_turn } => (1, eye.index(), half_turn as u32),
        };
        // a vertically mirrored entity already shows the image upright
        let flip_v = !textured_like_gltf && self.pose.scale.y >= 0.0;
        EntityUniform {
            mvp: (view_proj * self.model_matrix()).to_cols_array_2d(),
            uv_repeat: self.uv.repeat.to_array(),
            uv_offset: self.uv.offset.to_array(),
            shading,
            eye,
            half_turn,
            flip_v: flip_v as u32,
        }
    }
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    depth_view: wgpu::TextureView,
    white: GpuTexture,

    entities: Vec<GpuEntity>,
    textures: HashMap<TextureId, GpuTexture>,
    next_texture: u32,
    decoded: VecDeque<(String, RgbaImage)>,
    model_requests: Vec<(String, LoadToken)>,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: &Window, vsync: bool) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // SAFETY: the window outlives the renderer; main drops the renderer first.
        let surface = unsafe { instance.create_surface(window) }
            .context("failed to create window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await
            .context("failed to open graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("entity_bind_group_layout"),
        });

        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Entity Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Entity Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // spheres are seen from inside, planes from either side
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
        });

        let depth_view = create_depth_view(&device, &config);
        let white = upload_rgba(
            &device,
            &queue,
            &RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
            "white_texture",
        );

        let egui_ctx = egui::Context::default();
        let mut egui_state = egui_winit::State::new(window);
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            bind_group_layout,
            sampler,
            depth_view,
            white,
            entities: Vec::new(),
            textures: HashMap::new(),
            next_texture: 0,
            decoded: VecDeque::new(),
            model_requests: Vec::new(),
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.config.present_mode = present_mode(vsync);
        self.surface.configure(&self.device, &self.config);
    }

    /// Keep a decoded image so `create_texture` can upload it.
    pub fn stash_image(&mut self, src: String, image: RgbaImage) {
        self.decoded.retain(|(s, _)| *s != src);
        self.decoded.push_back((src, image));
        while self.decoded.len() > DECODED_CACHE {
            self.decoded.pop_front();
        }
    }

    pub fn decoded_size(&self, src: &str) -> Option<(u32, u32)> {
        self.decoded
            .iter()
            .find(|(s, _)| s == src)
            .map(|(_, img)| img.dimensions())
    }

    /// Model loads requested by the adapters since the last call.
    pub fn take_model_requests(&mut self) -> Vec<(String, LoadToken)> {
        std::mem::take(&mut self.model_requests)
    }

    /// Attach a finished model to the entity still waiting for `token`.
    /// Returns false for a superseded load.
    pub fn attach_model(&mut self, token: LoadToken, model: &ModelData) -> bool {
        let Some(index) = self
            .entities
            .iter()
            .position(|e| e.pending_model == Some(token))
        else {
            return false;
        };
        let parts = model
            .primitives
            .iter()
            .filter(|p| !p.mesh.indices.is_empty())
            .map(|p| {
                let texture = upload_rgba(&self.device, &self.queue, &p.base_color, "model_texture");
                let drawable = self.create_drawable(&p.mesh, &texture.view, "model_part");
                ModelPart {
                    drawable,
                    _texture: texture,
                }
            })
            .collect();
        let entity = &mut self.entities[index];
        entity.parts = parts;
        entity.pending_model = None;
        true
    }

    fn create_drawable(&self, mesh: &MeshData, view: &wgpu::TextureView, label: &str) -> Drawable {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<EntityUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.make_bind_group(&uniform_buffer, view);
        Drawable {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    fn make_bind_group(&self, uniform: &wgpu::Buffer, view: &wgpu::TextureView) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("entity_bind_group"),
        })
    }

    fn entity_texture_view(&self, texture: Option<TextureId>) -> Result<&wgpu::TextureView, SceneError> {
        match texture {
            Some(t) => self
                .textures
                .get(&t)
                .map(|g| &g.view)
                .ok_or(SceneError::UnknownTexture(t.0)),
            None => Ok(&self.white.view),
        }
    }

    fn surface_mesh(geometry: &Geometry) -> Option<MeshData> {
        match geometry {
            Geometry::Plane { width, height } => Some(build_plane(*width, *height)),
            Geometry::Sphere(spec) => Some(build_sphere(spec)),
            Geometry::Model => None,
        }
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut GpuEntity, SceneError> {
        self.entities
            .get_mut(id.0 as usize)
            .ok_or(SceneError::UnknownEntity(id.0))
    }

    fn write_uniforms(&self, view_proj: Mat4) {
        for entity in self.entities.iter().filter(|e| e.visible) {
            if let Some(d) = &entity.surface {
                let u = entity.uniform(view_proj, false);
                self.queue
                    .write_buffer(&d.uniform_buffer, 0, bytemuck::cast_slice(&[u]));
            }
            if !entity.parts.is_empty() {
                let u = entity.uniform(view_proj, true);
                for part in &entity.parts {
                    self.queue.write_buffer(
                        &part.drawable.uniform_buffer,
                        0,
                        bytemuck::cast_slice(&[u]),
                    );
                }
            }
        }
    }

    fn encode_eye(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        viewport: Viewport,
        first: bool,
    ) {
        let (color_load, depth_load) = if first {
            (
                wgpu::LoadOp::Clear(wgpu::Color { r: 0.05, g: 0.05, b: 0.05, a: 1.0 }),
                wgpu::LoadOp::Clear(1.0),
            )
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Eye Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: true,
                }),
                stencil_ops: None,
            }),
        });
        render_pass.set_viewport(viewport.x, viewport.y, viewport.width, viewport.height, 0.0, 1.0);
        render_pass.set_pipeline(&self.render_pipeline);

        for entity in self.entities.iter().filter(|e| e.visible) {
            let drawables = entity
                .surface
                .iter()
                .chain(entity.parts.iter().map(|p| &p.drawable));
            for d in drawables {
                render_pass.set_bind_group(0, &d.bind_group, &[]);
                render_pass.set_vertex_buffer(0, d.vertex_buffer.slice(..));
                render_pass.set_index_buffer(d.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..d.index_count, 0, 0..1);
            }
        }
    }

    /// Draw one frame. In split mode each half of the window is one eye and
    /// the adapters' per-eye hook runs before each half is submitted.
    pub fn render_frame(
        &mut self,
        window: &Window,
        camera: &ViewerCamera,
        dispatcher: &mut ViewDispatcher,
        presenting: bool,
        run_ui: Option<&mut dyn FnMut(&egui::Context)>,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let (w, h) = (self.config.width as f32, self.config.height as f32);

        let passes: Vec<(FrameContext, Eye, Viewport)> = if presenting {
            let half = w / 2.0;
            [(0.0, Eye::Left), (half, Eye::Right)]
                .into_iter()
                .map(|(x, eye)| {
                    let vp = Viewport { x, y: 0.0, width: half, height: h };
                    (FrameContext::eye_pass(vp), eye, vp)
                })
                .collect()
        } else {
            let vp = Viewport { x: 0.0, y: 0.0, width: w, height: h };
            vec![(FrameContext::windowed(), Eye::Mono, vp)]
        };

        for (i, (frame, eye, vp)) in passes.into_iter().enumerate() {
            dispatcher.update_frame(self, &frame);
            self.write_uniforms(camera.view_proj(eye, vp.width / vp.height.max(1.0)));

            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Eye Encoder"),
            });
            self.encode_eye(&mut encoder, &view, vp, i == 0);
            // submitting per eye makes the buffer writes above visible to this pass only
            self.queue.submit(std::iter::once(encoder.finish()));
        }

        if let Some(run_ui) = run_ui {
            self.render_ui(window, &view, run_ui);
        }
        output.present();
        Ok(())
    }

    fn render_ui(
        &mut self,
        window: &Window,
        view: &wgpu::TextureView,
        run_ui: &mut dyn FnMut(&egui::Context),
    ) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("UI Encoder"),
        });
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| run_ui(ctx));

        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn upload_source(&self, source: &TextureSource) -> Result<GpuTexture, SceneError> {
        match source.kind {
            SourceKind::Image => {
                let (_, img) = self
                    .decoded
                    .iter()
                    .find(|(s, _)| *s == source.src)
                    .ok_or_else(|| SceneError::SourceUnavailable(source.src.clone()))?;
                let max = self.device.limits().max_texture_dimension_2d;
                let (w, h) = img.dimensions();
                if w > max || h > max {
                    let scale = max as f32 / w.max(h) as f32;
                    let (nw, nh) = ((w as f32 * scale) as u32, (h as f32 * scale) as u32);
                    log::warn!("{} is {w}x{h}, above the GPU limit {max}; scaling to {nw}x{nh}", source.src);
                    let scaled = image::imageops::resize(img, nw, nh, image::imageops::FilterType::Lanczos3);
                    Ok(upload_rgba(&self.device, &self.queue, &scaled, "media_texture"))
                } else {
                    Ok(upload_rgba(&self.device, &self.queue, img, "media_texture"))
                }
            }
            SourceKind::Video => {
                log::warn!("video playback is not supported, showing a placeholder for {}", source.src);
                let mut checker = RgbaImage::new(2, 2);
                for (x, y, px) in checker.enumerate_pixels_mut() {
                    let v = if (x + y) % 2 == 0 { 200 } else { 60 };
                    *px = image::Rgba([v, v, v, 255]);
                }
                Ok(upload_rgba(&self.device, &self.queue, &checker, "video_placeholder"))
            }
            SourceKind::Model => Err(SceneError::SourceUnavailable(source.src.clone())),
        }
    }
}

impl Scene for Renderer {
    fn spawn(&mut self, label: &'static str, geometry: Geometry, pose: Pose) -> EntityId {
        let surface = Self::surface_mesh(&geometry)
            .map(|mesh| self.create_drawable(&mesh, &self.white.view, label));
        self.entities.push(GpuEntity {
            label,
            geometry,
            pose,
            content_offset: Vec3::ZERO,
            visible: false,
            texture: None,
            uv: UvTransform::IDENTITY,
            shading: Shading::Standard,
            surface,
            parts: Vec::new(),
            pending_model: None,
        });
        log::debug!("spawned entity {label}");
        EntityId(self.entities.len() as u32 - 1)
    }

    fn set_geometry(&mut self, id: EntityId, geometry: Geometry) -> Result<(), SceneError> {
        let entity = self.entity_mut(id)?;
        if entity.geometry == geometry {
            return Ok(());
        }
        let texture = entity.texture;
        let surface = match Self::surface_mesh(&geometry) {
            Some(mesh) => {
                let view = self.entity_texture_view(texture)?;
                Some(self.create_drawable(&mesh, view, "surface"))
            }
            None => None,
        };
        let entity = self.entity_mut(id)?;
        entity.geometry = geometry;
        entity.surface = surface;
        Ok(())
    }

    fn set_visible(&mut self, id: EntityId, visible: bool) -> Result<(), SceneError> {
        self.entity_mut(id)?.visible = visible;
        Ok(())
    }

    fn set_scale(&mut self, id: EntityId, scale: Vec3) -> Result<(), SceneError> {
        self.entity_mut(id)?.pose.scale = scale;
        Ok(())
    }

    fn set_rotation(&mut self, id: EntityId, rotation: Vec3) -> Result<(), SceneError> {
        self.entity_mut(id)?.pose.rotation = rotation;
        Ok(())
    }

    fn set_content_offset(&mut self, id: EntityId, offset: Vec3) -> Result<(), SceneError> {
        self.entity_mut(id)?.content_offset = offset;
        Ok(())
    }

    fn create_texture(&mut self, source: &TextureSource) -> Result<TextureId, SceneError> {
        let gpu = self.upload_source(source)?;
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, gpu);
        Ok(id)
    }

    fn dispose_texture(&mut self, texture: TextureId) -> Result<(), SceneError> {
        let gpu = self
            .textures
            .remove(&texture)
            .ok_or(SceneError::UnknownTexture(texture.0))?;
        gpu.texture.destroy();
        Ok(())
    }

    fn bind_texture(&mut self, id: EntityId, texture: Option<TextureId>) -> Result<(), SceneError> {
        let entity = self
            .entities
            .get(id.0 as usize)
            .ok_or(SceneError::UnknownEntity(id.0))?;
        let bind_group = match &entity.surface {
            Some(d) => Some(self.make_bind_group(&d.uniform_buffer, self.entity_texture_view(texture)?)),
            None => None,
        };
        let entity = self.entity_mut(id)?;
        entity.texture = texture;
        if let (Some(d), Some(bg)) = (entity.surface.as_mut(), bind_group) {
            d.bind_group = bg;
        }
        Ok(())
    }

    fn set_uv_transform(&mut self, id: EntityId, transform: UvTransform) {
        if let Some(e) = self.entities.get_mut(id.0 as usize) {
            e.uv = transform;
        }
    }

    fn set_shading(&mut self, id: EntityId, shading: Shading) {
        if let Some(e) = self.entities.get_mut(id.0 as usize) {
            e.shading = shading;
        }
    }

    fn load_model(&mut self, id: EntityId, src: &str, token: LoadToken) -> Result<(), SceneError> {
        let entity = self.entity_mut(id)?;
        entity.pending_model = Some(token);
        log::debug!("{} waits for model {src}", entity.label);
        self.model_requests.push((src.to_string(), token));
        Ok(())
    }

    fn clear_model(&mut self, id: EntityId) -> Result<(), SceneError> {
        let entity = self.entity_mut(id)?;
        entity.parts.clear();
        entity.pending_model = None;
        Ok(())
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
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

fn upload_rgba(device: &wgpu::Device, queue: &wgpu::Queue, img: &RgbaImage, label: &str) -> GpuTexture {
    let (width, height) = img.dimensions();
    let texture_size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some(label),
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        img,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        texture_size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<EntityUniform>(), 96);
    }
}
