//! wgpu rendering surface: tries a WebGPU context first and falls back once
//! to WebGL2. Geometry, programs and textures live in handle tables; each
//! frame writes one uniform block per draw.

mod helpers;

use crate::dom;
use fnv::FnvHashMap;
use viz_core::uniforms::UniformBlock;
use viz_core::{
    Camera, DecodedImage, DrawItem, GeometryHandle, GraphicsBackend, MeshData, ProgramHandle,
    ProgramOptions, RenderSurface, ShaderDefinition, TextureHandle, VizError,
};
use web_sys as web;
use wgpu::util::DeviceExt;

struct GpuGeometry {
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    count: u32,
}

struct GpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

pub struct GpuState {
    // replaced when the WebGL2 retry needs a context-free element
    canvas: web::HtmlCanvasElement,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    bind_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    // sampled when no image is bound
    blank: GpuTexture,
    uniform_slots: Vec<wgpu::Buffer>,
    geometries: FnvHashMap<u64, GpuGeometry>,
    programs: FnvHashMap<u64, wgpu::RenderPipeline>,
    textures: FnvHashMap<u64, GpuTexture>,
    next_handle: u64,
    backend: wgpu::Backend,
}

struct OpenedDevice {
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

async fn open_device(
    canvas: &web::HtmlCanvasElement,
    backends: wgpu::Backends,
) -> anyhow::Result<OpenedDevice> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });
    let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("no adapter for {:?}", backends))?;
    let limits = if backends.contains(wgpu::Backends::GL) {
        wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
    } else {
        // default limits avoid passing unknown fields to older WebGPU impls
        wgpu::Limits::default()
    };
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::Performance,
                label: None,
            },
            None,
        )
        .await
        .map_err(|e| anyhow::anyhow!("request_device error: {:?}", e))?;
    Ok(OpenedDevice {
        surface,
        adapter,
        device,
        queue,
    })
}

impl GpuState {
    /// Open a device on `canvas`. The WebGL2 retry runs on a fresh copy of
    /// the element, since a canvas only ever hands out one context kind;
    /// [`GpuState::canvas`] is the element actually in use.
    pub async fn new(canvas: &web::HtmlCanvasElement) -> Result<Self, VizError> {
        let (dev, canvas) = match open_device(canvas, wgpu::Backends::BROWSER_WEBGPU).await {
            Ok(dev) => (dev, canvas.clone()),
            Err(webgpu) => {
                log::warn!("[render] WebGPU unavailable ({:#}); trying WebGL2", webgpu);
                let fresh = dom::replace_canvas(canvas).map_err(|e| {
                    VizError::DeviceUnavailable(format!("WebGPU: {webgpu:#}; {e:#}"))
                })?;
                let dev = open_device(&fresh, wgpu::Backends::GL).await.map_err(|webgl| {
                    VizError::DeviceUnavailable(format!("WebGPU: {webgpu:#}; WebGL2: {webgl:#}"))
                })?;
                (dev, fresh)
            }
        };
        let OpenedDevice {
            surface,
            adapter,
            device,
            queue,
        } = dev;
        let backend = adapter.get_info().backend;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| VizError::DeviceUnavailable("surface has no formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: canvas.width().max(1),
            height: canvas.height().max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = helpers::create_depth_texture(&device, config.width, config.height);

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("viz_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
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
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("viz_pl"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let blank = GpuTexture {
            view: helpers::create_rgba_texture(&device, &queue, "blank", 1, 1, &[255; 4]),
            sampler: make_sampler(&device),
        };
        log::info!("[render] device ready on {:?} ({:?})", backend, format);

        Ok(Self {
            canvas,
            surface,
            device,
            queue,
            config,
            depth_view,
            bind_layout,
            pipeline_layout,
            blank,
            uniform_slots: Vec::new(),
            geometries: FnvHashMap::default(),
            programs: FnvHashMap::default(),
            textures: FnvHashMap::default(),
            next_handle: 0,
            backend,
        })
    }

    pub fn backend(&self) -> wgpu::Backend {
        self.backend
    }

    pub fn canvas(&self) -> &web::HtmlCanvasElement {
        &self.canvas
    }

    fn next_id(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn ensure_uniform_slots(&mut self, count: usize) {
        while self.uniform_slots.len() < count {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("uniforms"),
                size: std::mem::size_of::<UniformBlock>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.uniform_slots.push(buffer);
        }
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_view =
            helpers::create_depth_texture(&self.device, self.config.width, self.config.height);
    }
}

fn make_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("image_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

impl GraphicsBackend for GpuState {
    fn create_geometry(&mut self, mesh: &MeshData) -> GeometryHandle {
        let vertices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertices"),
                contents: bytemuck::cast_slice(&helpers::interleave(mesh)),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let (indices, count) = if mesh.indices.is_empty() {
            (None, mesh.vertex_count() as u32)
        } else {
            let buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("indices"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            (Some(buffer), mesh.indices.len() as u32)
        };
        let id = self.next_id();
        self.geometries.insert(
            id,
            GpuGeometry {
                vertices,
                indices,
                count,
            },
        );
        GeometryHandle(id)
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        if let Some(geometry) = self.geometries.remove(&handle.0) {
            geometry.vertices.destroy();
            if let Some(indices) = geometry.indices {
                indices.destroy();
            }
        }
    }

    fn create_program(
        &mut self,
        shader: &'static ShaderDefinition,
        options: ProgramOptions,
    ) -> ProgramHandle {
        let module = |stage: &str, label: &str| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(helpers::compose(stage).into()),
                })
        };
        let vertex = module(shader.vertex.source, shader.id);
        // object programs keep both stages in one source
        let fragment = if shader.vertex.source == shader.fragment.source {
            None
        } else {
            Some(module(shader.fragment.source, shader.id))
        };
        let pipeline = helpers::make_program_pipeline(
            &self.device,
            &self.pipeline_layout,
            (&vertex, shader.vertex.entry_point),
            (fragment.as_ref().unwrap_or(&vertex), shader.fragment.entry_point),
            self.config.format,
            options,
            shader.id,
        );
        let id = self.next_id();
        self.programs.insert(id, pipeline);
        log::debug!("[render] program {} built for {}", id, shader.id);
        ProgramHandle(id)
    }

    fn release_program(&mut self, handle: ProgramHandle) {
        self.programs.remove(&handle.0);
    }

    fn create_texture(&mut self, image: &DecodedImage) -> TextureHandle {
        let image = image.fit_within(self.device.limits().max_texture_dimension_2d);
        let view = helpers::create_rgba_texture(
            &self.device,
            &self.queue,
            "image",
            image.width.max(1),
            image.height.max(1),
            &image.rgba,
        );
        let texture = GpuTexture {
            view,
            sampler: make_sampler(&self.device),
        };
        let id = self.next_id();
        self.textures.insert(id, texture);
        TextureHandle(id)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle.0);
    }
}

impl RenderSurface for GpuState {
    fn render(&mut self, draws: &[DrawItem<'_>], camera: &Camera) -> anyhow::Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(e) => anyhow::bail!("surface error: {:?}", e),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let view_proj = camera.view_projection();

        self.ensure_uniform_slots(draws.len());
        let mut bind_groups = Vec::with_capacity(draws.len());
        for (i, draw) in draws.iter().enumerate() {
            let block = UniformBlock::new(view_proj, draw.model, draw.uniforms);
            self.queue
                .write_buffer(&self.uniform_slots[i], 0, bytemuck::bytes_of(&block));
            let image = draw
                .uniforms
                .texture()
                .and_then(|t| self.textures.get(&t.0))
                .unwrap_or(&self.blank);
            bind_groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("draw_bg"),
                layout: &self.bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform_slots[i].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&image.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&image.sampler),
                    },
                ],
            }));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
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
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for (draw, bind_group) in draws.iter().zip(&bind_groups) {
                let (Some(pipeline), Some(geometry)) = (
                    self.programs.get(&draw.program.0),
                    self.geometries.get(&draw.geometry.0),
                ) else {
                    log::debug!("[render] skipping draw with released handles");
                    continue;
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, bind_group, &[]);
                rpass.set_vertex_buffer(0, geometry.vertices.slice(..));
                match &geometry.indices {
                    Some(indices) => {
                        rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..geometry.count, 0, 0..1);
                    }
                    None => rpass.draw(0..geometry.count, 0..1),
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.config.width || height != self.config.height {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }

    fn dispose(&mut self) {
        for (_, geometry) in self.geometries.drain() {
            geometry.vertices.destroy();
            if let Some(indices) = geometry.indices {
                indices.destroy();
            }
        }
        self.programs.clear();
        self.textures.clear();
        self.uniform_slots.clear();
        log::info!("[render] surface released");
    }
}
