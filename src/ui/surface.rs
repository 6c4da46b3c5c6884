use crate::playback::VideoFrame;
use anyhow::Context;
use fltk::prelude::*;
use glam::{Vec2, Vec3};
use log::debug;
use wgpu::util::DeviceExt;

// USEFUL: https://github.com/fltk-rs/demos/tree/master/wgpu

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimpleVert {
    position: Vec3,
    tex_coords: Vec2,
}

impl SimpleVert {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SimpleVert>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Quad corners scaled by `scale` around the center of clip space.
fn quad_verts(scale: Vec2) -> [SimpleVert; 4] {
    let corner = |x: f32, y: f32, tex_coords: Vec2| SimpleVert {
        position: Vec3::new(x * scale.x, y * scale.y, 0.0),
        tex_coords,
    };
    [
        // TL
        corner(-1.0, 1.0, Vec2::ZERO),
        // BL
        corner(-1.0, -1.0, Vec2::Y),
        // BR
        corner(1.0, -1.0, Vec2::ONE),
        // TR
        corner(1.0, 1.0, Vec2::X),
    ]
}

const QUAD_INDS: &[u16] = &[0, 1, 2, 0, 2, 3];

/// Clip-space scale that fits a `frame` sized picture into a `surface` sized
/// target without distorting it.
pub fn letterbox_scale(frame: (u32, u32), surface: (u32, u32)) -> Vec2 {
    if frame.0 == 0 || frame.1 == 0 || surface.0 == 0 || surface.1 == 0 {
        return Vec2::ONE;
    }
    let frame_aspect = frame.0 as f32 / frame.1 as f32;
    let surface_aspect = surface.0 as f32 / surface.1 as f32;
    if frame_aspect > surface_aspect {
        Vec2::new(1.0, surface_aspect / frame_aspect)
    } else {
        Vec2::new(frame_aspect / surface_aspect, 1.0)
    }
}

/// GPU surface inside the video subwindow showing the latest decoded frame.
pub struct WgpuState<'a> {
    pub device: wgpu::Device,
    pub surface: wgpu::Surface<'a>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub queue: wgpu::Queue,
    pub render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    ind_count: u32,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    frame_texture: wgpu::Texture,
    frame_bind_group: wgpu::BindGroup,
}

impl WgpuState<'_> {
    pub async fn new(win: fltk::window::Window) -> anyhow::Result<Self> {
        let (width, height) = (win.pixel_w() as _, win.pixel_h() as _);
        // Instance, surface, adapter, device
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(win)
            .context("failed to create wgpu surface for the video window")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find an appropriate adapter")?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("failed to create device")?;
        let swapchain_format = surface
            .get_capabilities(&adapter)
            .formats
            .first()
            .copied()
            .context("surface is incompatible with the adapter")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: swapchain_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            desired_maximum_frame_latency: 2,
            view_formats: vec![swapchain_format],
        };
        if width > 0 && height > 0 {
            surface.configure(&device, &surface_config);
        }

        // Texture, black until the first frame arrives
        let texture_bind_group_layout = Self::make_bind_group_layout(&device);
        let frame_texture = Self::make_texture(&device, 1, 1);
        queue.write_texture(
            frame_texture.as_image_copy(),
            &[0, 0, 0, 0xFF],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            frame_texture.size(),
        );
        let frame_bind_group =
            Self::make_bind_group(&device, &texture_bind_group_layout, &frame_texture);

        // Pipeline
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SimpleVert::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(swapchain_format.into())],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Mesh data
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&quad_verts(Vec2::ONE)),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(QUAD_INDS),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            device,
            surface,
            surface_config,
            queue,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            ind_count: QUAD_INDS.len() as u32,
            texture_bind_group_layout,
            frame_texture,
            frame_bind_group,
        })
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface_config.width = width;
        self.surface_config.height = height;
        if self.valid_size() {
            self.surface.configure(&self.device, &self.surface_config);
        }
        self.update_letterbox();
    }

    pub fn valid_size(&self) -> bool {
        self.surface_config.width > 0 && self.surface_config.height > 0
    }

    /// Uploads `frame` and draws it.
    pub fn present_frame(&mut self, frame: &VideoFrame) -> anyhow::Result<()> {
        let size = self.frame_texture.size();
        if (size.width, size.height) != (frame.width, frame.height) {
            debug!("frame size is now {}x{}", frame.width, frame.height);
            self.frame_texture = Self::make_texture(&self.device, frame.width, frame.height);
            self.frame_bind_group = Self::make_bind_group(
                &self.device,
                &self.texture_bind_group_layout,
                &self.frame_texture,
            );
            self.update_letterbox();
        }

        self.queue.write_texture(
            self.frame_texture.as_image_copy(),
            &frame.to_rgba(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width),
                rows_per_image: Some(frame.height),
            },
            self.frame_texture.size(),
        );

        self.redraw()
    }

    fn update_letterbox(&self) {
        let size = self.frame_texture.size();
        let scale = letterbox_scale(
            (size.width, size.height),
            (self.surface_config.width, self.surface_config.height),
        );
        self.queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&quad_verts(scale)),
        );
    }

    pub fn redraw(&self) -> anyhow::Result<()> {
        if !self.valid_size() {
            return Ok(());
        }

        let frame = self
            .surface
            .get_current_texture()
            .context("failed to acquire next swap chain texture")?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("command_encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_pipeline(&self.render_pipeline);
            rpass.set_bind_group(0, &self.frame_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..self.ind_count, 0, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn make_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label: Some("frame_texture"),
            view_formats: &[],
        })
    }

    fn make_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("texture_bind_group_layout"),
        })
    }

    fn make_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &wgpu::Texture,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("frame_bind_group"),
        })
    }
}
