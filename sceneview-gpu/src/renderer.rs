use std::sync::Arc;
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::window::Window;

use nalgebra::{Matrix4, Point3};
use sceneview_core::{Error, Result, Scene};

use crate::device::{GpuContext, DEPTH_FORMAT};
use crate::mesh::{SceneMesh, SceneUniforms, SceneVertex};

/// Rendering configuration; the clear color comes from the scene background
#[derive(Debug, Clone)]
pub struct GpuRenderConfig {
    pub enable_depth_test: bool,
    pub cull_back_faces: bool,
    /// Color of highlighted meshes
    pub highlight_color: [f32; 3],
}

impl Default for GpuRenderConfig {
    fn default() -> Self {
        Self {
            enable_depth_test: true,
            cull_back_faces: true,
            highlight_color: [1.0, 0.6, 0.0],
        }
    }
}

/// Camera state the renderer needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct ViewParams {
    /// View-projection in OpenGL clip conventions
    pub view_proj: Matrix4<f32>,
    pub eye: Point3<f32>,
}

/// Drawing composited over the scene before a frame is presented
pub trait FrameOverlay {
    /// Record the overlay into `encoder`, targeting the frame's color
    /// attachment. Returned command buffers are submitted ahead of `encoder`.
    fn paint(
        &mut self,
        context: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: (u32, u32),
    ) -> Vec<wgpu::CommandBuffer>;
}

struct UploadedMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
}

/// Renders a [`Scene`] into a window surface.
///
/// Geometry is baked into world space and re-uploaded only when the scene's
/// revision changes.
pub struct GpuSceneRenderer {
    context: GpuContext,
    surface: Option<SurfaceState>,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    mesh: Option<UploadedMesh>,
    uploaded_revision: Option<u64>,
    config: GpuRenderConfig,
}

impl GpuSceneRenderer {
    /// Create a renderer drawing into `window`
    pub async fn new(window: Arc<Window>, config: GpuRenderConfig) -> Result<Self> {
        let size = window.inner_size();
        let (context, surface) = GpuContext::for_window(window).await?;

        let caps = surface.get_capabilities(&context.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface supports no texture format".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &surface_config);
        let depth_view = context.create_depth_texture(surface_config.width, surface_config.height);

        let uniforms = SceneUniforms::new(&Matrix4::identity(), &Point3::origin(), &[]);
        let uniform_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("scene bind group layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

        let uniform_bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = context.create_shader_module("scene shader", include_str!("shaders/scene.wgsl"));

        let layout = context
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("scene pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("scene pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[SceneVertex::desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: config.cull_back_faces.then_some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: config.enable_depth_test,
                    depth_compare: if config.enable_depth_test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        info!(
            adapter = %context.adapter.get_info().name,
            ?format,
            "gpu renderer ready"
        );

        Ok(Self {
            context,
            surface: Some(SurfaceState {
                surface,
                config: surface_config,
                depth_view,
            }),
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            mesh: None,
            uploaded_revision: None,
            config,
        })
    }

    pub fn config(&self) -> &GpuRenderConfig {
        &self.config
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Color format of the window surface, `None` once disposed
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface.as_ref().map(|state| state.config.format)
    }

    /// Surface size in pixels, zero once disposed
    pub fn size(&self) -> (u32, u32) {
        self.surface
            .as_ref()
            .map(|state| (state.config.width, state.config.height))
            .unwrap_or((0, 0))
    }

    /// Resize renderer surface; zero-sized requests are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(state) = self.surface.as_mut() {
            state.config.width = width;
            state.config.height = height;
            state.surface.configure(&self.context.device, &state.config);
            state.depth_view = self.context.create_depth_texture(width, height);
        }
    }

    fn upload(&mut self, scene: &Scene) {
        if self.uploaded_revision == Some(scene.revision()) {
            return;
        }
        let baked = SceneMesh::from_scene(scene, self.config.highlight_color);
        self.mesh = (!baked.is_empty()).then(|| UploadedMesh {
            vertex_buffer: self
                .context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("scene vertices"),
                    contents: bytemuck::cast_slice(&baked.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
            index_buffer: self
                .context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("scene indices"),
                    contents: bytemuck::cast_slice(&baked.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
            index_count: baked.indices.len() as u32,
        });
        self.uploaded_revision = Some(scene.revision());
        debug!(
            vertices = baked.vertices.len(),
            triangles = baked.indices.len() / 3,
            revision = scene.revision(),
            "scene uploaded"
        );
    }

    /// Draw one frame
    pub fn render(&mut self, scene: &Scene, view: &ViewParams) -> Result<()> {
        self.render_with_overlay(scene, view, None)
    }

    /// Draw one frame with `overlay` painted on top of the scene
    pub fn render_with_overlay(
        &mut self,
        scene: &Scene,
        view: &ViewParams,
        overlay: Option<&mut dyn FrameOverlay>,
    ) -> Result<()> {
        if self.surface.is_none() {
            return Err(Error::Disposed);
        }
        self.upload(scene);

        let uniforms = SceneUniforms::new(&view.view_proj, &view.eye, scene.lights());
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let Some(state) = self.surface.as_ref() else {
            return Err(Error::Disposed);
        };
        let output = match state.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Skip this frame; the next one draws into the fresh surface.
                state.surface.configure(&self.context.device, &state.config);
                return Ok(());
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {}", e))),
        };
        let view_texture = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let [r, g, b] = scene.background;
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view_texture,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &state.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(mesh) = &self.mesh {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        let size = (state.config.width, state.config.height);
        let overlay_buffers = match overlay {
            Some(overlay) => overlay.paint(&self.context, &mut encoder, &view_texture, size),
            None => Vec::new(),
        };
        self.context
            .queue
            .submit(overlay_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }

    /// Release the surface and every scene buffer
    pub fn dispose(&mut self) {
        self.mesh = None;
        self.uploaded_revision = None;
        if self.surface.take().is_some() {
            info!("gpu renderer disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.surface.is_none()
    }
}
