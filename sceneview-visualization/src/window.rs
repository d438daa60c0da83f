//! Native window host
//!
//! Runs a [`Viewer`] inside a winit window: the window is the host container,
//! the wgpu renderer draws the scene, and window events are forwarded as
//! resize notifications and controller input. An egui layer paints the status
//! labels and the hierarchy panel on top of every presented frame. One tick
//! runs per redraw; the next redraw is requested while the viewer keeps
//! running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tracing::{info, warn};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use sceneview_core::{Error, Result, Scene};
use sceneview_gpu::{FrameOverlay, GpuContext, GpuRenderConfig, GpuSceneRenderer, ViewParams};

use crate::camera::Camera;
use crate::controls::{ControlInput, PointerButton};
use crate::renderer::SceneRenderer;
use crate::status::ViewerStatus;
use crate::ui::ViewerUi;
use crate::viewer::{Viewer, ViewerBuilder};
use crate::viewport::{HostContainer, ResizeSignal, SurfaceLayer, Viewport};

/// Pixels scrolled per wheel line
const PIXELS_PER_LINE: f32 = 100.0;

/// GPU surface shared by the viewer's renderer and the window host
struct SharedSurface {
    gpu: GpuSceneRenderer,
    frame_requested: bool,
}

fn lock(surface: &Mutex<SharedSurface>) -> MutexGuard<'_, SharedSurface> {
    surface.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scene renderer handed to the viewer.
///
/// A render only requests a frame; the host draws it after the egui layer for
/// the same tick is laid out, so labels never trail the scene.
struct WindowRenderer {
    surface: Arc<Mutex<SharedSurface>>,
}

impl SceneRenderer for WindowRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        lock(&self.surface).gpu.resize(viewport.width, viewport.height);
    }

    fn size(&self) -> Viewport {
        let (width, height) = lock(&self.surface).gpu.size();
        Viewport::new(width, height)
    }

    fn render(&mut self, _scene: &Scene, _camera: &Camera) -> Result<()> {
        let mut shared = lock(&self.surface);
        if shared.gpu.is_disposed() {
            return Err(Error::Disposed);
        }
        shared.frame_requested = true;
        Ok(())
    }

    fn dispose(&mut self) {
        lock(&self.surface).gpu.dispose();
    }
}

fn view_params(camera: &Camera) -> ViewParams {
    ViewParams {
        view_proj: camera.view_projection(),
        eye: camera.position,
    }
}

/// egui input and paint state for the window
struct EguiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    jobs: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
}

impl EguiLayer {
    fn new(window: &Window, gpu: &GpuSceneRenderer) -> Result<Self> {
        let format = gpu.surface_format().ok_or(Error::Disposed)?;
        let pixels_per_point = window.scale_factor() as f32;
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(pixels_per_point),
            None,
        );
        let renderer = egui_wgpu::Renderer::new(&gpu.context().device, format, None, 1);
        Ok(Self {
            ctx,
            state,
            renderer,
            jobs: Vec::new(),
            textures: egui::TexturesDelta::default(),
            pixels_per_point,
        })
    }

    /// Lay out one UI frame. Returns true when egui asks to be repainted
    /// right away.
    fn run(&mut self, window: &Window, ui: &mut ViewerUi, viewer: &mut Viewer) -> bool {
        let input = self.state.take_egui_input(window);
        let output = self.ctx.run(input, |ctx| {
            ui.show(ctx, viewer);
        });
        self.state.handle_platform_output(window, output.platform_output);
        self.textures.append(output.textures_delta);
        self.pixels_per_point = output.pixels_per_point;
        self.jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .is_some_and(|viewport| viewport.repaint_delay.is_zero())
    }
}

impl FrameOverlay for EguiLayer {
    fn paint(
        &mut self,
        context: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: (u32, u32),
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, delta) in &self.textures.set {
            self.renderer
                .update_texture(&context.device, &context.queue, *id, delta);
        }
        self.textures.set.clear();

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.0, size.1],
            pixels_per_point: self.pixels_per_point,
        };
        let buffers = self.renderer.update_buffers(
            &context.device,
            &context.queue,
            encoder,
            &self.jobs,
            &screen,
        );
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer.render(&mut pass, &self.jobs, &screen);
        }

        for id in self.textures.free.drain(..) {
            self.renderer.free_texture(&id);
        }
        buffers
    }
}

/// A window acting as the viewer's host container
#[derive(Debug)]
pub struct WindowContainer {
    window: Arc<Window>,
    layers: Vec<SurfaceLayer>,
}

impl WindowContainer {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            layers: Vec::new(),
        }
    }
}

impl HostContainer for WindowContainer {
    fn viewport(&self) -> Viewport {
        window_viewport(&self.window)
    }

    fn append_layer(&mut self, layer: SurfaceLayer) {
        self.layers.push(layer);
    }

    fn remove_layer(&mut self, layer: SurfaceLayer) {
        self.layers.retain(|attached| *attached != layer);
    }

    fn has_layer(&self, layer: SurfaceLayer) -> bool {
        self.layers.contains(&layer)
    }
}

fn window_viewport(window: &Window) -> Viewport {
    let size = window.inner_size();
    Viewport::new(size.width, size.height).with_pixel_ratio(window.scale_factor() as f32)
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Left),
        MouseButton::Middle => Some(PointerButton::Middle),
        MouseButton::Right => Some(PointerButton::Right),
        _ => None,
    }
}

/// Window settings for [`WindowHost`]
#[derive(Debug, Clone)]
pub struct WindowHost {
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub render: GpuRenderConfig,
    /// Show the clickable object hierarchy beside the scene
    pub hierarchy_panel: bool,
}

impl Default for WindowHost {
    fn default() -> Self {
        Self {
            title: "sceneview".to_string(),
            width: 1200.0,
            height: 800.0,
            render: GpuRenderConfig::default(),
            hierarchy_panel: true,
        }
    }
}

impl WindowHost {
    pub fn new(title: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_hierarchy_panel(mut self, show: bool) -> Self {
        self.hierarchy_panel = show;
        self
    }

    /// Open the window, build the viewer from `builder` and run until the
    /// window is closed. `on_tick` runs after every frame.
    pub fn run<F>(self, builder: ViewerBuilder, runtime: Handle, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&Viewer) + 'static,
    {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(self.title.as_str())
                .with_inner_size(LogicalSize::new(self.width, self.height))
                .build(&event_loop)
                .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
        );

        let gpu = pollster::block_on(GpuSceneRenderer::new(window.clone(), self.render))?;
        let mut egui_layer = EguiLayer::new(&window, &gpu)?;
        let surface = Arc::new(Mutex::new(SharedSurface {
            gpu,
            frame_requested: false,
        }));
        let resize = ResizeSignal::new(window_viewport(&window));
        let mut viewer = builder
            .renderer(Box::new(WindowRenderer {
                surface: surface.clone(),
            }))
            .resize_signal(&resize)
            .runtime(runtime)
            .build(Box::new(WindowContainer::new(window.clone())))?;
        let mut ui = ViewerUi::new(&viewer).with_hierarchy(self.hierarchy_panel);

        let mut cursor = (0.0f32, 0.0f32);
        // egui wants a frame even when the scene is unchanged
        let mut ui_dirty = true;
        let mut shown_status: Option<ViewerStatus> = None;
        info!(viewer = %viewer.id(), "window open");
        window.request_redraw();

        event_loop
            .run(move |event, elwt| {
                elwt.set_control_flow(ControlFlow::Wait);
                let Event::WindowEvent { event, .. } = event else {
                    return;
                };
                let response = egui_layer.state.on_window_event(&window, &event);
                if response.repaint {
                    ui_dirty = true;
                    window.request_redraw();
                }
                match event {
                    WindowEvent::CloseRequested => {
                        viewer.dispose();
                        elwt.exit();
                    }
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        resize.notify(window_viewport(&window));
                        window.request_redraw();
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if response.consumed {
                            return;
                        }
                        let Some(button) = pointer_button(button) else {
                            return;
                        };
                        let input = match state {
                            ElementState::Pressed => ControlInput::PointerDown {
                                button,
                                x: cursor.0,
                                y: cursor.1,
                            },
                            ElementState::Released => ControlInput::PointerUp { button },
                        };
                        viewer.handle_input(input);
                        window.request_redraw();
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = (position.x as f32, position.y as f32);
                        if response.consumed {
                            return;
                        }
                        if viewer.handle_input(ControlInput::PointerMove {
                            x: cursor.0,
                            y: cursor.1,
                        }) {
                            window.request_redraw();
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        if response.consumed {
                            return;
                        }
                        let delta = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -y,
                            MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32) / PIXELS_PER_LINE,
                        };
                        viewer.handle_input(ControlInput::Wheel {
                            delta,
                            x: cursor.0,
                            y: cursor.1,
                        });
                        window.request_redraw();
                    }
                    WindowEvent::RedrawRequested => {
                        if !viewer.tick() {
                            return;
                        }
                        on_tick(&viewer);

                        let status = viewer.status();
                        let ui_repaint = egui_layer.run(&window, &mut ui, &mut viewer);
                        let mut shared = lock(&surface);
                        let draw = std::mem::take(&mut shared.frame_requested)
                            || ui_dirty
                            || shown_status != Some(status);
                        ui_dirty = ui_repaint;
                        shown_status = Some(status);
                        if draw {
                            let view = view_params(viewer.camera());
                            let overlay: &mut dyn FrameOverlay = &mut egui_layer;
                            if let Err(e) = shared.gpu.render_with_overlay(viewer.scene(), &view, Some(overlay)) {
                                warn!(viewer = %viewer.id(), error = %e, "frame failed");
                            }
                        }
                        drop(shared);
                        window.request_redraw();
                    }
                    _ => {}
                }
            })
            .map_err(|e| {
                warn!(error = %e, "event loop ended with an error");
                Error::Visualization(format!("Event loop error: {}", e))
            })
    }
}
