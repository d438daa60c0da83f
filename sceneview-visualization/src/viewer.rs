//! The viewer runtime
//!
//! A [`Viewer`] owns one scene, camera, scene renderer, camera controller and
//! label renderer, and drives them from [`Viewer::tick`]. Construction kicks off
//! a single model load on a tokio runtime; its outcome is picked up by a later
//! tick (or by [`Viewer::finish_loading`]), so the scene is only ever touched
//! from the thread that owns the viewer.
//!
//! Lifecycle: running from construction until [`Viewer::dispose`], which is
//! idempotent and also runs on drop.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sceneview_core::{
    Bounded, Error, IdCyclePolicy, NodeId, NodeIdAllocator, ProgressPolicy, Result, Scene,
    SceneNode,
};
use sceneview_io::SceneReaderRegistry;

use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::controls::{CameraController, ControlInput, OrbitControls};
use crate::labels::{assign_progress, LabelRenderer, OverlayLabelRenderer, ProjectedLabel};
use crate::loader::{HttpModelSource, LoadError, LoadFailure, ModelLoader, ModelSource};
use crate::renderer::{HeadlessRenderer, SceneRenderer};
use crate::status::{StatusPublisher, StatusSubscription, ViewerStatus};
use crate::viewport::{HostContainer, ResizeSignal, SurfaceLayer, Viewport};

type LoadOutcome = std::result::Result<SceneNode, LoadError>;

/// Counters of the work done by [`Viewer::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub ticks: u64,
    pub scene_renders: u64,
    pub label_renders: u64,
}

/// Seconds elapsed between consecutive ticks
#[derive(Debug, Default)]
struct FrameClock {
    last: Option<instant::Instant>,
}

impl FrameClock {
    fn delta(&mut self) -> f32 {
        let now = instant::Instant::now();
        let delta = self
            .last
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    Disposed,
}

/// Assembles a [`Viewer`]. Every collaborator has a default.
pub struct ViewerBuilder {
    config: ViewerConfig,
    source: Option<Arc<dyn ModelSource>>,
    registry: Option<Arc<SceneReaderRegistry>>,
    policy: Arc<dyn ProgressPolicy>,
    renderer: Option<Box<dyn SceneRenderer>>,
    label_renderer: Option<Box<dyn LabelRenderer>>,
    controls: Option<Box<dyn CameraController>>,
    resize_signal: Option<ResizeSignal>,
    ids: NodeIdAllocator,
    runtime: Option<Handle>,
}

impl ViewerBuilder {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            source: None,
            registry: None,
            policy: Arc::new(IdCyclePolicy),
            renderer: None,
            label_renderer: None,
            controls: None,
            resize_signal: None,
            ids: NodeIdAllocator::new(),
            runtime: None,
        }
    }

    /// Load from `source` instead of fetching the configured URL
    pub fn source(mut self, source: Arc<dyn ModelSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn registry(mut self, registry: Arc<SceneReaderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn progress_policy(mut self, policy: Arc<dyn ProgressPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn renderer(mut self, renderer: Box<dyn SceneRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn label_renderer(mut self, renderer: Box<dyn LabelRenderer>) -> Self {
        self.label_renderer = Some(renderer);
        self
    }

    pub fn controls(mut self, controls: Box<dyn CameraController>) -> Self {
        self.controls = Some(controls);
        self
    }

    /// Follow size changes announced on `signal`
    pub fn resize_signal(mut self, signal: &ResizeSignal) -> Self {
        self.resize_signal = Some(signal.clone());
        self
    }

    /// Allocator for node ids; share one to keep ids unique across viewers
    pub fn node_ids(mut self, ids: NodeIdAllocator) -> Self {
        self.ids = ids;
        self
    }

    /// Runtime the model load runs on; defaults to the ambient tokio runtime
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the viewer inside `container` and start loading
    pub fn build(self, mut container: Box<dyn HostContainer>) -> Result<Viewer> {
        if container.has_layer(SurfaceLayer::Scene) {
            return Err(Error::Visualization(
                "container already hosts a viewer".to_string(),
            ));
        }
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()
                .map_err(|e| Error::Visualization(format!("no tokio runtime for loading: {e}")))?,
        };
        let source: Arc<dyn ModelSource> = match self.source {
            Some(source) => source,
            None => Arc::new(
                HttpModelSource::new(self.config.model_url.clone())
                    .map_err(|e| Error::Visualization(e.to_string()))?,
            ),
        };
        let registry = self.registry.unwrap_or_default();

        let id = Uuid::new_v4();
        let viewport = container.viewport();

        let camera = Camera::from_config(&self.config.camera, viewport.aspect());
        let mut renderer = self
            .renderer
            .unwrap_or_else(|| Box::new(HeadlessRenderer::new(viewport)));
        renderer.set_size(viewport);
        container.append_layer(SurfaceLayer::Scene);

        let controls = self.controls.unwrap_or_else(|| {
            Box::new(OrbitControls::new(&camera, self.config.controls.clone()))
        });

        let mut scene = Scene::new(self.config.background);
        for light in self.config.lights() {
            scene.add_light(light);
        }

        let mut labels = self.label_renderer.unwrap_or_else(|| {
            Box::new(OverlayLabelRenderer::new(
                viewport,
                self.config.label_layer.clone(),
            ))
        });
        labels.set_size(viewport);
        container.append_layer(SurfaceLayer::Labels);

        let resize = self.resize_signal.as_ref().map(ResizeSignal::subscribe);

        let status = StatusPublisher::new(ViewerStatus::Idle);
        status.publish(ViewerStatus::Loading)?;

        let loader = ModelLoader::new(source, registry, self.ids);
        let (tx, rx) = oneshot::channel();
        runtime.spawn(async move {
            let outcome = loader.load().await;
            if tx.send(outcome).is_err() {
                debug!(viewer = %id, "viewer gone before load finished, dropping result");
            }
        });

        info!(
            viewer = %id,
            width = viewport.width,
            height = viewport.height,
            "viewer created"
        );

        Ok(Viewer {
            id,
            config: self.config,
            scene,
            camera,
            renderer,
            controls,
            labels,
            container,
            clock: FrameClock::default(),
            dirty: true,
            status,
            model: None,
            pending: Some(rx),
            resize,
            policy: self.policy,
            stats: FrameStats::default(),
            last_failure: None,
            lifecycle: Lifecycle::Running,
        })
    }
}

impl Default for ViewerBuilder {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

/// Interactive 3D model viewer
pub struct Viewer {
    id: Uuid,
    config: ViewerConfig,
    scene: Scene,
    camera: Camera,
    renderer: Box<dyn SceneRenderer>,
    controls: Box<dyn CameraController>,
    labels: Box<dyn LabelRenderer>,
    container: Box<dyn HostContainer>,
    clock: FrameClock,
    dirty: bool,
    status: StatusPublisher,
    model: Option<NodeId>,
    pending: Option<oneshot::Receiver<LoadOutcome>>,
    resize: Option<watch::Receiver<Viewport>>,
    policy: Arc<dyn ProgressPolicy>,
    stats: FrameStats,
    last_failure: Option<LoadFailure>,
    lifecycle: Lifecycle,
}

impl Viewer {
    /// Shorthand for a builder with `config`
    pub fn builder(config: ViewerConfig) -> ViewerBuilder {
        ViewerBuilder::new(config)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Run one frame using the wall-clock time since the previous tick.
    ///
    /// Returns false once the viewer is disposed and no further ticks should
    /// be scheduled.
    pub fn tick(&mut self) -> bool {
        let dt = self.clock.delta();
        self.advance(dt)
    }

    /// Run one frame as if `dt` seconds had passed
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.stats.ticks += 1;
        self.poll_resize();
        self.poll_load();

        let moved = self.controls.update(&mut self.camera, dt);
        if moved || self.dirty {
            self.stats.scene_renders += 1;
            if let Err(e) = self.renderer.render(&self.scene, &self.camera) {
                warn!(viewer = %self.id, error = %e, "scene render failed");
            }
            self.dirty = false;
        }

        // Label positions depend on the camera, so they are reprojected every
        // frame even when the scene itself was not redrawn.
        self.labels.render(&self.scene, &self.camera);
        self.stats.label_renders += 1;
        true
    }

    /// Request a full redraw on the next tick
    pub fn update_viewer(&mut self) {
        self.dirty = true;
    }

    /// Emphasize `node` in the next frames
    pub fn highlight_object(&mut self, node: NodeId) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        self.scene.set_highlight(Some(node))?;
        self.dirty = true;
        info!(viewer = %self.id, node = %node, "highlighted");
        Ok(())
    }

    pub fn clear_highlight(&mut self) {
        if self.scene.highlighted().is_some() {
            // Clearing never fails.
            let _ = self.scene.set_highlight(None);
            self.dirty = true;
        }
    }

    /// Forward pointer or wheel input to the camera controller
    pub fn handle_input(&mut self, input: ControlInput) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.controls
            .handle_input(&self.camera, self.renderer.size(), input)
    }

    /// Adopt a new viewport size
    pub fn resize(&mut self, viewport: Viewport) {
        if self.is_disposed() {
            return;
        }
        self.camera.set_aspect(viewport.aspect());
        self.renderer.set_size(viewport);
        self.labels.set_size(viewport);
        self.dirty = true;
        debug!(viewer = %self.id, width = viewport.width, height = viewport.height, "resized");
    }

    /// Wait for the model load to finish and apply its outcome.
    ///
    /// Returns immediately when the outcome was already applied.
    pub async fn finish_loading(&mut self) -> ViewerStatus {
        if let Some(rx) = self.pending.take() {
            let outcome = rx.await.unwrap_or(Err(LoadError::Interrupted));
            self.apply_load(outcome);
        }
        self.status()
    }

    /// Whether the model load is still in flight
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Tear down every owned resource. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.lifecycle = Lifecycle::Disposed;

        self.resize = None;
        // Dropping the receiver turns a late load result into a no-op.
        self.pending = None;
        self.renderer.dispose();
        self.controls.dispose();
        self.scene.clear();
        self.model = None;
        self.labels.dispose();
        self.container.remove_layer(SurfaceLayer::Labels);
        self.container.remove_layer(SurfaceLayer::Scene);
        info!(viewer = %self.id, "viewer disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    pub fn status(&self) -> ViewerStatus {
        self.status.current()
    }

    /// Subscribe to status changes, starting from the current status
    pub fn subscribe_status(&self) -> StatusSubscription {
        self.status.subscribe()
    }

    /// Root of the loaded model, once loading succeeded
    pub fn model(&self) -> Option<&SceneNode> {
        self.model.and_then(|id| self.scene.find(id))
    }

    pub fn model_id(&self) -> Option<NodeId> {
        self.model
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Labels as placed by the last tick
    pub fn labels(&self) -> &[ProjectedLabel] {
        self.labels.labels()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    pub fn renderer_size(&self) -> Viewport {
        self.renderer.size()
    }

    pub fn label_renderer_size(&self) -> Viewport {
        self.labels.size()
    }

    /// Reason the load failed, if it did
    pub fn last_failure(&self) -> Option<&LoadFailure> {
        self.last_failure.as_ref()
    }

    fn poll_resize(&mut self) {
        let Some(rx) = self.resize.as_mut() else {
            return;
        };
        if rx.has_changed().unwrap_or(false) {
            let viewport = *rx.borrow_and_update();
            self.resize(viewport);
        }
    }

    fn poll_load(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => Err(LoadError::Interrupted),
        };
        self.pending = None;
        self.apply_load(outcome);
    }

    fn apply_load(&mut self, outcome: LoadOutcome) {
        if self.is_disposed() {
            return;
        }
        match outcome {
            Ok(mut root) => {
                root.rotate_x(self.config.model_rotation_x);
                let id = self.scene.add(root);
                let bounds = self
                    .scene
                    .find(id)
                    .map(Bounded::bounding_box)
                    .unwrap_or_default();
                self.controls
                    .fit_to_box(&self.camera, &bounds, self.config.animate_fit);
                self.model = Some(id);

                let labelled = match self.scene.find_mut(id) {
                    Some(root) => assign_progress(root, self.policy.as_ref()),
                    None => 0,
                };
                self.scene.mark_changed();
                info!(viewer = %self.id, model = %id, labels = labelled, "model ready");
                self.set_status(ViewerStatus::Idle);
            }
            Err(e) => {
                warn!(viewer = %self.id, reason = %e.kind(), error = %e, "model load failed");
                self.last_failure = Some(LoadFailure::from(&e));
                self.set_status(ViewerStatus::Error);
            }
        }
        self.dirty = true;
    }

    fn set_status(&self, status: ViewerStatus) {
        if let Err(e) = self.status.publish(status) {
            warn!(viewer = %self.id, error = %e, "status not published");
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.dispose();
    }
}
