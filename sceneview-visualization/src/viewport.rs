//! Host containers, viewport sizes and the resize signal

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Drawable area in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Width over height; a zero-height viewport reports 1.0
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

/// Output surfaces a viewer attaches to its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceLayer {
    /// The 3D scene
    Scene,
    /// Screen-space status labels, stacked on top of the scene
    Labels,
}

/// Element that hosts a viewer's output surfaces.
///
/// A container hosts at most one viewer at a time.
pub trait HostContainer {
    /// Current size of the drawable area
    fn viewport(&self) -> Viewport;

    fn append_layer(&mut self, layer: SurfaceLayer);

    fn remove_layer(&mut self, layer: SurfaceLayer);

    fn has_layer(&self, layer: SurfaceLayer) -> bool;
}

/// In-memory container used for offscreen viewers and tests.
///
/// Clones share the same layer list, so a caller can keep a handle to inspect
/// what a viewer attached after handing the container over.
#[derive(Debug, Clone, Default)]
pub struct HeadlessContainer {
    viewport: Viewport,
    layers: Arc<Mutex<Vec<SurfaceLayer>>>,
}

impl HeadlessContainer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            layers: Arc::default(),
        }
    }

    /// Layers currently attached, in append order
    pub fn layers(&self) -> Vec<SurfaceLayer> {
        self.layers
            .lock()
            .map(|layers| layers.clone())
            .unwrap_or_default()
    }
}

impl HostContainer for HeadlessContainer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn append_layer(&mut self, layer: SurfaceLayer) {
        if let Ok(mut layers) = self.layers.lock() {
            layers.push(layer);
        }
    }

    fn remove_layer(&mut self, layer: SurfaceLayer) {
        if let Ok(mut layers) = self.layers.lock() {
            layers.retain(|attached| *attached != layer);
        }
    }

    fn has_layer(&self, layer: SurfaceLayer) -> bool {
        self.layers
            .lock()
            .map(|layers| layers.contains(&layer))
            .unwrap_or(false)
    }
}

/// Process-wide notification of viewport size changes.
///
/// Viewers subscribe on construction and drop their subscription on disposal.
/// Only the latest size is kept; a viewer that misses several notifications
/// between ticks sees the last one.
#[derive(Debug, Clone)]
pub struct ResizeSignal {
    tx: Arc<watch::Sender<Viewport>>,
}

impl ResizeSignal {
    pub fn new(initial: Viewport) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Announce a new viewport size to every subscriber
    pub fn notify(&self, viewport: Viewport) {
        self.tx.send_replace(viewport);
    }

    /// Subscribe to future size changes; the current size counts as seen
    pub fn subscribe(&self) -> watch::Receiver<Viewport> {
        self.tx.subscribe()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Most recently announced size
    pub fn current(&self) -> Viewport {
        *self.tx.borrow()
    }
}

impl Default for ResizeSignal {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}
