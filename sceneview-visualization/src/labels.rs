//! Status labels and the overlay that projects them onto the viewport

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use sceneview_core::{NodeId, ProgressPolicy, Scene, SceneNode, StatusLabel};

use crate::camera::Camera;
use crate::viewport::Viewport;

/// Give every mesh node in `root` a progress status and a label showing it.
///
/// Returns the number of labelled nodes. Labels are snapshots: changing a
/// node's metadata afterwards does not update them.
pub fn assign_progress(root: &mut SceneNode, policy: &dyn ProgressPolicy) -> usize {
    let mut labelled = 0;
    root.traverse_mut(|node| {
        if !node.is_mesh() {
            return;
        }
        let status = policy.status_for(node);
        node.set_progress(&status);
        node.label = Some(StatusLabel::for_status(&status));
        labelled += 1;
    });
    labelled
}

/// Placement of the label layer over the scene surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelLayerStyle {
    /// Offset of the layer from the top of the container, in pixels
    pub top: f32,
    /// Whether the layer intercepts pointer input meant for the scene
    pub pointer_events: bool,
}

impl Default for LabelLayerStyle {
    fn default() -> Self {
        Self {
            top: 0.0,
            pointer_events: false,
        }
    }
}

/// A label placed on screen for the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedLabel {
    pub node: NodeId,
    pub text: String,
    pub code: u8,
    pub class_name: String,
    /// Pixel position, origin at the top left of the viewport
    pub x: f32,
    pub y: f32,
    /// Normalized depth, -1 at the near plane and 1 at the far plane
    pub depth: f32,
    /// False when the anchor is outside the view volume
    pub visible: bool,
}

/// Renders screen-space annotations for labelled nodes
pub trait LabelRenderer {
    fn set_size(&mut self, viewport: Viewport);

    fn size(&self) -> Viewport;

    /// Reproject every label for the current camera; returns how many are visible
    fn render(&mut self, scene: &Scene, camera: &Camera) -> usize;

    /// Labels as placed by the last render, back to front
    fn labels(&self) -> &[ProjectedLabel];

    fn dispose(&mut self);
}

/// Label renderer that projects label anchors into viewport pixels
#[derive(Debug, Default)]
pub struct OverlayLabelRenderer {
    viewport: Viewport,
    style: LabelLayerStyle,
    labels: Vec<ProjectedLabel>,
}

impl OverlayLabelRenderer {
    pub fn new(viewport: Viewport, style: LabelLayerStyle) -> Self {
        Self {
            viewport,
            style,
            labels: Vec::new(),
        }
    }

    pub fn style(&self) -> &LabelLayerStyle {
        &self.style
    }

    fn project(&self, camera: &Camera, anchor: &sceneview_core::LabelAnchor<'_>) -> ProjectedLabel {
        let world = anchor.world.transform_point(&anchor.label.offset);
        let ndc = camera.project(&world);
        let (x, y, depth, visible) = match ndc {
            Some(ndc) => {
                let visible = ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && ndc.z.abs() <= 1.0;
                let x = (ndc.x + 1.0) / 2.0 * self.viewport.width as f32;
                let y = (1.0 - ndc.y) / 2.0 * self.viewport.height as f32 + self.style.top;
                (x, y, ndc.z, visible)
            }
            None => (0.0, 0.0, 1.0, false),
        };
        ProjectedLabel {
            node: anchor.node,
            text: anchor.label.text.clone(),
            code: anchor.label.code,
            class_name: anchor.label.class_name.clone(),
            x,
            y,
            depth,
            visible,
        }
    }
}

impl LabelRenderer for OverlayLabelRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn size(&self) -> Viewport {
        self.viewport
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> usize {
        let mut labels: Vec<ProjectedLabel> = scene
            .label_anchors()
            .iter()
            .map(|anchor| self.project(camera, anchor))
            .collect();
        // Far labels first so nearer ones stack on top.
        labels.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));
        self.labels = labels;
        self.labels.iter().filter(|label| label.visible).count()
    }

    fn labels(&self) -> &[ProjectedLabel] {
        &self.labels
    }

    fn dispose(&mut self) {
        self.labels.clear();
    }
}
