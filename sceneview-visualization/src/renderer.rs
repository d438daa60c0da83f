//! Scene renderers

use tracing::debug;

use sceneview_core::{Error, Result, Scene};

use crate::camera::Camera;
use crate::viewport::Viewport;

/// Draws a scene from a camera onto an output surface
pub trait SceneRenderer {
    /// Resize the output surface
    fn set_size(&mut self, viewport: Viewport);

    /// Current output size
    fn size(&self) -> Viewport;

    /// Draw one full frame
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()>;

    /// Release the output surface and every resource behind it
    fn dispose(&mut self);
}

/// Summary of the last frame a [`HeadlessRenderer`] drew
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub meshes: usize,
    pub triangles: usize,
    pub highlighted: usize,
    pub scene_revision: u64,
}

/// Renderer without an output surface.
///
/// Walks the scene exactly like a GPU renderer would and records what it would
/// have drawn. Used for offscreen viewers and tests.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    viewport: Viewport,
    frames: u64,
    last_frame: Option<FrameSummary>,
    disposed: bool,
}

impl HeadlessRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Number of frames drawn so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<FrameSummary> {
        self.last_frame
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn size(&self) -> Viewport {
        self.viewport
    }

    fn render(&mut self, scene: &Scene, _camera: &Camera) -> Result<()> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        let draws = scene.mesh_draws();
        let summary = FrameSummary {
            meshes: draws.len(),
            triangles: draws.iter().map(|draw| draw.mesh.geometry.face_count()).sum(),
            highlighted: draws.iter().filter(|draw| draw.highlighted).count(),
            scene_revision: scene.revision(),
        };
        self.frames += 1;
        self.last_frame = Some(summary);
        debug!(meshes = summary.meshes, triangles = summary.triangles, "headless frame");
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sceneview_core::{Geometry, Material, NodeIdAllocator, Point3f, SceneNode};
    use std::sync::Arc;

    #[test]
    fn test_counts_what_it_would_draw() {
        let ids = NodeIdAllocator::new();
        let triangle = Arc::new(Geometry::from_triangle_soup(vec![
            Point3f::origin(),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ]));
        let mut scene = Scene::default();
        let mesh = scene.add(SceneNode::mesh(&ids, triangle, Material::default()));
        scene.set_highlight(Some(mesh)).unwrap();

        let mut renderer = HeadlessRenderer::new(Viewport::new(64, 64));
        renderer.render(&scene, &Camera::default()).unwrap();
        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.meshes, 1);
        assert_eq!(frame.triangles, 1);
        assert_eq!(frame.highlighted, 1);
        assert_eq!(renderer.frames(), 1);
    }

    #[test]
    fn test_render_after_dispose_fails() {
        let mut renderer = HeadlessRenderer::new(Viewport::new(64, 64));
        renderer.dispose();
        let err = renderer.render(&Scene::default(), &Camera::default()).unwrap_err();
        assert!(matches!(err, Error::Disposed));
    }
}
