//! Core traits for sceneview

use nalgebra::Matrix4;

use crate::bounds::Aabb;
use crate::geometry::Geometry;
use crate::node::SceneNode;
use crate::scene::Scene;
use crate::Point3f;

/// Anything with a bounding volume
pub trait Bounded {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> Aabb;

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        self.bounding_box().center()
    }
}

impl Bounded for Geometry {
    fn bounding_box(&self) -> Aabb {
        Geometry::bounding_box(self)
    }
}

/// Bounds of a node are expressed in its parent's space, which for a
/// top-level node is world space.
impl Bounded for SceneNode {
    fn bounding_box(&self) -> Aabb {
        self.world_bounds(Matrix4::identity())
    }
}

impl Bounded for Scene {
    fn bounding_box(&self) -> Aabb {
        self.bounds()
    }
}
