//! Core data structures for sceneview
//!
//! This crate provides the scene-graph model the viewer populates once per load:
//! node identities, scene nodes and their metadata, geometry, transforms,
//! bounding volumes, lights and the per-mesh progress status.

pub mod bounds;
pub mod error;
pub mod geometry;
pub mod id;
pub mod light;
pub mod node;
pub mod progress;
pub mod scene;
pub mod traits;
pub mod transform;

pub use bounds::*;
pub use error::*;
pub use geometry::*;
pub use id::*;
pub use light::*;
pub use node::*;
pub use progress::*;
pub use scene::*;
pub use traits::*;
pub use transform::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;
