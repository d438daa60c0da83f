//! GPU rendering for sceneview using wgpu
//!
//! This crate draws a [`sceneview_core::Scene`] into a window surface:
//! - Device and surface setup
//! - World-space baking of every visible mesh into one buffer pair
//! - A flat-lit pipeline with one directional and one ambient light
//! - An overlay hook for drawing host UI over the scene before present

pub mod device;
pub mod mesh;
pub mod renderer;

pub use device::*;
pub use mesh::*;
pub use renderer::*;
