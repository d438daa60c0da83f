//! Viewer runtime for sceneview
//!
//! This crate provides the interactive model viewer:
//! - The [`Viewer`] render loop, load pipeline and status channel
//! - Camera and orbit controls
//! - Scene renderers (headless, and wgpu through [`window`])
//! - The status-label overlay
//! - A hierarchy inspector model for surrounding UI
//! - An egui layer drawing the labels and a clickable hierarchy panel

pub mod camera;
pub mod config;
pub mod controls;
pub mod labels;
pub mod loader;
pub mod renderer;
pub mod status;
pub mod ui;
pub mod viewer;
pub mod viewport;
pub mod widget;
pub mod window;

pub use camera::*;
pub use config::*;
pub use controls::*;
pub use labels::*;
pub use loader::*;
pub use renderer::*;
pub use status::*;
pub use ui::*;
pub use viewer::*;
pub use viewport::*;
pub use widget::*;
pub use window::{WindowContainer, WindowHost};
