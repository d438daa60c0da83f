//! Error types for sceneview

use thiserror::Error;

use crate::id::NodeId;

/// Main error type for scene and viewer operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unknown scene node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Visualization error: {0}")]
    Visualization(String),

    #[error("Viewer has been disposed")]
    Disposed,
}

/// Result type alias for sceneview operations
pub type Result<T> = std::result::Result<T, Error>;
