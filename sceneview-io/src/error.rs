//! Error types for scene I/O

use thiserror::Error;

/// Errors raised while locating or converting a scene description
#[derive(Error, Debug)]
pub enum SceneIoError {
    #[error("payload does not contain a recognizable scene description")]
    MissingSceneDescription,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("object {object} references unknown geometry {uuid}")]
    MissingGeometry { object: String, uuid: String },

    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] sceneview_core::Error),
}

/// Result type alias for scene I/O
pub type Result<T> = std::result::Result<T, SceneIoError>;
