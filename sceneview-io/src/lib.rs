//! Scene I/O for sceneview
//!
//! Turns a fetched JSON payload into a scene-node subtree in two steps:
//! - locate the embedded scene description (`extract`)
//! - convert it into nodes (`object_format`, dispatched through `registry`)

pub mod error;
pub mod extract;
pub mod object_format;
pub mod registry;

pub use error::*;
pub use extract::{find_scene_json, is_scene_description};
pub use object_format::parse_scene;
pub use registry::{ObjectFormatReader, SceneReader, SceneReaderRegistry};

use sceneview_core::{NodeIdAllocator, SceneNode};
use serde_json::Value;

/// Locate and convert the scene description in `payload` with the built-in readers
pub fn extract_scene(payload: &Value, ids: &NodeIdAllocator) -> Result<SceneNode> {
    SceneReaderRegistry::default().extract(payload, ids)
}
