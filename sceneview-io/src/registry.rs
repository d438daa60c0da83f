//! Registry of scene readers
//!
//! The viewer does not know which scene format a payload carries. Readers
//! registered here each try to locate their own format inside the payload;
//! the first one that finds a description converts it.

use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

use sceneview_core::{NodeIdAllocator, SceneNode};

use crate::error::{Result, SceneIoError};
use crate::extract::{find_matching, is_scene_description};
use crate::object_format::parse_scene;

/// A scene format that can be found inside a payload and converted to nodes
pub trait SceneReader: Send + Sync {
    /// Get the format name this reader handles
    fn format_name(&self) -> &'static str;

    /// Find this reader's scene description inside `payload`
    fn locate<'a>(&self, payload: &'a Value) -> Option<Cow<'a, Value>>;

    /// Convert a located description into a node tree
    fn convert(&self, description: &Value, ids: &NodeIdAllocator) -> Result<SceneNode>;
}

/// Reader for object-format scene descriptions
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectFormatReader;

impl SceneReader for ObjectFormatReader {
    fn format_name(&self) -> &'static str {
        "object"
    }

    fn locate<'a>(&self, payload: &'a Value) -> Option<Cow<'a, Value>> {
        find_matching(payload, &is_scene_description, 0)
    }

    fn convert(&self, description: &Value, ids: &NodeIdAllocator) -> Result<SceneNode> {
        parse_scene(description, ids)
    }
}

/// Ordered set of scene readers
pub struct SceneReaderRegistry {
    readers: Vec<Box<dyn SceneReader>>,
}

impl SceneReaderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Register a reader; earlier registrations win when several match
    pub fn register(&mut self, reader: Box<dyn SceneReader>) {
        self.readers.push(reader);
    }

    /// Names of the registered formats, in lookup order
    pub fn formats(&self) -> Vec<&'static str> {
        self.readers.iter().map(|reader| reader.format_name()).collect()
    }

    /// Locate a scene description in `payload` and convert it
    pub fn extract(&self, payload: &Value, ids: &NodeIdAllocator) -> Result<SceneNode> {
        for reader in &self.readers {
            if let Some(description) = reader.locate(payload) {
                debug!(format = reader.format_name(), "scene description located");
                return reader.convert(&description, ids);
            }
        }
        Err(SceneIoError::MissingSceneDescription)
    }
}

impl Default for SceneReaderRegistry {
    /// Registry with every built-in reader
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ObjectFormatReader));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_registry_finds_nothing() {
        let registry = SceneReaderRegistry::new();
        let payload = json!({ "metadata": { "type": "Object" }, "object": { "type": "Group" } });
        assert!(matches!(
            registry.extract(&payload, &NodeIdAllocator::new()),
            Err(SceneIoError::MissingSceneDescription)
        ));
    }

    #[test]
    fn test_default_registry() {
        let registry = SceneReaderRegistry::default();
        assert_eq!(registry.formats(), vec!["object"]);
        let payload = json!({ "metadata": { "type": "Object" }, "object": { "type": "Group" } });
        let root = registry.extract(&payload, &NodeIdAllocator::new()).unwrap();
        assert_eq!(root.type_name(), "Group");
    }
}
