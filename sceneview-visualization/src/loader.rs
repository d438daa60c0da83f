//! Model loading: fetch a remote document and turn it into a scene subtree

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use sceneview_core::{NodeIdAllocator, SceneNode};
use sceneview_io::{SceneIoError, SceneReaderRegistry};

/// Why a load failed, as reported next to the `error` status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureKind {
    /// The document could not be fetched
    NetworkFailure,
    /// The document held no usable scene description
    ExtractionFailure,
}

impl fmt::Display for LoadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailureKind::NetworkFailure => f.write_str("network failure"),
            LoadFailureKind::ExtractionFailure => f.write_str("extraction failure"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server answered with HTTP {0}")]
    HttpStatus(u16),

    #[error("model source unavailable: {0}")]
    Unavailable(String),

    #[error("payload holds no usable scene: {0}")]
    Extraction(#[from] SceneIoError),

    #[error("load ended before delivering a result")]
    Interrupted,
}

impl LoadError {
    pub fn kind(&self) -> LoadFailureKind {
        match self {
            LoadError::Extraction(_) => LoadFailureKind::ExtractionFailure,
            LoadError::Network(_)
            | LoadError::HttpStatus(_)
            | LoadError::Unavailable(_)
            | LoadError::Interrupted => LoadFailureKind::NetworkFailure,
        }
    }
}

/// A failed load, kept by the viewer for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub kind: LoadFailureKind,
    pub message: String,
}

impl From<&LoadError> for LoadFailure {
    fn from(error: &LoadError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Where model documents come from
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Human-readable origin, for logs
    fn describe(&self) -> String;

    /// Fetch the raw JSON payload
    async fn fetch(&self) -> Result<Value, LoadError>;
}

/// Fetches a document over HTTP, bypassing every cache on the way
#[derive(Debug, Clone)]
pub struct HttpModelSource {
    client: reqwest::Client,
    url: String,
}

impl HttpModelSource {
    pub fn new(url: impl Into<String>) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ModelSource for HttpModelSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Value, LoadError> {
        debug!(url = %self.url, "fetching model");
        let response = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(EXPIRES, "0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Serves a payload already in memory
#[derive(Debug, Clone)]
pub struct StaticModelSource {
    name: String,
    payload: Value,
}

impl StaticModelSource {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

#[async_trait]
impl ModelSource for StaticModelSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn fetch(&self) -> Result<Value, LoadError> {
        Ok(self.payload.clone())
    }
}

/// Fetch, locate and convert in one pass
#[derive(Clone)]
pub struct ModelLoader {
    source: Arc<dyn ModelSource>,
    registry: Arc<SceneReaderRegistry>,
    ids: NodeIdAllocator,
}

impl ModelLoader {
    /// Nodes created by the loader draw their ids from `ids`
    pub fn new(
        source: Arc<dyn ModelSource>,
        registry: Arc<SceneReaderRegistry>,
        ids: NodeIdAllocator,
    ) -> Self {
        Self {
            source,
            registry,
            ids,
        }
    }

    pub async fn load(&self) -> Result<SceneNode, LoadError> {
        let origin = self.source.describe();
        let payload = self.source.fetch().await?;
        let root = self.registry.extract(&payload, &self.ids)?;
        info!(
            source = %origin,
            nodes = root.node_count(),
            meshes = root.mesh_count(),
            "model loaded"
        );
        Ok(root)
    }
}

impl fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLoader")
            .field("source", &self.source.describe())
            .field("formats", &self.registry.formats())
            .finish()
    }
}
