//! Media metadata resolution.
//!
//! Intrinsic dimensions are not known when an asset is placed; the host looks
//! them up asynchronously and hands the result back to the scene.

use crate::error::{SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// Boxed future for resolver calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Metadata of a media source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Intrinsic width in pixels.
    #[serde(default)]
    pub width: f64,
    /// Intrinsic height in pixels.
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Opaque integrity token.
    #[serde(default)]
    pub check: Option<String>,
}

impl MediaInfo {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

/// Looks up media metadata by media id.
pub trait MediaResolver {
    fn resolve(&self, media_id: &str) -> BoxFuture<'_, SceneResult<MediaInfo>>;
}

/// In-memory resolver backed by a fixed manifest.
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaResolver {
    media: HashMap<String, MediaInfo>,
}

impl MemoryMediaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest mapping media ids to metadata.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let media: HashMap<String, MediaInfo> = serde_json::from_str(json)?;
        Ok(Self { media })
    }

    /// Load a manifest from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SceneResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn insert(&mut self, media_id: impl Into<String>, info: MediaInfo) {
        self.media.insert(media_id.into(), info);
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }
}

impl MediaResolver for MemoryMediaResolver {
    fn resolve(&self, media_id: &str) -> BoxFuture<'_, SceneResult<MediaInfo>> {
        let media_id = media_id.to_string();
        Box::pin(async move {
            self.media
                .get(&media_id)
                .cloned()
                .ok_or(SceneError::MediaUnavailable(media_id))
        })
    }
}
