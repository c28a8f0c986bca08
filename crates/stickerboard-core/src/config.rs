//! Scene configuration.

use crate::asset::AssetType;
use crate::error::SceneResult;
use crate::validity::DEFAULT_MAX_INSTANCES;
use crate::viewport::DEFAULT_CANVAS_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for a scene. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Maximum number of assets sharing a source reference.
    pub max_instances: usize,
    /// Smallest on-screen dimension an item may be scaled down to.
    pub item_min_dim: f64,
    /// Smallest on-screen dimension a message may be scaled down to.
    pub message_min_dim: f64,
    /// Largest on-screen dimension any asset may start at.
    pub max_dim: f64,
    /// Snap dragged assets back to where the drag started on release.
    pub return_to_start: bool,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            item_min_dim: 40.0,
            message_min_dim: 40.0,
            max_dim: 400.0,
            return_to_start: false,
            canvas_width: DEFAULT_CANVAS_SIZE.width,
            canvas_height: DEFAULT_CANVAS_SIZE.height,
        }
    }
}

impl SceneConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SceneResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Minimum on-screen dimension for the given asset type.
    pub fn min_dim(&self, asset_type: AssetType) -> f64 {
        match asset_type {
            AssetType::Message => self.message_min_dim,
            AssetType::Item | AssetType::Background => self.item_min_dim,
        }
    }
}
