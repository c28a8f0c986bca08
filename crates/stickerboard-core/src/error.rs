//! Errors at the engine's fallible boundaries.
//!
//! Placement problems are never errors: they show up as invalid or rejected
//! assets. Only parsing and media resolution can fail.

use thiserror::Error;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Media not available: {0}")]
    MediaUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
