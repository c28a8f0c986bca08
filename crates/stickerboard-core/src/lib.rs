//! Stickerboard Core Library
//!
//! Placement and validity engine for sticker-style canvases: assets are
//! dragged, scaled and rotated on a bounded canvas, and every placement is
//! checked against the canvas edges and the asset's same-type siblings.

pub mod asset;
pub mod config;
pub mod error;
pub mod geometry;
pub mod media;
pub mod scene;
pub mod validity;
pub mod viewport;
pub mod widget;

pub use asset::{
    Asset, AssetId, AssetRequest, AssetSnapshot, AssetType, PersistedState, Transform,
    TransformUpdate,
};
pub use config::SceneConfig;
pub use error::{SceneError, SceneResult};
pub use media::{BoxFuture, MediaInfo, MediaResolver, MemoryMediaResolver};
pub use scene::{Scene, SceneEvent, SceneSnapshot};
pub use viewport::Viewport;
pub use widget::{EditableAsset, Handle, HandleKind, Pending, PlacementCheck, WidgetState};
