//! Asset data: identity, transform, and the persisted snapshot shape.
//!
//! Assets are pure data. Interaction state lives in
//! [`EditableAsset`](crate::widget::EditableAsset), which wraps an asset.

use crate::geometry::{self, PRECISION};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for assets.
pub type AssetId = Uuid;

/// What kind of element an asset is.
///
/// Only assets of the same type can conflict with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// The scene backdrop. At most one per scene, always at layer 1.
    Background,
    #[default]
    Item,
    Message,
}

impl AssetType {
    /// Layer assigned to a freshly placed asset, and the top rank used when
    /// compacting layers.
    pub fn base_layer(self) -> i32 {
        match self {
            AssetType::Background => 1,
            AssetType::Item => 1000,
            AssetType::Message => 10000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Background => "background",
            AssetType::Item => "item",
            AssetType::Message => "message",
        }
    }
}

/// Immutable placement of an asset on the canvas.
///
/// Transforms never change in place; [`Transform::reduce`] produces the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Left edge of the unscaled, unrotated box, in canvas units.
    pub left: f64,
    /// Top edge of the unscaled, unrotated box, in canvas units.
    pub top: f64,
    /// Uniform scale around the box center.
    pub scale: f64,
    /// Rotation around the box center, in radians.
    pub rotation: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale: Asset::DEFAULT_SCALE,
            rotation: 0.0,
        }
    }
}

/// A single change to a [`Transform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformUpdate {
    Move { left: f64, top: f64 },
    Scale(f64),
    Rotate(f64),
    /// Replace the whole transform (revert or return-to-start).
    Restore(Transform),
}

impl Transform {
    /// Apply an update, returning the new transform.
    #[must_use]
    pub fn reduce(self, update: TransformUpdate) -> Self {
        match update {
            TransformUpdate::Move { left, top } => Self { left, top, ..self },
            TransformUpdate::Scale(scale) => Self { scale, ..self },
            TransformUpdate::Rotate(rotation) => Self { rotation, ..self },
            TransformUpdate::Restore(transform) => transform,
        }
    }

    /// Top-left origin as a vector.
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }
}

/// Transform values saved with a composition.
///
/// Missing or zero values fall back to the defaults of a fresh asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub layer: Option<i32>,
}

/// A request to place new media on the canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRequest {
    /// Source reference; assets sharing it count towards the same instance limit.
    pub source_ref: String,
    #[serde(default)]
    pub asset_type: AssetType,
    /// Key used to look up media metadata. Defaults to `source_ref`.
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub can_overlap: bool,
    /// Saved transform when rebuilding a composition.
    #[serde(default)]
    pub state: Option<PersistedState>,
}

impl AssetRequest {
    pub fn new(asset_type: AssetType, source_ref: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            asset_type,
            ..Default::default()
        }
    }

    pub fn with_overlap(mut self, can_overlap: bool) -> Self {
        self.can_overlap = can_overlap;
        self
    }

    pub fn with_state(mut self, state: PersistedState) -> Self {
        self.state = Some(state);
        self
    }
}

/// A placeable rectangular element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub(crate) id: AssetId,
    pub asset_type: AssetType,
    pub source_ref: String,
    pub media_id: String,
    pub transform: Transform,
    /// Intrinsic width of the source media (0 until resolved).
    pub width: f64,
    /// Intrinsic height of the source media (0 until resolved).
    pub height: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub layer: i32,
    pub can_overlap: bool,
    /// Oriented corners, empty until the asset is first measured.
    #[serde(default)]
    pub corners: Vec<Point>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Opaque integrity token reported by the media service.
    #[serde(default)]
    pub check: Option<String>,
    /// Whether `transform.scale` came from a saved composition.
    #[serde(skip)]
    pub(crate) persisted_scale: bool,
}

impl Asset {
    pub const DEFAULT_SCALE: f64 = 0.5;
    pub const DEFAULT_MIN_SCALE: f64 = 0.1;
    pub const DEFAULT_MAX_SCALE: f64 = 1.0;

    /// Create an asset from a placement request.
    pub fn from_request(request: AssetRequest) -> Self {
        let persisted = request.state.unwrap_or_default();
        let scale = persisted.scale.filter(|s| *s > 0.0);
        let layer = match request.asset_type {
            AssetType::Background => AssetType::Background.base_layer(),
            other => persisted
                .layer
                .filter(|l| *l != 0)
                .unwrap_or_else(|| other.base_layer()),
        };
        let media_id = request
            .media_id
            .unwrap_or_else(|| request.source_ref.clone());

        Self {
            id: Uuid::new_v4(),
            asset_type: request.asset_type,
            source_ref: request.source_ref,
            media_id,
            transform: Transform {
                left: persisted.left,
                top: persisted.top,
                scale: scale.unwrap_or(Self::DEFAULT_SCALE),
                rotation: persisted.rotation,
            },
            width: 0.0,
            height: 0.0,
            min_scale: Self::DEFAULT_MIN_SCALE,
            max_scale: Self::DEFAULT_MAX_SCALE,
            layer,
            can_overlap: request.can_overlap,
            corners: Vec::new(),
            mime_type: None,
            check: None,
            persisted_scale: scale.is_some(),
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Whether the asset has ever had its corners computed.
    pub fn is_measured(&self) -> bool {
        !self.corners.is_empty()
    }

    /// Recompute the oriented corners from the current transform.
    pub fn refresh_corners(&mut self) {
        let t = self.transform;
        self.corners =
            geometry::compute_corners(t.left, t.top, self.width, self.height, t.rotation, t.scale)
                .to_vec();
    }

    /// Rotation and scale pivot, in canvas units.
    pub fn center(&self) -> Point {
        Point::new(
            self.transform.left + self.width / 2.0,
            self.transform.top + self.height / 2.0,
        )
    }

    /// Distance from center to a corner at scale 1.
    pub fn half_diagonal(&self) -> f64 {
        (self.width / 2.0).hypot(self.height / 2.0)
    }
}

/// Exported state of one asset.
///
/// Every field has a serde default so partially written snapshots still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub scale: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub layer: i32,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub corners: Vec<Point>,
    #[serde(default)]
    pub asset_type: AssetType,
    #[serde(default)]
    pub source_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default)]
    pub can_overlap: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
}

fn default_valid() -> bool {
    true
}

impl AssetSnapshot {
    /// Capture an asset, flooring numeric fields to [`PRECISION`] digits.
    pub fn capture(asset: &Asset, valid: bool) -> Self {
        let t = asset.transform;
        Self {
            left: geometry::floor_to(t.left, PRECISION),
            top: geometry::floor_to(t.top, PRECISION),
            scale: geometry::floor_to(t.scale, PRECISION),
            rotation: geometry::floor_to(t.rotation, PRECISION),
            layer: asset.layer,
            valid,
            corners: asset.corners.clone(),
            asset_type: asset.asset_type,
            source_ref: asset.source_ref.clone(),
            media_id: (asset.media_id != asset.source_ref).then(|| asset.media_id.clone()),
            can_overlap: asset.can_overlap,
            mime_type: asset.mime_type.clone(),
            check: asset.check.clone(),
        }
    }

    /// Turn a saved asset back into a placement request.
    pub fn to_request(&self) -> AssetRequest {
        AssetRequest {
            source_ref: self.source_ref.clone(),
            asset_type: self.asset_type,
            media_id: self.media_id.clone(),
            can_overlap: self.can_overlap,
            state: Some(PersistedState {
                left: self.left,
                top: self.top,
                scale: Some(self.scale),
                rotation: self.rotation,
                layer: Some(self.layer),
            }),
        }
    }
}
