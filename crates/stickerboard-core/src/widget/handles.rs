//! Manipulation handles placed on an asset's oriented corners.

use crate::asset::Asset;
use crate::geometry;
use kurbo::Point;

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 16.0;
/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 24.0;

/// What a pointer-down on an asset landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// The asset itself; starts a drag.
    Body,
    /// Removes the asset.
    Delete,
    /// Starts a rotation.
    Rotate,
    /// Sends the asset one layer down.
    Layer,
    /// Starts a scale.
    Scale,
}

impl HandleKind {
    /// Index into the asset's corners where this handle sits, if it is a
    /// corner handle.
    fn corner(self) -> Option<usize> {
        match self {
            HandleKind::Body => None,
            HandleKind::Scale => Some(0),
            HandleKind::Rotate => Some(1),
            HandleKind::Delete => Some(2),
            HandleKind::Layer => Some(3),
        }
    }
}

/// A manipulation handle with its position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// The kind of handle (determines behavior).
    pub kind: HandleKind,
    /// Position in canvas coordinates.
    pub position: Point,
}

impl Handle {
    /// Create a new handle.
    pub fn new(kind: HandleKind, position: Point) -> Self {
        Self { kind, position }
    }

    /// Check if a point (in canvas coordinates) hits this handle.
    /// `tolerance` should be adjusted for zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Get the corner handles of a measured asset.
///
/// Unmeasured assets have no handles.
pub fn get_handles(asset: &Asset) -> Vec<Handle> {
    if asset.corners.len() < 4 {
        return Vec::new();
    }
    [
        HandleKind::Delete,
        HandleKind::Rotate,
        HandleKind::Layer,
        HandleKind::Scale,
    ]
    .into_iter()
    .filter_map(|kind| {
        kind.corner()
            .map(|i| Handle::new(kind, asset.corners[i]))
    })
    .collect()
}

/// Hit test an asset's handles, then its body.
pub fn hit_test(asset: &Asset, point: Point, tolerance: f64, with_handles: bool) -> Option<HandleKind> {
    if with_handles {
        if let Some(handle) = get_handles(asset)
            .into_iter()
            .find(|h| h.hit_test(point, tolerance))
        {
            return Some(handle.kind);
        }
    }
    geometry::contains_point(&asset.corners, point).then_some(HandleKind::Body)
}
