//! Placement rules: overlap, canvas bounds, instance limits and scale range.
//!
//! These are pure functions over asset data. They never fail; assets that
//! have not been measured yet simply carry no corners.

use crate::asset::Asset;
use crate::geometry::{self, PRECISION};
use kurbo::Point;

/// Default cap on assets sharing one source.
pub const DEFAULT_MAX_INSTANCES: usize = 5;

/// Check whether two assets are in conflict.
///
/// Assets conflict only when they are distinct, of the same type, not both
/// allowed to overlap, and their corners intersect.
pub fn assets_conflict(a: &Asset, b: &Asset) -> bool {
    if a.id == b.id {
        return false;
    }
    if a.asset_type != b.asset_type {
        return false;
    }
    if a.can_overlap && b.can_overlap {
        return false;
    }
    geometry::intersects(&a.corners, &b.corners)
}

/// The four regions surrounding a canvas: left, above, right and below.
///
/// Each region reaches at least twice the canvas size past the edge it
/// borders, so anything that leaves the canvas lands in one of them.
pub fn outside_regions(width: f64, height: f64) -> [[Point; 4]; 4] {
    let (w, h) = (width, height);
    [
        [
            Point::new(0.0, -h),
            Point::new(0.0, 2.0 * h),
            Point::new(-w, 2.0 * h),
            Point::new(-w, -h),
        ],
        [
            Point::new(-w, 0.0),
            Point::new(2.0 * w, 0.0),
            Point::new(2.0 * w, -h),
            Point::new(-w, -h),
        ],
        [
            Point::new(w, -h),
            Point::new(w, 2.0 * h),
            Point::new(2.0 * w, 2.0 * h),
            Point::new(2.0 * w, -h),
        ],
        [
            Point::new(-w, h),
            Point::new(2.0 * w, h),
            Point::new(2.0 * w, 2.0 * h),
            Point::new(-w, 2.0 * h),
        ],
    ]
}

/// Check that an asset does not reach outside the canvas.
///
/// A zero width or height means the canvas has not been sized yet and
/// disables the check.
pub fn is_within_bounds(asset: &Asset, canvas_width: f64, canvas_height: f64) -> bool {
    if canvas_width == 0.0 || canvas_height == 0.0 {
        return true;
    }
    !outside_regions(canvas_width, canvas_height)
        .iter()
        .any(|region| geometry::intersects(&asset.corners, region))
}

/// Decide whether an asset's current placement is acceptable.
///
/// `siblings` should hold the same-type assets of the asset's collection; the
/// asset itself may be among them and is skipped.
pub fn is_valid_placement<'a>(
    asset: &Asset,
    siblings: impl IntoIterator<Item = &'a Asset>,
    canvas_width: f64,
    canvas_height: f64,
) -> bool {
    if asset.corners.is_empty() {
        return false;
    }
    if !is_within_bounds(asset, canvas_width, canvas_height) {
        return false;
    }
    if asset.can_overlap {
        return true;
    }
    !siblings
        .into_iter()
        .any(|s| s.id != asset.id && !s.can_overlap && assets_conflict(asset, s))
}

/// Check whether one more asset from `group_key` fits under the limit.
pub fn instance_count_ok<'a>(
    siblings: impl IntoIterator<Item = &'a Asset>,
    group_key: &str,
    max_instances: usize,
) -> bool {
    let existing = siblings
        .into_iter()
        .filter(|s| s.source_ref == group_key)
        .count();
    existing < max_instances
}

/// Coarse check that an asset's scale lies in the range its media allows.
///
/// The allowed range keeps the scaled media between `min_dim` and `max_dim`
/// on both axes, further capped by the asset's own `max_scale`. Only the
/// whole-number rounding of the scale and its clamped value are compared.
pub fn scale_within_range(
    asset: &Asset,
    intrinsic_width: f64,
    intrinsic_height: f64,
    min_dim: f64,
    max_dim: f64,
) -> bool {
    let min_scale = (min_dim / intrinsic_width).max(min_dim / intrinsic_height);
    let max_scale = (max_dim / intrinsic_width)
        .min(max_dim / intrinsic_height)
        .min(asset.max_scale);

    let scale = asset.transform.scale;
    let clamped = geometry::round_to(scale.min(max_scale).max(min_scale), PRECISION);
    scale.round() == clamped.round()
}
