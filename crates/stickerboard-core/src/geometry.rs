//! Oriented rectangle geometry and convex polygon intersection.
//!
//! Everything here is a total function: degenerate input (zero sizes, empty
//! polygons) produces degenerate output instead of an error.

use kurbo::{Point, Vec2};
use std::f64::consts::PI;

/// Decimal digits kept when comparing or exporting derived values.
pub const PRECISION: i32 = 14;

/// Largest magnitude at which every integer is exactly representable in an f64.
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

/// Compute the four corners of a rotated, scaled rectangle.
///
/// The rectangle is scaled and rotated around its unscaled center
/// `(left + width / 2, top + height / 2)`. Corner order is fixed; consecutive
/// corners share an edge, which the intersection test depends on.
pub fn compute_corners(
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    rotation: f64,
    scale: f64,
) -> [Point; 4] {
    let center = Point::new(left + width / 2.0, top + height / 2.0);
    let half_w = width * scale / 2.0;
    let half_h = height * scale / 2.0;
    let radius = (half_w * half_w + half_h * half_h).sqrt();
    // atan2(0, 0) is 0, so empty rectangles collapse onto their center.
    let diagonal = height.atan2(width);

    let mut corners = [Point::ZERO; 4];
    for (i, corner) in corners.iter_mut().enumerate() {
        let half_turn = if i < 2 { 0.0 } else { PI };
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let angle = rotation + half_turn + sign * diagonal;
        *corner = Point::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        );
    }
    corners
}

/// Project every vertex onto `axis` and return the covered interval.
fn project(polygon: &[Point], axis: Vec2) -> (f64, f64) {
    polygon
        .iter()
        .map(|p| axis.dot(p.to_vec2()))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        })
}

/// Test whether two convex polygons intersect (Separating Axis Theorem).
///
/// Every edge normal of both polygons is tried as a separating axis; the
/// first one whose projections do not overlap proves the polygons disjoint.
/// Touching edges count as intersecting. An empty polygon never intersects.
pub fn intersects(a: &[Point], b: &[Point]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    for polygon in [a, b] {
        for (i, &p1) in polygon.iter().enumerate() {
            let p2 = polygon[(i + 1) % polygon.len()];
            let normal = Vec2::new(p2.y - p1.y, p1.x - p2.x);

            let (min_a, max_a) = project(a, normal);
            let (min_b, max_b) = project(b, normal);
            if max_a < min_b || max_b < min_a {
                return false;
            }
        }
    }

    true
}

/// Check whether a point lies inside (or on the edge of) a convex polygon.
pub fn contains_point(polygon: &[Point], point: Point) -> bool {
    // A single point has only a degenerate edge, so only the polygon's own
    // edges can separate it.
    intersects(polygon, &[point])
}

/// Round to `digits` decimal places.
///
/// Values already too large to carry that many fractional digits are
/// returned unchanged.
pub fn round_to(value: f64, digits: i32) -> f64 {
    scaled(value, digits, f64::round)
}

/// Floor to `digits` decimal places.
pub fn floor_to(value: f64, digits: i32) -> f64 {
    scaled(value, digits, f64::floor)
}

fn scaled(value: f64, digits: i32, op: fn(f64) -> f64) -> f64 {
    let factor = 10f64.powi(digits);
    let shifted = value * factor;
    if !shifted.is_finite() || shifted.abs() >= MAX_EXACT {
        return value;
    }
    op(shifted) / factor
}

/// Round a polygon's coordinates to [`PRECISION`] digits.
pub fn round_points(points: &[Point]) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(round_to(p.x, PRECISION), round_to(p.y, PRECISION)))
        .collect()
}
