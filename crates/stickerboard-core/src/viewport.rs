//! Canvas viewport: size, page offset and zoom.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Canvas size used before the host reports one.
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(1280.0, 720.0);

/// Viewport maps pointer positions into canvas space.
///
/// The host pushes the canvas size, the canvas's offset on the page and the
/// zoom factor whenever they change. A zero width or height disables bounds
/// checking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Canvas size in canvas units.
    pub size: Size,
    /// Offset of the canvas origin in screen coordinates.
    pub offset: Vec2,
    /// Screen pixels per canvas unit.
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            size: DEFAULT_CANVAS_SIZE,
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport for a canvas of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            ..Self::default()
        }
    }

    /// Transform from canvas coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Transform from screen coordinates to canvas coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Set the zoom factor. Non-positive or non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
        } else {
            log::warn!("Ignoring invalid zoom factor {}", zoom);
        }
    }

    /// Set the canvas size. Negative or non-finite values count as unset.
    pub fn set_size(&mut self, width: f64, height: f64) {
        let sanitize = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        self.size = Size::new(sanitize(width), sanitize(height));
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    /// Whether the canvas has a usable size for bounds checking.
    pub fn has_bounds(&self) -> bool {
        self.size.width != 0.0 && self.size.height != 0.0
    }
}
