//! Gesture capabilities composed into an editable asset.
//!
//! A capability turns pointer positions into [`TransformUpdate`]s. It never
//! touches the asset; the owner applies the update and re-validates.

use crate::asset::{Asset, Transform, TransformUpdate};
use crate::viewport::Viewport;
use kurbo::{Point, Vec2};
use std::f64::consts::FRAC_PI_4;

/// What a capability can see while a gesture runs.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext<'a> {
    pub asset: &'a Asset,
    pub viewport: &'a Viewport,
}

impl<'a> GestureContext<'a> {
    pub fn new(asset: &'a Asset, viewport: &'a Viewport) -> Self {
        Self { asset, viewport }
    }

    /// Pointer position in canvas units.
    fn canvas_point(&self, pointer: Point) -> Point {
        self.viewport.screen_to_canvas(pointer)
    }

    /// Pointer offset from the asset's pivot, in canvas units.
    fn from_center(&self, pointer: Point) -> Vec2 {
        self.canvas_point(pointer) - self.asset.center()
    }
}

/// A gesture behavior attached to an asset.
pub trait Capability {
    /// Reset internal state for the asset's current dimensions.
    fn init(&mut self, _asset: &Asset) {}

    /// Called when a gesture starts.
    fn on_attach(&mut self, _ctx: GestureContext<'_>, _pointer: Point) {}

    /// Called for each pointer move while the gesture runs.
    fn update(&mut self, ctx: GestureContext<'_>, pointer: Point) -> Option<TransformUpdate>;

    /// Called when the gesture ends. May return a final update.
    fn on_detach(&mut self, _ctx: GestureContext<'_>) -> Option<TransformUpdate> {
        None
    }
}

/// Moves the asset with the pointer, keeping the grab point under it.
#[derive(Debug, Clone, Default)]
pub struct DragCapability {
    /// Snap back to the gesture's start on release.
    pub return_to_start: bool,
    grab: Option<Vec2>,
    start: Option<Transform>,
}

impl DragCapability {
    pub fn new(return_to_start: bool) -> Self {
        Self {
            return_to_start,
            ..Default::default()
        }
    }

    /// Whether a drag is in flight.
    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }
}

impl Capability for DragCapability {
    fn init(&mut self, _asset: &Asset) {
        self.grab = None;
        self.start = None;
    }

    fn on_attach(&mut self, ctx: GestureContext<'_>, pointer: Point) {
        let origin = ctx.asset.transform.origin();
        self.grab = Some(ctx.canvas_point(pointer).to_vec2() - origin);
        self.start = Some(ctx.asset.transform);
    }

    fn update(&mut self, ctx: GestureContext<'_>, pointer: Point) -> Option<TransformUpdate> {
        let grab = self.grab?;
        let origin = ctx.canvas_point(pointer) - grab;
        Some(TransformUpdate::Move {
            left: origin.x,
            top: origin.y,
        })
    }

    fn on_detach(&mut self, _ctx: GestureContext<'_>) -> Option<TransformUpdate> {
        self.grab = None;
        let start = self.start.take()?;
        self.return_to_start.then_some(TransformUpdate::Restore(start))
    }
}

/// Scales the asset by the pointer's distance from its center.
#[derive(Debug, Clone, Default)]
pub struct ScaleCapability {
    /// Half diagonal of the unscaled asset.
    base: f64,
}

impl Capability for ScaleCapability {
    fn init(&mut self, asset: &Asset) {
        self.base = asset.half_diagonal();
    }

    fn update(&mut self, ctx: GestureContext<'_>, pointer: Point) -> Option<TransformUpdate> {
        if self.base <= 0.0 {
            return None;
        }
        let distance = ctx.from_center(pointer).hypot();
        let scale = (distance / self.base)
            .min(ctx.asset.max_scale)
            .max(ctx.asset.min_scale);
        Some(TransformUpdate::Scale(scale))
    }
}

/// Rotates the asset so the rotate handle follows the pointer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotateCapability;

impl Capability for RotateCapability {
    fn update(&mut self, ctx: GestureContext<'_>, pointer: Point) -> Option<TransformUpdate> {
        let delta = ctx.from_center(pointer);
        // The rotate handle sits a quarter turn back from the pointer direction.
        Some(TransformUpdate::Rotate(delta.y.atan2(delta.x) + FRAC_PI_4))
    }
}
