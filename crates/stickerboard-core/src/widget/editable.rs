//! The interactive wrapper around one placeable asset.

use super::capability::{
    Capability, DragCapability, GestureContext, RotateCapability, ScaleCapability,
};
use super::handles::{self, HandleKind, HANDLE_HIT_TOLERANCE};
use super::state::{Pending, WidgetState};
use crate::asset::{Asset, AssetId, AssetSnapshot, Transform, TransformUpdate};
use crate::media::MediaInfo;
use crate::viewport::Viewport;
use kurbo::Point;

/// Decides whether an asset's current placement is acceptable.
///
/// The scene implements this with a view of the asset's siblings.
pub trait PlacementCheck {
    fn check(&self, asset: &Asset) -> bool;
}

impl<F: Fn(&Asset) -> bool> PlacementCheck for F {
    fn check(&self, asset: &Asset) -> bool {
        self(asset)
    }
}

/// An asset plus its interaction state.
///
/// Every change to the geometry recomputes corners, re-evaluates validity and,
/// when valid, records the transform as the last valid one, in that order.
#[derive(Debug, Clone)]
pub struct EditableAsset {
    pub(crate) asset: Asset,
    state: WidgetState,
    valid: bool,
    last_valid: Option<Transform>,
    pending: Option<Pending>,
    drag: DragCapability,
    scale: ScaleCapability,
    rotate: RotateCapability,
}

impl EditableAsset {
    /// Wrap an asset. It starts idle, waiting for its media.
    pub fn new(asset: Asset, return_to_start: bool) -> Self {
        let mut editable = Self {
            asset,
            state: WidgetState::Idle,
            valid: true,
            last_valid: None,
            pending: Some(Pending::Resolve),
            drag: DragCapability::new(return_to_start),
            scale: ScaleCapability::default(),
            rotate: RotateCapability,
        };
        editable.init_capabilities();
        editable
    }

    fn init_capabilities(&mut self) {
        self.drag.init(&self.asset);
        self.scale.init(&self.asset);
        self.rotate.init(&self.asset);
    }

    pub fn id(&self) -> AssetId {
        self.asset.id
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The transform captured the last time the asset was valid, if ever.
    pub fn last_valid(&self) -> Option<Transform> {
        self.last_valid
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// Capture the exported state.
    pub fn snapshot(&self) -> AssetSnapshot {
        AssetSnapshot::capture(&self.asset, self.valid)
    }

    /// Find what a canvas point lands on. Handles only exist while active.
    pub fn hit_test(&self, point: Point, zoom: f64) -> Option<HandleKind> {
        handles::hit_test(
            &self.asset,
            point,
            HANDLE_HIT_TOLERANCE / zoom,
            self.is_active(),
        )
    }

    /// Recompute corners, validity and the last valid transform.
    pub fn revalidate(&mut self, check: &impl PlacementCheck) -> bool {
        self.asset.refresh_corners();
        self.valid = check.check(&self.asset);
        if self.valid {
            self.last_valid = Some(self.asset.transform);
        }
        log::trace!("Asset {} valid={}", self.asset.id, self.valid);
        self.valid
    }

    fn apply(&mut self, update: TransformUpdate, check: &impl PlacementCheck) {
        self.asset.transform = self.asset.transform.reduce(update);
        self.revalidate(check);
    }

    /// Select the asset. Returns false if it was already selected.
    pub fn activate(&mut self) -> bool {
        if self.state.is_active() {
            return false;
        }
        log::debug!("Activating asset {}", self.asset.id);
        self.state = WidgetState::Active;
        true
    }

    /// Deselect the asset, reverting an invalid placement.
    ///
    /// The revert happens immediately; re-validation waits for
    /// [`settle`](Self::settle). An asset that was never valid has nothing
    /// to revert to and keeps its transform.
    pub fn deactivate(&mut self) {
        if !self.state.is_active() {
            return;
        }
        if self.state.is_manipulating() {
            self.init_capabilities();
        }
        if !self.valid {
            if let Some(last_valid) = self.last_valid {
                log::debug!("Reverting invalid asset {} on deactivate", self.asset.id);
                let restore = TransformUpdate::Restore(last_valid);
                self.asset.transform = self.asset.transform.reduce(restore);
                self.asset.refresh_corners();
                self.pending = Some(Pending::Revert);
            } else {
                log::debug!("Asset {} was never valid, nothing to revert", self.asset.id);
            }
        }
        self.state = WidgetState::Idle;
    }

    /// Run a pending revert continuation. Returns true if one ran.
    pub fn settle(&mut self, check: &impl PlacementCheck) -> bool {
        if self.pending != Some(Pending::Revert) {
            return false;
        }
        self.pending = None;
        self.revalidate(check);
        true
    }

    fn can_begin(&self) -> bool {
        self.state == WidgetState::Active && self.pending.is_none()
    }

    /// Start dragging. Only the body of an active, settled asset can be dragged.
    pub fn begin_drag(&mut self, target: HandleKind, pointer: Point, viewport: &Viewport) -> bool {
        if target != HandleKind::Body || !self.can_begin() {
            return false;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        self.drag.on_attach(ctx, pointer);
        self.state = WidgetState::Dragging;
        true
    }

    pub fn update_drag(&mut self, pointer: Point, viewport: &Viewport, check: &impl PlacementCheck) {
        if self.state != WidgetState::Dragging {
            return;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        if let Some(update) = self.drag.update(ctx, pointer) {
            self.apply(update, check);
        }
    }

    /// Finish a drag. Accepting or rejecting the position waits for
    /// [`deactivate`](Self::deactivate), unless the drag returns to its start.
    pub fn end_drag(&mut self, viewport: &Viewport, check: &impl PlacementCheck) {
        if self.state != WidgetState::Dragging {
            return;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        if let Some(update) = self.drag.on_detach(ctx) {
            self.apply(update, check);
        }
        self.state = WidgetState::Active;
    }

    pub fn begin_scale(&mut self, pointer: Point, viewport: &Viewport) -> bool {
        if !self.can_begin() {
            return false;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        self.scale.on_attach(ctx, pointer);
        self.state = WidgetState::Scaling;
        true
    }

    pub fn update_scale(&mut self, pointer: Point, viewport: &Viewport, check: &impl PlacementCheck) {
        if self.state != WidgetState::Scaling {
            return;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        if let Some(update) = self.scale.update(ctx, pointer) {
            self.apply(update, check);
        }
    }

    pub fn end_scale(&mut self, viewport: &Viewport, check: &impl PlacementCheck) {
        if self.state != WidgetState::Scaling {
            return;
        }
        if let Some(update) = self.scale.on_detach(GestureContext::new(&self.asset, viewport)) {
            self.apply(update, check);
        }
        self.state = WidgetState::Active;
    }

    pub fn begin_rotate(&mut self, pointer: Point, viewport: &Viewport) -> bool {
        if !self.can_begin() {
            return false;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        self.rotate.on_attach(ctx, pointer);
        self.state = WidgetState::Rotating;
        true
    }

    pub fn update_rotate(&mut self, pointer: Point, viewport: &Viewport, check: &impl PlacementCheck) {
        if self.state != WidgetState::Rotating {
            return;
        }
        let ctx = GestureContext::new(&self.asset, viewport);
        if let Some(update) = self.rotate.update(ctx, pointer) {
            self.apply(update, check);
        }
    }

    pub fn end_rotate(&mut self, viewport: &Viewport, check: &impl PlacementCheck) {
        if self.state != WidgetState::Rotating {
            return;
        }
        if let Some(update) = self.rotate.on_detach(GestureContext::new(&self.asset, viewport)) {
            self.apply(update, check);
        }
        self.state = WidgetState::Active;
    }

    /// Move one layer down. The scene compacts layers afterwards.
    pub fn lower(&mut self) {
        self.asset.layer -= 1;
    }

    pub(crate) fn set_layer(&mut self, layer: i32) {
        self.asset.layer = layer;
    }

    /// Record media metadata and clear the media continuation without
    /// touching the geometry.
    pub fn apply_metadata(&mut self, info: &MediaInfo) {
        if info.mime_type.is_some() {
            self.asset.mime_type = info.mime_type.clone();
        }
        if info.check.is_some() {
            self.asset.check = info.check.clone();
        }
        if self.pending == Some(Pending::Resolve) {
            self.pending = None;
        }
    }

    /// Complete the media continuation with resolved metadata.
    ///
    /// Stores the intrinsic size, derives the minimum scale from `min_dim`,
    /// clamps the scale into range unless it was persisted, centers an
    /// asset that was never placed, then activates and re-validates.
    pub fn apply_media(
        &mut self,
        info: &MediaInfo,
        min_dim: f64,
        max_dim: f64,
        viewport: &Viewport,
        check: &impl PlacementCheck,
    ) {
        let asset = &mut self.asset;
        let was_sized = asset.width > 0.0 && asset.height > 0.0;
        let usable = |v: f64| v.is_finite() && v > 0.0;

        if usable(info.width) && usable(info.height) {
            asset.width = info.width;
            asset.height = info.height;
            asset.min_scale = (min_dim / info.width).max(min_dim / info.height);
            let max_scale = (max_dim / info.width)
                .min(max_dim / info.height)
                .min(asset.max_scale);
            if !asset.persisted_scale {
                asset.transform.scale = asset.transform.scale.min(max_scale).max(asset.min_scale);
            }
        } else {
            log::warn!(
                "Media {} reported unusable size {}x{}",
                asset.media_id,
                info.width,
                info.height
            );
            asset.width = 0.0;
            asset.height = 0.0;
        }

        let t = asset.transform;
        if !was_sized && t.left == 0.0 && t.top == 0.0 && viewport.has_bounds() {
            asset.transform = t.reduce(TransformUpdate::Move {
                left: (viewport.width() - asset.width) / 2.0,
                top: (viewport.height() - asset.height) / 2.0,
            });
        }

        self.apply_metadata(info);
        self.init_capabilities();
        self.activate();
        self.revalidate(check);
    }
}
