//! Scene: the background, items and messages placed on one canvas.

use crate::asset::{Asset, AssetId, AssetRequest, AssetSnapshot, AssetType};
use crate::config::SceneConfig;
use crate::error::SceneResult;
use crate::media::{MediaInfo, MediaResolver};
use crate::validity;
use crate::viewport::Viewport;
use crate::widget::{EditableAsset, HandleKind, Pending, PlacementCheck, WidgetState};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::Path;

/// Notifications for the host, drained with [`Scene::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// An asset's validity flipped.
    ValidityChanged { id: AssetId, valid: bool },
    /// An asset was refused because its source is already placed too often.
    LimitExceeded { source_ref: String },
    /// The canvas was clicked while some asset was invalid.
    CollisionWarning,
}

/// Exported state of a whole scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default)]
    pub background: Option<AssetSnapshot>,
    #[serde(default)]
    pub items: Vec<AssetSnapshot>,
    #[serde(default)]
    pub messages: Vec<AssetSnapshot>,
}

impl SceneSnapshot {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a snapshot from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SceneResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Total number of assets, background included.
    pub fn len(&self) -> usize {
        self.background.iter().count() + self.items.len() + self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validity check of one asset against the rest of its collection.
struct SiblingView<'a> {
    before: &'a [EditableAsset],
    after: &'a [EditableAsset],
    viewport: &'a Viewport,
}

impl PlacementCheck for SiblingView<'_> {
    fn check(&self, asset: &Asset) -> bool {
        let siblings = self
            .before
            .iter()
            .chain(self.after)
            .map(EditableAsset::asset);
        validity::is_valid_placement(
            asset,
            siblings,
            self.viewport.width(),
            self.viewport.height(),
        )
    }
}

/// Run `f` on the asset at `index` with a view of its siblings, recording a
/// [`SceneEvent::ValidityChanged`] if its validity flips.
fn visit<R>(
    list: &mut [EditableAsset],
    index: usize,
    viewport: &Viewport,
    events: &mut Vec<SceneEvent>,
    f: impl FnOnce(&mut EditableAsset, &SiblingView<'_>) -> R,
) -> Option<R> {
    let (before, rest) = list.split_at_mut(index);
    let (target, after) = rest.split_first_mut()?;
    let view = SiblingView {
        before,
        after,
        viewport,
    };
    let was_valid = target.is_valid();
    let result = f(target, &view);
    if target.is_valid() != was_valid {
        events.push(SceneEvent::ValidityChanged {
            id: target.id(),
            valid: target.is_valid(),
        });
    }
    Some(result)
}

/// The canvas-wide container.
///
/// Items and messages are kept in insertion order; each collection is its own
/// validity and layering domain. The background is never validated.
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    viewport: Viewport,
    background: Option<EditableAsset>,
    items: Vec<EditableAsset>,
    messages: Vec<EditableAsset>,
    events: Vec<SceneEvent>,
    /// Asset receiving pointer moves until pointer-up.
    gesture: Option<AssetId>,
    active: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    /// Create an empty scene.
    pub fn new(config: SceneConfig) -> Self {
        let viewport = Viewport::new(config.canvas_width, config.canvas_height);
        Self {
            config,
            viewport,
            background: None,
            items: Vec::new(),
            messages: Vec::new(),
            events: Vec::new(),
            gesture: None,
            active: false,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Set the canvas size. Validity is refreshed on the next [`settle`](Self::settle).
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport.set_size(width, height);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    /// Set where the canvas origin sits on screen.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.viewport.offset = offset;
    }

    pub fn background(&self) -> Option<&EditableAsset> {
        self.background.as_ref()
    }

    pub fn items(&self) -> &[EditableAsset] {
        &self.items
    }

    pub fn messages(&self) -> &[EditableAsset] {
        &self.messages
    }

    /// All assets: background, items, then messages.
    pub fn assets(&self) -> impl Iterator<Item = &EditableAsset> {
        self.background
            .iter()
            .chain(self.items.iter())
            .chain(self.messages.iter())
    }

    pub fn get(&self, id: AssetId) -> Option<&EditableAsset> {
        self.assets().find(|a| a.id() == id)
    }

    pub fn len(&self) -> usize {
        self.assets().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether some asset has been selected since the last canvas click.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The currently selected asset, if any.
    pub fn active_asset(&self) -> Option<AssetId> {
        self.assets().find(|a| a.is_active()).map(EditableAsset::id)
    }

    /// Whether every item and message is validly placed.
    pub fn all_valid(&self) -> bool {
        self.items
            .iter()
            .chain(self.messages.iter())
            .all(EditableAsset::is_valid)
    }

    /// Take all queued notifications.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    fn collection(&self, asset_type: AssetType) -> &[EditableAsset] {
        match asset_type {
            AssetType::Background => self.background.as_slice(),
            AssetType::Item => &self.items,
            AssetType::Message => &self.messages,
        }
    }

    /// The item or message list. The background has none.
    fn collection_mut(&mut self, asset_type: AssetType) -> Option<&mut Vec<EditableAsset>> {
        match asset_type {
            AssetType::Background => None,
            AssetType::Item => Some(&mut self.items),
            AssetType::Message => Some(&mut self.messages),
        }
    }

    /// Find an item or message by id.
    fn locate(&self, id: AssetId) -> Option<(AssetType, usize)> {
        [AssetType::Item, AssetType::Message]
            .into_iter()
            .find_map(|kind| {
                self.collection(kind)
                    .iter()
                    .position(|a| a.id() == id)
                    .map(|index| (kind, index))
            })
    }

    /// Run `f` on an item or message. Stale ids are ignored.
    fn with_asset<R>(
        &mut self,
        id: AssetId,
        f: impl FnOnce(&mut EditableAsset, &SiblingView<'_>) -> R,
    ) -> Option<R> {
        let Some((kind, index)) = self.locate(id) else {
            log::debug!("Ignoring stale asset id {}", id);
            return None;
        };
        let list = match kind {
            AssetType::Background => return None,
            AssetType::Item => &mut self.items,
            AssetType::Message => &mut self.messages,
        };
        visit(list, index, &self.viewport, &mut self.events, f)
    }

    /// Place new media on the canvas.
    ///
    /// Returns `None` and queues [`SceneEvent::LimitExceeded`] when the source
    /// is already placed `max_instances` times in the same collection. A
    /// background replaces the previous one.
    pub fn add_asset(&mut self, request: AssetRequest) -> Option<AssetId> {
        let asset_type = request.asset_type;
        if asset_type != AssetType::Background {
            let siblings = self.collection(asset_type).iter().map(EditableAsset::asset);
            if !validity::instance_count_ok(siblings, &request.source_ref, self.config.max_instances) {
                log::warn!(
                    "Refusing {} {}: limit of {} reached",
                    asset_type.as_str(),
                    request.source_ref,
                    self.config.max_instances
                );
                self.events.push(SceneEvent::LimitExceeded {
                    source_ref: request.source_ref,
                });
                return None;
            }
        }

        let editable = EditableAsset::new(Asset::from_request(request), self.config.return_to_start);
        let id = editable.id();
        log::debug!("Added {} {} at layer {}", asset_type.as_str(), id, editable.asset().layer);
        match asset_type {
            AssetType::Background => self.background = Some(editable),
            AssetType::Item => self.items.push(editable),
            AssetType::Message => self.messages.push(editable),
        }
        Some(id)
    }

    /// Remove an asset. Layers of the rest are left as they are.
    pub fn remove_asset(&mut self, id: AssetId) -> bool {
        if self.background.as_ref().is_some_and(|b| b.id() == id) {
            self.background = None;
            return true;
        }
        let Some((kind, index)) = self.locate(id) else {
            log::debug!("Ignoring removal of stale asset id {}", id);
            return false;
        };
        if let Some(list) = self.collection_mut(kind) {
            list.remove(index);
        }
        if self.gesture == Some(id) {
            self.gesture = None;
        }
        log::debug!("Removed {} {}", kind.as_str(), id);
        true
    }

    /// Delete an asset through its delete handle. Only the selected asset can
    /// be deleted this way.
    pub fn delete_asset(&mut self, id: AssetId) -> bool {
        if !self.get(id).is_some_and(EditableAsset::is_active) {
            return false;
        }
        self.remove_asset(id)
    }

    /// Evaluate an asset's placement against its siblings and the canvas.
    ///
    /// Unknown ids are invalid; the background is always acceptable.
    pub fn check_asset(&self, id: AssetId) -> bool {
        if self.background.as_ref().is_some_and(|b| b.id() == id) {
            return true;
        }
        let Some((kind, index)) = self.locate(id) else {
            return false;
        };
        let list = self.collection(kind);
        let view = SiblingView {
            before: &list[..index],
            after: &list[index + 1..],
            viewport: &self.viewport,
        };
        view.check(list[index].asset())
    }

    /// Compact the layers of one collection into a contiguous ranking.
    ///
    /// Distinct layers are ranked from the top; each asset gets the type's
    /// base layer minus its rank. Ties stay tied.
    pub fn relayer(&mut self, asset_type: AssetType) {
        let base = asset_type.base_layer();
        let Some(list) = self.collection_mut(asset_type) else {
            return;
        };

        let mut layers: Vec<i32> = list.iter().map(|a| a.asset().layer).collect();
        layers.sort_unstable_by_key(|&layer| Reverse(layer));
        layers.dedup();

        for editable in list.iter_mut() {
            let layer = editable.asset().layer;
            if let Some(rank) = layers.iter().position(|&l| l == layer) {
                editable.set_layer(base - rank as i32);
            }
        }
    }

    /// Send an asset one layer down, then compact its collection.
    pub fn relayer_asset(&mut self, id: AssetId) -> bool {
        let Some((kind, index)) = self.locate(id) else {
            log::debug!("Ignoring relayer of stale asset id {}", id);
            return false;
        };
        let Some(list) = self.collection_mut(kind) else {
            return false;
        };
        list[index].lower();
        self.relayer(kind);
        true
    }

    /// Deactivate every item and message except `exclude`.
    pub fn deactivate_all_except(&mut self, exclude: Option<AssetId>) {
        for editable in self.items.iter_mut().chain(self.messages.iter_mut()) {
            if Some(editable.id()) != exclude {
                editable.deactivate();
            }
        }
        if self.gesture.is_some() && self.gesture != exclude {
            self.gesture = None;
        }
    }

    /// Select an asset; every other asset is deselected.
    pub fn activate(&mut self, id: AssetId) -> bool {
        let Some(activated) = self.with_asset(id, |editable, _| editable.activate()) else {
            return false;
        };
        self.deactivate_all_except(Some(id));
        self.active = true;
        activated
    }

    pub fn deactivate(&mut self, id: AssetId) -> bool {
        if self.gesture == Some(id) {
            self.gesture = None;
        }
        self.with_asset(id, |editable, _| editable.deactivate()).is_some()
    }

    /// A click on the empty canvas: deselect everything and warn if some
    /// asset is left in an invalid spot.
    pub fn click_empty(&mut self) {
        self.active = false;
        if !self.all_valid() {
            log::debug!("Canvas clicked with invalid assets");
            self.events.push(SceneEvent::CollisionWarning);
        }
        self.deactivate_all_except(None);
    }

    /// Start dragging. `pointer` is in screen coordinates.
    pub fn begin_drag(&mut self, id: AssetId, target: HandleKind, pointer: Point) -> bool {
        let started = self
            .with_asset(id, |editable, view| editable.begin_drag(target, pointer, view.viewport))
            .unwrap_or(false);
        if started {
            self.gesture = Some(id);
        }
        started
    }

    pub fn update_drag(&mut self, id: AssetId, pointer: Point) {
        self.with_asset(id, |editable, view| editable.update_drag(pointer, view.viewport, view));
    }

    pub fn end_drag(&mut self, id: AssetId) {
        self.with_asset(id, |editable, view| editable.end_drag(view.viewport, view));
        self.gesture = None;
    }

    pub fn begin_scale(&mut self, id: AssetId, pointer: Point) -> bool {
        let started = self
            .with_asset(id, |editable, view| editable.begin_scale(pointer, view.viewport))
            .unwrap_or(false);
        if started {
            self.gesture = Some(id);
        }
        started
    }

    pub fn update_scale(&mut self, id: AssetId, pointer: Point) {
        self.with_asset(id, |editable, view| editable.update_scale(pointer, view.viewport, view));
    }

    pub fn end_scale(&mut self, id: AssetId) {
        self.with_asset(id, |editable, view| editable.end_scale(view.viewport, view));
        self.gesture = None;
    }

    pub fn begin_rotate(&mut self, id: AssetId, pointer: Point) -> bool {
        let started = self
            .with_asset(id, |editable, view| editable.begin_rotate(pointer, view.viewport))
            .unwrap_or(false);
        if started {
            self.gesture = Some(id);
        }
        started
    }

    pub fn update_rotate(&mut self, id: AssetId, pointer: Point) {
        self.with_asset(id, |editable, view| editable.update_rotate(pointer, view.viewport, view));
    }

    pub fn end_rotate(&mut self, id: AssetId) {
        self.with_asset(id, |editable, view| editable.end_rotate(view.viewport, view));
        self.gesture = None;
    }

    /// Find what a canvas point lands on.
    ///
    /// Handles of the selected asset win, then the topmost body. Among equal
    /// layers the asset added last is on top.
    pub fn hit_test(&self, point: Point) -> Option<(AssetId, HandleKind)> {
        let zoom = self.viewport.zoom;
        let mut candidates: Vec<&EditableAsset> =
            self.items.iter().chain(self.messages.iter()).collect();
        candidates.reverse();
        candidates.sort_by_key(|a| Reverse(a.asset().layer));

        let handle = candidates
            .iter()
            .filter(|a| a.is_active())
            .find_map(|a| match a.hit_test(point, zoom) {
                Some(HandleKind::Body) | None => None,
                Some(kind) => Some((a.id(), kind)),
            });
        handle.or_else(|| {
            candidates
                .iter()
                .find(|a| a.hit_test(point, zoom).is_some())
                .map(|a| (a.id(), HandleKind::Body))
        })
    }

    /// Route a pointer-down in screen coordinates.
    ///
    /// A body click selects an idle asset and starts dragging a selected one;
    /// handles start their gesture or act right away. Missing everything
    /// counts as a click on the empty canvas.
    pub fn pointer_down(&mut self, pointer: Point) -> Option<(AssetId, HandleKind)> {
        let point = self.viewport.screen_to_canvas(pointer);
        let Some((id, kind)) = self.hit_test(point) else {
            self.click_empty();
            return None;
        };
        log::debug!("Pointer down on {:?} of {}", kind, id);

        match kind {
            HandleKind::Body => {
                if self.get(id).is_some_and(EditableAsset::is_active) {
                    self.begin_drag(id, kind, pointer);
                } else {
                    self.activate(id);
                }
            }
            HandleKind::Scale => {
                self.begin_scale(id, pointer);
            }
            HandleKind::Rotate => {
                self.begin_rotate(id, pointer);
            }
            HandleKind::Delete => {
                self.delete_asset(id);
            }
            HandleKind::Layer => {
                self.relayer_asset(id);
            }
        }
        Some((id, kind))
    }

    /// Route a pointer move to the gesture in flight, if any.
    pub fn pointer_move(&mut self, pointer: Point) {
        let Some(id) = self.gesture else {
            return;
        };
        match self.get(id).map(EditableAsset::state) {
            Some(WidgetState::Dragging) => self.update_drag(id, pointer),
            Some(WidgetState::Scaling) => self.update_scale(id, pointer),
            Some(WidgetState::Rotating) => self.update_rotate(id, pointer),
            _ => self.gesture = None,
        }
    }

    /// Finish the gesture in flight, if any.
    pub fn pointer_up(&mut self) {
        let Some(id) = self.gesture.take() else {
            return;
        };
        match self.get(id).map(EditableAsset::state) {
            Some(WidgetState::Dragging) => self.end_drag(id),
            Some(WidgetState::Scaling) => self.end_scale(id),
            Some(WidgetState::Rotating) => self.end_rotate(id),
            _ => {}
        }
    }

    /// Run pending reverts, then refresh the validity of every measured,
    /// resolved asset not in the middle of a gesture.
    ///
    /// Returns the number of reverts that ran.
    pub fn settle(&mut self) -> usize {
        let mut reverted = 0;
        for list in [&mut self.items, &mut self.messages] {
            for index in 0..list.len() {
                let ran = visit(list, index, &self.viewport, &mut self.events, |editable, view| {
                    editable.settle(view)
                });
                if ran == Some(true) {
                    reverted += 1;
                }
            }
        }
        for list in [&mut self.items, &mut self.messages] {
            for index in 0..list.len() {
                visit(list, index, &self.viewport, &mut self.events, |editable, view| {
                    let settled = editable.pending().is_none() && !editable.state().is_manipulating();
                    if settled && editable.asset().is_measured() {
                        editable.revalidate(view);
                    }
                });
            }
        }
        if reverted > 0 {
            log::debug!("Settled {} reverted assets", reverted);
        }
        reverted
    }

    /// Complete an asset's media continuation.
    ///
    /// Items and messages are sized, selected and validated. The background
    /// only takes the metadata.
    pub fn apply_media(&mut self, id: AssetId, info: &MediaInfo) -> bool {
        if let Some(background) = self.background.as_mut().filter(|b| b.id() == id) {
            background.apply_metadata(info);
            return true;
        }
        let Some((kind, _)) = self.locate(id) else {
            log::debug!("Ignoring media for stale asset id {}", id);
            return false;
        };
        let min_dim = self.config.min_dim(kind);
        let max_dim = self.config.max_dim;
        let applied = self
            .with_asset(id, |editable, view| {
                editable.apply_media(info, min_dim, max_dim, view.viewport, view)
            })
            .is_some();
        self.deactivate_all_except(Some(id));
        self.active = true;
        applied
    }

    /// Resolve media for every asset waiting on it.
    ///
    /// Assets whose media cannot be resolved stay unmeasured and keep waiting.
    /// Returns the number of assets resolved.
    pub async fn resolve_media<R: MediaResolver + ?Sized>(&mut self, resolver: &R) -> usize {
        let waiting: Vec<(AssetId, String)> = self
            .assets()
            .filter(|a| a.pending() == Some(Pending::Resolve))
            .map(|a| (a.id(), a.asset().media_id.clone()))
            .collect();

        let mut resolved = 0;
        for (id, media_id) in waiting {
            match resolver.resolve(&media_id).await {
                Ok(info) => {
                    if self.apply_media(id, &info) {
                        resolved += 1;
                    }
                }
                Err(err) => log::warn!("Could not resolve media for {}: {}", id, err),
            }
        }
        resolved
    }

    /// Export every asset, numeric fields floored to 14 decimals.
    pub fn export(&self) -> SceneSnapshot {
        SceneSnapshot {
            background: self.background.as_ref().map(EditableAsset::snapshot),
            items: self.items.iter().map(EditableAsset::snapshot).collect(),
            messages: self.messages.iter().map(EditableAsset::snapshot).collect(),
        }
    }

    pub fn to_json(&self) -> SceneResult<String> {
        self.export().to_json()
    }

    /// Replace the scene's contents with a snapshot.
    ///
    /// Everything is cleared first so no state carries over; the loaded
    /// assets wait for their media like freshly added ones.
    pub fn load(&mut self, snapshot: &SceneSnapshot) {
        self.reset();
        let requests = snapshot
            .background
            .iter()
            .chain(snapshot.items.iter())
            .chain(snapshot.messages.iter())
            .map(AssetSnapshot::to_request);
        for request in requests {
            self.add_asset(request);
        }
        log::debug!("Loaded scene with {} assets", self.len());
    }

    pub fn load_json(&mut self, json: &str) -> SceneResult<()> {
        let snapshot = SceneSnapshot::from_json(json)?;
        self.load(&snapshot);
        Ok(())
    }

    /// Remove every asset.
    pub fn reset(&mut self) {
        self.background = None;
        self.items.clear();
        self.messages.clear();
        self.gesture = None;
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::PersistedState;
    use crate::media::MemoryMediaResolver;

    fn placed(kind: AssetType, source: &str, left: f64, top: f64) -> AssetRequest {
        AssetRequest::new(kind, source).with_state(PersistedState {
            left,
            top,
            scale: Some(0.5),
            ..Default::default()
        })
    }

    /// Add a 200x200 asset at scale 0.5 and resolve its media.
    fn add_resolved(scene: &mut Scene, kind: AssetType, source: &str, left: f64, top: f64) -> AssetId {
        let id = scene.add_asset(placed(kind, source, left, top)).unwrap();
        assert!(scene.apply_media(id, &MediaInfo::new(200.0, 200.0)));
        id
    }

    fn left_of(scene: &Scene, id: AssetId) -> f64 {
        scene.get(id).unwrap().asset().transform.left
    }

    #[test]
    fn test_instance_limit() {
        let mut scene = Scene::default();
        for _ in 0..5 {
            assert!(scene.add_asset(AssetRequest::new(AssetType::Item, "a.png")).is_some());
        }
        assert!(scene.add_asset(AssetRequest::new(AssetType::Item, "a.png")).is_none());
        assert_eq!(scene.items().len(), 5);
        assert_eq!(
            scene.drain_events(),
            vec![SceneEvent::LimitExceeded { source_ref: "a.png".to_string() }]
        );

        // Other sources and other collections are counted separately.
        assert!(scene.add_asset(AssetRequest::new(AssetType::Item, "b.png")).is_some());
        assert!(scene.add_asset(AssetRequest::new(AssetType::Message, "a.png")).is_some());
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_instance_limit_from_config() {
        let config = SceneConfig { max_instances: 1, ..Default::default() };
        let mut scene = Scene::new(config);
        assert!(scene.add_asset(AssetRequest::new(AssetType::Message, "m.png")).is_some());
        assert!(scene.add_asset(AssetRequest::new(AssetType::Message, "m.png")).is_none());
    }

    #[test]
    fn test_background_replaced() {
        let mut scene = Scene::default();
        let first = scene.add_asset(AssetRequest::new(AssetType::Background, "bg1.png")).unwrap();
        let second = scene.add_asset(AssetRequest::new(AssetType::Background, "bg2.png")).unwrap();
        assert!(scene.get(first).is_none());
        assert_eq!(scene.background().map(EditableAsset::id), Some(second));
        assert_eq!(scene.background().unwrap().asset().layer, 1);
        assert!(scene.check_asset(second));
        assert!(scene.items().is_empty());
    }

    #[test]
    fn test_new_assets_wait_for_media() {
        let mut scene = Scene::default();
        let id = scene.add_asset(AssetRequest::new(AssetType::Item, "a.png")).unwrap();
        assert_eq!(scene.get(id).unwrap().pending(), Some(Pending::Resolve));
        assert!(!scene.check_asset(id));
    }

    #[test]
    fn test_apply_media_selects_single_asset() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        assert_eq!(scene.active_asset(), Some(a));
        let b = add_resolved(&mut scene, AssetType::Item, "b.png", 500.0, 100.0);
        assert_eq!(scene.active_asset(), Some(b));
        assert!(!scene.get(a).unwrap().is_active());
        assert!(scene.is_active());
        assert!(scene.all_valid());
    }

    #[test]
    fn test_single_selection() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        let m = add_resolved(&mut scene, AssetType::Message, "m.png", 500.0, 100.0);
        assert!(scene.activate(a));
        assert!(!scene.get(m).unwrap().is_active());
        assert!(!scene.activate(a));
        assert_eq!(scene.active_asset(), Some(a));
    }

    #[test]
    fn test_drag_into_overlap_reverts_on_deselect() {
        let mut scene = Scene::default();
        // Boxes span [150, 250] and [550, 650] horizontally.
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        let b = add_resolved(&mut scene, AssetType::Item, "b.png", 500.0, 100.0);
        scene.drain_events();

        assert_eq!(scene.pointer_down(Point::new(600.0, 200.0)), Some((b, HandleKind::Body)));
        assert_eq!(scene.get(b).unwrap().state(), WidgetState::Dragging);
        scene.pointer_move(Point::new(250.0, 200.0));
        scene.pointer_up();

        assert!((left_of(&scene, b) - 150.0).abs() < f64::EPSILON);
        assert!(!scene.get(b).unwrap().is_valid());
        assert!(!scene.check_asset(b));
        assert!(!scene.all_valid());
        // The stationary asset now overlaps too.
        assert!(!scene.check_asset(a));

        scene.pointer_down(Point::new(1000.0, 600.0));
        assert!(!scene.is_active());
        assert!((left_of(&scene, b) - 500.0).abs() < f64::EPSILON);
        assert_eq!(scene.get(b).unwrap().pending(), Some(Pending::Revert));

        assert_eq!(scene.settle(), 1);
        assert!(scene.get(b).unwrap().is_valid());
        assert!(scene.all_valid());
        assert_eq!(
            scene.drain_events(),
            vec![
                SceneEvent::ValidityChanged { id: b, valid: false },
                SceneEvent::CollisionWarning,
                SceneEvent::ValidityChanged { id: b, valid: true },
            ]
        );
    }

    #[test]
    fn test_click_empty_without_invalid_assets() {
        let mut scene = Scene::default();
        add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        scene.drain_events();
        scene.click_empty();
        assert!(!scene.is_active());
        assert_eq!(scene.active_asset(), None);
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_first_click_selects_without_dragging() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        add_resolved(&mut scene, AssetType::Item, "b.png", 500.0, 100.0);

        assert_eq!(scene.pointer_down(Point::new(200.0, 200.0)), Some((a, HandleKind::Body)));
        assert_eq!(scene.get(a).unwrap().state(), WidgetState::Active);
        scene.pointer_move(Point::new(300.0, 300.0));
        scene.pointer_up();
        assert!((left_of(&scene, a) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_handles_route_gestures() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 400.0, 200.0);
        // Box spans [450, 550] x [250, 350].
        assert_eq!(scene.pointer_down(Point::new(551.0, 351.0)), Some((a, HandleKind::Scale)));
        assert_eq!(scene.get(a).unwrap().state(), WidgetState::Scaling);
        scene.pointer_move(Point::new(600.0, 400.0));
        scene.pointer_up();
        // Distance 100 * sqrt(2) over half diagonal 100 * sqrt(2).
        assert!((scene.get(a).unwrap().asset().transform.scale - 1.0).abs() < 1e-9);
        assert_eq!(scene.get(a).unwrap().state(), WidgetState::Active);

        // Corners now span [400, 600] x [200, 400]; rotate sits top-right.
        assert_eq!(scene.pointer_down(Point::new(600.0, 200.0)), Some((a, HandleKind::Rotate)));
        scene.pointer_move(Point::new(500.0, 450.0));
        scene.pointer_up();
        let expected = std::f64::consts::FRAC_PI_2 + std::f64::consts::FRAC_PI_4;
        assert!((scene.get(a).unwrap().asset().transform.rotation - expected).abs() < 1e-9);
    }

    #[test]
    fn test_delete_handle() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 400.0, 200.0);
        assert_eq!(scene.pointer_down(Point::new(450.0, 250.0)), Some((a, HandleKind::Delete)));
        assert!(scene.get(a).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_delete_requires_selection() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 400.0, 200.0);
        scene.click_empty();
        assert!(!scene.delete_asset(a));
        assert!(scene.remove_asset(a));
    }

    #[test]
    fn test_layer_handle() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        let b = add_resolved(&mut scene, AssetType::Item, "b.png", 400.0, 200.0);
        assert_eq!(scene.pointer_down(Point::new(450.0, 350.0)), Some((b, HandleKind::Layer)));
        assert_eq!(scene.get(b).unwrap().asset().layer, 999);
        assert_eq!(scene.get(a).unwrap().asset().layer, 1000);
    }

    #[test]
    fn test_relayer_compacts() {
        let mut scene = Scene::default();
        let ids: Vec<AssetId> = ["a", "b", "c"]
            .iter()
            .map(|s| scene.add_asset(AssetRequest::new(AssetType::Item, *s)).unwrap())
            .collect();

        scene.relayer_asset(ids[1]);
        scene.relayer_asset(ids[0]);
        scene.relayer_asset(ids[1]);
        let layers: Vec<i32> = scene.items().iter().map(|a| a.asset().layer).collect();
        assert_eq!(layers, vec![999, 998, 1000]);

        // Gaps close, ties stay tied, order is kept.
        for (editable, layer) in scene.items.iter_mut().zip([970, 990, 990]) {
            editable.set_layer(layer);
        }
        scene.relayer(AssetType::Item);
        let layers: Vec<i32> = scene.items().iter().map(|a| a.asset().layer).collect();
        assert_eq!(layers, vec![999, 1000, 1000]);
    }

    #[test]
    fn test_relayer_single_message() {
        let mut scene = Scene::default();
        let m = scene.add_asset(AssetRequest::new(AssetType::Message, "m.png")).unwrap();
        scene.relayer_asset(m);
        assert_eq!(scene.get(m).unwrap().asset().layer, 10000);
    }

    #[test]
    fn test_hit_test_topmost_body() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        let b = add_resolved(&mut scene, AssetType::Item, "b.png", 150.0, 100.0);
        scene.click_empty();
        // Both cover (220, 200); equal layers, so the later one is on top.
        assert_eq!(scene.hit_test(Point::new(220.0, 200.0)), Some((b, HandleKind::Body)));
        scene.relayer_asset(b);
        assert_eq!(scene.hit_test(Point::new(220.0, 200.0)), Some((a, HandleKind::Body)));
        assert_eq!(scene.hit_test(Point::new(900.0, 600.0)), None);
    }

    #[test]
    fn test_pointer_with_zoom() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        scene.set_zoom(2.0);
        scene.set_offset(Vec2::new(10.0, 10.0));

        // Canvas (200, 200) is screen (410, 410).
        assert_eq!(scene.pointer_down(Point::new(410.0, 410.0)), Some((a, HandleKind::Body)));
        scene.pointer_move(Point::new(430.0, 450.0));
        scene.pointer_up();
        let t = scene.get(a).unwrap().asset().transform;
        assert!((t.left - 110.0).abs() < 1e-9);
        assert!((t.top - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_ids_are_noops() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        assert!(scene.remove_asset(a));

        assert!(!scene.remove_asset(a));
        assert!(!scene.activate(a));
        assert!(!scene.deactivate(a));
        assert!(!scene.begin_drag(a, HandleKind::Body, Point::ZERO));
        scene.update_drag(a, Point::ZERO);
        scene.end_drag(a);
        assert!(!scene.begin_scale(a, Point::ZERO));
        assert!(!scene.begin_rotate(a, Point::ZERO));
        assert!(!scene.relayer_asset(a));
        assert!(!scene.check_asset(a));
        assert!(!scene.apply_media(a, &MediaInfo::new(10.0, 10.0)));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_bounds_follow_viewport() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 1100.0, 100.0);
        // Box spans [1150, 1250]; shrink the canvas under it.
        assert!(scene.check_asset(a));
        scene.set_viewport_size(1000.0, 720.0);
        assert!(!scene.check_asset(a));
        scene.settle();
        assert!(!scene.get(a).unwrap().is_valid());

        scene.set_viewport_size(0.0, 0.0);
        assert!(scene.check_asset(a));
    }

    #[test]
    fn test_settle_refreshes_stale_validity() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        // Overlaps a; a was validated before b existed.
        let b = add_resolved(&mut scene, AssetType::Item, "b.png", 150.0, 100.0);
        assert!(scene.get(a).unwrap().is_valid());
        assert!(!scene.get(b).unwrap().is_valid());

        scene.settle();
        assert!(!scene.get(a).unwrap().is_valid());
        assert!(!scene.all_valid());
    }

    #[test]
    fn test_never_valid_asset_keeps_placement_on_deselect() {
        let mut scene = Scene::default();
        let a = scene.add_asset(AssetRequest::new(AssetType::Item, "a.png")).unwrap();
        assert!(scene.apply_media(a, &MediaInfo::new(200.0, 200.0)));
        // Centered on top of a and clamped to 400/2000.
        let b = scene.add_asset(AssetRequest::new(AssetType::Item, "b.png")).unwrap();
        assert!(scene.apply_media(b, &MediaInfo::new(2000.0, 2000.0)));
        let editable = scene.get(b).unwrap();
        assert!(!editable.is_valid());
        assert_eq!(editable.last_valid(), None);
        let placed = editable.asset().transform;
        assert!((placed.left + 360.0).abs() < f64::EPSILON);
        assert!((placed.top + 640.0).abs() < f64::EPSILON);

        scene.click_empty();
        scene.settle();
        let editable = scene.get(b).unwrap();
        assert_eq!(editable.asset().transform, placed);
        assert!((editable.asset().transform.scale - 0.2).abs() < f64::EPSILON);
        assert_eq!(editable.pending(), None);
        assert!(!editable.is_valid());
    }

    #[test]
    fn test_background_is_not_an_item() {
        let mut scene = Scene::default();
        let bg = scene.add_asset(AssetRequest::new(AssetType::Background, "bg.png")).unwrap();
        let a = scene.add_asset(placed(AssetType::Item, "a.png", 100.0, 100.0)).unwrap();
        scene.items[0].set_layer(7);

        scene.relayer(AssetType::Background);
        assert_eq!(scene.get(a).unwrap().asset().layer, 7);
        assert!(!scene.relayer_asset(bg));
        assert!(!scene.activate(bg));
        assert!(!scene.begin_drag(bg, HandleKind::Body, Point::ZERO));
        assert_eq!(scene.items().len(), 1);
        assert_eq!(scene.background().unwrap().asset().layer, 1);

        assert!(scene.remove_asset(bg));
        assert!(scene.background().is_none());
        assert_eq!(scene.items().len(), 1);
    }

    #[test]
    fn test_overlap_allowed() {
        let mut scene = Scene::default();
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        let b = scene
            .add_asset(placed(AssetType::Item, "b.png", 150.0, 100.0).with_overlap(true))
            .unwrap();
        scene.apply_media(b, &MediaInfo::new(200.0, 200.0));
        scene.settle();
        assert!(scene.get(a).unwrap().is_valid());
        assert!(scene.get(b).unwrap().is_valid());

        // Items and messages never collide with each other.
        let m = add_resolved(&mut scene, AssetType::Message, "m.png", 100.0, 100.0);
        assert!(scene.get(m).unwrap().is_valid());
    }

    #[test]
    fn test_export_and_load() {
        let mut scene = Scene::default();
        let bg = scene.add_asset(AssetRequest::new(AssetType::Background, "bg.png")).unwrap();
        scene.apply_media(
            bg,
            &MediaInfo {
                mime_type: Some("image/jpeg".to_string()),
                ..MediaInfo::new(1280.0, 720.0)
            },
        );
        let a = add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        add_resolved(&mut scene, AssetType::Message, "m.png", 500.0, 300.0);
        scene.relayer_asset(a);

        let snapshot = scene.export();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.background.as_ref().and_then(|b| b.mime_type.as_deref()),
            Some("image/jpeg")
        );
        assert_eq!(snapshot.items[0].layer, 1000);
        assert_eq!(snapshot.items[0].corners.len(), 4);
        assert!(snapshot.items[0].valid);

        let json = scene.to_json().unwrap();
        let mut loaded = Scene::default();
        loaded.add_asset(AssetRequest::new(AssetType::Item, "stale.png"));
        loaded.load_json(&json).unwrap();

        assert_eq!(loaded.len(), 3);
        assert!(loaded.items().iter().all(|a| a.asset().source_ref == "a.png"));
        let item = &loaded.items()[0];
        assert_ne!(item.id(), a);
        assert_eq!(item.pending(), Some(Pending::Resolve));
        assert!((item.asset().transform.left - 100.0).abs() < f64::EPSILON);
        assert!((item.asset().transform.scale - 0.5).abs() < f64::EPSILON);
        assert_eq!(loaded.messages()[0].asset().layer, 10000);
        assert!(!loaded.is_active());
    }

    #[test]
    fn test_load_enforces_limits() {
        let snapshot = SceneSnapshot {
            items: (0..7)
                .map(|_| AssetSnapshot {
                    source_ref: "a.png".to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let mut scene = Scene::default();
        scene.load(&snapshot);
        assert_eq!(scene.items().len(), 5);
        assert_eq!(scene.drain_events().len(), 2);
    }

    #[test]
    fn test_snapshot_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scene.json");
        let mut scene = Scene::default();
        add_resolved(&mut scene, AssetType::Item, "a.png", 100.0, 100.0);
        scene.export().save(&path).unwrap();

        let snapshot = SceneSnapshot::from_path(&path).unwrap();
        assert_eq!(snapshot, scene.export());

        let missing = SceneSnapshot::from_path(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(crate::error::SceneError::Io(_))));
    }

    #[test]
    fn test_snapshot_json_errors() {
        assert!(SceneSnapshot::from_json("[1, 2").is_err());
        let empty = SceneSnapshot::from_json("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_resolve_media() {
        let mut scene = Scene::default();
        let a = scene.add_asset(AssetRequest::new(AssetType::Item, "a.png")).unwrap();
        let missing = scene.add_asset(AssetRequest::new(AssetType::Item, "missing.png")).unwrap();
        let bg = scene.add_asset(AssetRequest::new(AssetType::Background, "bg.png")).unwrap();

        let mut resolver = MemoryMediaResolver::new();
        resolver.insert("a.png", MediaInfo::new(200.0, 200.0));
        resolver.insert("bg.png", MediaInfo::new(1280.0, 720.0));

        let resolved = pollster::block_on(scene.resolve_media(&resolver));
        assert_eq!(resolved, 2);

        let item = scene.get(a).unwrap();
        assert_eq!(item.pending(), None);
        assert!(item.is_valid());
        // Centered on the 1280x720 canvas.
        assert!((item.asset().transform.left - 540.0).abs() < f64::EPSILON);
        assert_eq!(scene.get(bg).unwrap().pending(), None);

        let unresolved = scene.get(missing).unwrap();
        assert_eq!(unresolved.pending(), Some(Pending::Resolve));
        assert!(!unresolved.asset().is_measured());

        // Nothing left to resolve except the missing one.
        assert_eq!(pollster::block_on(scene.resolve_media(&resolver)), 0);
    }

    #[test]
    fn test_media_id_used_for_resolution() {
        let mut scene = Scene::default();
        let mut request = AssetRequest::new(AssetType::Message, "sticker-7");
        request.media_id = Some("media/7".to_string());
        let id = scene.add_asset(request).unwrap();

        let mut resolver = MemoryMediaResolver::new();
        resolver.insert(
            "media/7",
            MediaInfo {
                check: Some("abc".to_string()),
                ..MediaInfo::new(80.0, 40.0)
            },
        );
        assert_eq!(pollster::block_on(scene.resolve_media(&resolver)), 1);
        let asset = scene.get(id).unwrap().asset();
        assert_eq!(asset.check.as_deref(), Some("abc"));
        // min 40/40 = 1.0 clamps the default scale up.
        assert!((asset.transform.scale - 1.0).abs() < f64::EPSILON);
    }
}
