//! Widget state definitions.

/// The interaction state of an editable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    /// Not selected. No handles, no gestures.
    #[default]
    Idle,
    /// Selected and showing handles.
    Active,
    /// The body is being dragged.
    Dragging,
    /// The scale handle is being dragged.
    Scaling,
    /// The rotate handle is being dragged.
    Rotating,
}

impl WidgetState {
    /// Check if the asset is selected, with or without a gesture in flight.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Check if a gesture is in flight.
    pub fn is_manipulating(&self) -> bool {
        matches!(self, Self::Dragging | Self::Scaling | Self::Rotating)
    }
}

/// Follow-up work an asset is waiting on.
///
/// An asset holds at most one; a new one replaces the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Re-validate after a revert on deactivation.
    Revert,
    /// Waiting for media metadata.
    Resolve,
}
