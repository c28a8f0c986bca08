//! Interactive asset widgets.
//!
//! Assets remain pure data. An [`EditableAsset`] wraps one with its
//! interaction state, the drag/scale/rotate capabilities that turn pointer
//! input into transform updates, and the one continuation it may be waiting on.

mod capability;
mod editable;
mod handles;
mod state;

pub use capability::{
    Capability, DragCapability, GestureContext, RotateCapability, ScaleCapability,
};
pub use editable::{EditableAsset, PlacementCheck};
pub use handles::{get_handles, hit_test, Handle, HandleKind, HANDLE_HIT_TOLERANCE, HANDLE_SIZE};
pub use state::{Pending, WidgetState};
