//! The selection popup: card states, hover tracking and lifecycle control.

mod card;
mod controller;
mod hover;
mod indicator;
mod surface;

pub use card::{CardState, RequestToken};
pub use controller::{ErrorLink, PopupController, PopupHandle, PopupServices};
pub use hover::{is_inside_popup, HoverTracker};
pub use indicator::ProcessIndicator;
pub use surface::{
    AnchorTracker, EditingContext, PopupPosition, PopupSurface, PopupSurfaceFactory,
};
