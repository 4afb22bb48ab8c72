//! Host-side collaborators the popup drives but does not implement.

use std::rc::Rc;

use crate::dispose::Disposable;
use crate::geometry::{Bounds, Point};
use crate::scope::ScopeId;
use crate::translator::Translation;

use super::card::CardState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupPosition {
    Above,
    #[default]
    Below,
    AtLeft,
    AtRight,
}

/// Opaque anchor the overlay follows. Owned by the popup once shown.
#[derive(Debug, Clone)]
pub struct AnchorTracker {
    point: Point,
    disposable: Disposable,
}

impl AnchorTracker {
    pub fn new(point: Point) -> Self {
        Self {
            point,
            disposable: Disposable::new("anchor-tracker"),
        }
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn disposable(&self) -> &Disposable {
        &self.disposable
    }
}

/// The editor session a selection came from.
pub trait EditingContext {
    fn scope(&self) -> ScopeId;

    fn scroll_to_caret(&self);

    /// Width of the host window, used only to size the overlay.
    fn host_window_width(&self) -> Option<u32>;
}

/// Rendering side of one popup. Calls arrive on the UI thread only.
pub trait PopupSurface {
    fn show(&self, anchor: &AnchorTracker, position: PopupPosition);

    /// May synchronously re-enter the popup's `hide`; the popup tolerates that.
    fn hide(&self);

    fn show_card(&self, card: CardState);

    fn set_translation(&self, translation: &Translation);

    fn set_error_message(&self, message: &str);

    /// Toggles the pin and copy-error actions.
    fn set_actions_visible(&self, visible: bool);

    /// Screen bounds of the content area, `None` while not on screen.
    fn content_bounds(&self) -> Option<Bounds>;

    fn revalidate(&self) {}
}

pub trait PopupSurfaceFactory {
    fn create_surface(&self, editor: &dyn EditingContext, max_width: u32) -> Rc<dyn PopupSurface>;
}
