use std::cell::Cell;

use crate::geometry::Bounds;
use crate::input::{PointerEvent, PointerEventKind, PointerTarget};

/// Hit test for the popup's contextual actions.
///
/// A source that is no longer visible counts as inside so the actions do not
/// flicker while the overlay is being torn down.
pub fn is_inside_popup(event: &PointerEvent, content_bounds: Option<Bounds>) -> bool {
    match event.target {
        PointerTarget::PinControl => true,
        _ if !event.target_visible => true,
        PointerTarget::Menu => false,
        PointerTarget::PopupContent => true,
        PointerTarget::Other => {
            content_bounds.is_some_and(|bounds| bounds.contains(event.screen_point))
        }
    }
}

/// Remembers which side of the popup boundary the pointer was last seen on.
#[derive(Debug, Default)]
pub struct HoverTracker {
    inside: Cell<bool>,
}

impl HoverTracker {
    pub fn is_inside(&self) -> bool {
        self.inside.get()
    }

    /// Feeds one pointer event; returns the new side only when it changed.
    pub fn observe(&self, event: &PointerEvent, content_bounds: Option<Bounds>) -> Option<bool> {
        if event.kind != PointerEventKind::Moved {
            return None;
        }
        let inside = is_inside_popup(event, content_bounds);
        (self.inside.replace(inside) != inside).then_some(inside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    const CONTENT: Bounds = Bounds::new(100, 100, 200, 80);

    fn at(target: PointerTarget, x: i32, y: i32) -> PointerEvent {
        PointerEvent::moved(target, Point::new(x, y))
    }

    #[test]
    fn hit_test_follows_target_rules_before_geometry() {
        let far = (0, 0);
        assert!(is_inside_popup(
            &at(PointerTarget::PinControl, far.0, far.1),
            None
        ));
        assert!(is_inside_popup(
            &at(PointerTarget::Menu, 150, 150).with_hidden_target(),
            Some(CONTENT)
        ));
        assert!(!is_inside_popup(
            &at(PointerTarget::Menu, 150, 150),
            Some(CONTENT)
        ));
        assert!(is_inside_popup(
            &at(PointerTarget::PopupContent, far.0, far.1),
            None
        ));
    }

    #[test]
    fn hit_test_falls_back_to_content_geometry() {
        assert!(is_inside_popup(&at(PointerTarget::Other, 150, 150), Some(CONTENT)));
        assert!(!is_inside_popup(&at(PointerTarget::Other, 50, 50), Some(CONTENT)));
        assert!(!is_inside_popup(&at(PointerTarget::Other, 150, 150), None));
    }

    #[test]
    fn tracker_reports_only_boundary_crossings() {
        let tracker = HoverTracker::default();
        let outside = at(PointerTarget::Other, 0, 0);
        let inside = at(PointerTarget::Other, 150, 150);

        assert_eq!(tracker.observe(&outside, Some(CONTENT)), None);
        assert_eq!(tracker.observe(&inside, Some(CONTENT)), Some(true));
        assert_eq!(tracker.observe(&inside, Some(CONTENT)), None);
        assert_eq!(tracker.observe(&outside, Some(CONTENT)), Some(false));
        assert!(!tracker.is_inside());
    }

    #[test]
    fn non_motion_events_are_ignored() {
        let tracker = HoverTracker::default();
        let mut press = at(PointerTarget::PinControl, 0, 0);
        press.kind = PointerEventKind::Pressed;

        assert_eq!(tracker.observe(&press, None), None);
        assert!(!tracker.is_inside());
    }
}
