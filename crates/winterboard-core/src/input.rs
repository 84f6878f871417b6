//! Pointer input model and routing.
//!
//! Every pointer event entering the engine is normalized into a
//! [`PointerInput`] carrying an explicit millisecond timestamp, then passed
//! through the palm rejection filter and routed either to the gesture
//! recognizer (touch) or straight to the drawing pipeline (pen/mouse).

use crate::gestures::GestureRecognizer;
use crate::palm::{PalmFilter, RejectReason};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Class of the device producing a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Mouse,
    Pen,
    Touch,
}

/// Lifecycle phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A normalized pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Platform pointer id; reused across gestures.
    pub id: u64,
    pub kind: PointerKind,
    pub phase: PointerPhase,
    /// Position in screen pixels, relative to the canvas origin.
    pub position: Point,
    /// Contact ellipse width in pixels (0 for mouse/pen).
    pub contact_width: f64,
    /// Contact ellipse height in pixels (0 for mouse/pen).
    pub contact_height: f64,
    /// Event time in milliseconds.
    pub timestamp_ms: u64,
}

impl PointerInput {
    /// Convenience constructor for a touch contact.
    pub fn touch(id: u64, phase: PointerPhase, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            id,
            kind: PointerKind::Touch,
            phase,
            position: Point::new(x, y),
            contact_width: 8.0,
            contact_height: 8.0,
            timestamp_ms,
        }
    }

    /// Convenience constructor for a pen contact.
    pub fn pen(id: u64, phase: PointerPhase, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            id,
            kind: PointerKind::Pen,
            phase,
            position: Point::new(x, y),
            contact_width: 0.0,
            contact_height: 0.0,
            timestamp_ms,
        }
    }
}

/// Where a pointer event ended up after filtering and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    /// Dropped by the palm rejection filter.
    Rejected(RejectReason),
    /// Consumed by the gesture recognizer.
    Gesture,
    /// Available to the drawing/selection pipeline.
    Draw,
}

/// Applies palm rejection, then routes pointers by class and count.
///
/// Pen and mouse pointers bypass gesture logic entirely; accepted touch
/// pointers feed the recognizer, which claims them once more than one is
/// down or an edge/long-press watch resolves.
#[derive(Debug, Default)]
pub struct InputRouter {
    pub palm: PalmFilter,
    pub gestures: GestureRecognizer,
}

impl InputRouter {
    pub fn new(palm: PalmFilter, gestures: GestureRecognizer) -> Self {
        Self { palm, gestures }
    }

    /// Process one pointer event, returning where it was routed.
    pub fn handle(&mut self, input: &PointerInput) -> InputDisposition {
        if let Some(reason) = self.palm.filter_event(input) {
            log::debug!("pointer {} rejected: {:?}", input.id, reason);
            return InputDisposition::Rejected(reason);
        }

        match input.kind {
            PointerKind::Pen | PointerKind::Mouse => InputDisposition::Draw,
            PointerKind::Touch => {
                self.gestures.on_pointer(input);
                if self.gestures.is_gesture_active() {
                    InputDisposition::Gesture
                } else {
                    InputDisposition::Draw
                }
            }
        }
    }

    /// Cancel timers and tracked pointers (listener detach).
    pub fn detach(&mut self) {
        self.palm.reset();
        self.gestures.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_routes_to_draw() {
        let mut router = InputRouter::default();
        let disposition = router.handle(&PointerInput::pen(1, PointerPhase::Down, 100.0, 100.0, 0));
        assert_eq!(disposition, InputDisposition::Draw);
    }

    #[test]
    fn test_touch_after_pen_is_rejected() {
        let mut router = InputRouter::default();
        router.handle(&PointerInput::pen(1, PointerPhase::Down, 100.0, 100.0, 0));
        let disposition =
            router.handle(&PointerInput::touch(2, PointerPhase::Down, 200.0, 200.0, 100));
        assert_eq!(
            disposition,
            InputDisposition::Rejected(RejectReason::PenActive)
        );
    }

    #[test]
    fn test_rejection_reason_reported() {
        let mut router = InputRouter::default();
        let mut palm = PointerInput::touch(1, PointerPhase::Down, 200.0, 200.0, 0);
        palm.contact_width = 30.0;
        assert_eq!(
            router.handle(&palm),
            InputDisposition::Rejected(RejectReason::LargeContact)
        );
    }

    #[test]
    fn test_two_touches_route_to_gesture() {
        let mut router = InputRouter::default();
        router.gestures.set_canvas_size(800.0, 600.0);
        router.handle(&PointerInput::touch(1, PointerPhase::Down, 300.0, 300.0, 0));
        let disposition =
            router.handle(&PointerInput::touch(2, PointerPhase::Down, 400.0, 300.0, 10));
        assert_eq!(disposition, InputDisposition::Gesture);
    }

    #[test]
    fn test_single_touch_left_to_drawing() {
        let mut router = InputRouter::default();
        router.gestures.set_canvas_size(800.0, 600.0);
        let disposition =
            router.handle(&PointerInput::touch(1, PointerPhase::Down, 300.0, 300.0, 0));
        assert_eq!(disposition, InputDisposition::Draw);
        // No gesture events were produced for a lone mid-canvas touch
        assert!(router.gestures.poll_events().is_empty());
    }
}
