//! Palm rejection for tablet/stylus input.
//!
//! When a pen is active (or was recently), touch contacts are rejected so a
//! resting palm does not leave marks. Large contacts, crowded contacts and
//! bezel-edge touches are rejected on their own merits.

use crate::input::{PointerInput, PointerKind, PointerPhase};
use crate::storage::SettingsStore;
use serde::{Deserialize, Serialize};

/// How long after pen-up touch input stays rejected.
pub const PEN_TIMEOUT_MS: u64 = 500;
/// Contact ellipse size above which a touch is treated as a palm.
pub const LARGE_CONTACT_RADIUS: f64 = 20.0;
/// Maximum number of simultaneous touches accepted in auto mode.
pub const MAX_SIMULTANEOUS_TOUCHES: u32 = 2;
/// Bezel margin within which touches are treated as a resting palm.
pub const EDGE_MARGIN_PX: f64 = 30.0;

/// Settings key under which the mode is persisted.
pub const MODE_SETTINGS_KEY: &str = "palm_rejection.mode";

/// Rejection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PalmRejectionMode {
    /// Reject touch only while a pen is active or was recently.
    #[default]
    Auto,
    /// Reject all touch input.
    Always,
    /// Accept all touch input.
    Never,
}

/// Why a touch was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    PenActive,
    LargeContact,
    TooManyTouches,
    EdgeTouch,
    ModeAlways,
}

/// Palm rejection state machine.
///
/// Time never comes from the ambient clock: decisions use the timestamp on
/// the pointer event, so tests drive the machine deterministically.
#[derive(Debug, Clone, Default)]
pub struct PalmFilter {
    mode: PalmRejectionMode,
    pen_active: bool,
    /// A pen has been seen this session; auto mode only arms after this.
    pen_detected: bool,
    last_pen_ms: u64,
    active_touches: u32,
    /// Canvas size in pixels, for edge detection. Unset disables edge checks.
    canvas_size: Option<(f64, f64)>,
}

impl PalmFilter {
    /// Create a filter with the given mode.
    pub fn new(mode: PalmRejectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Create a filter with the mode loaded from the settings port.
    ///
    /// Missing or unrecognized values fall back to `Auto`.
    pub fn from_settings(store: &dyn SettingsStore) -> Self {
        let mode = match store.get(MODE_SETTINGS_KEY).as_deref() {
            Some("auto") | None => PalmRejectionMode::Auto,
            Some("always") => PalmRejectionMode::Always,
            Some("never") => PalmRejectionMode::Never,
            Some(other) => {
                log::warn!("Unrecognized palm rejection mode {:?}, using auto", other);
                PalmRejectionMode::Auto
            }
        };
        Self::new(mode)
    }

    /// Current mode.
    pub fn mode(&self) -> PalmRejectionMode {
        self.mode
    }

    /// Change the mode and persist it through the settings port.
    pub fn set_mode(&mut self, mode: PalmRejectionMode, store: &dyn SettingsStore) {
        self.mode = mode;
        let raw = match mode {
            PalmRejectionMode::Auto => "auto",
            PalmRejectionMode::Always => "always",
            PalmRejectionMode::Never => "never",
        };
        if let Err(e) = store.set(MODE_SETTINGS_KEY, raw) {
            log::warn!("Failed to persist palm rejection mode: {}", e);
        }
    }

    /// Record the canvas size used for edge-touch detection.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_size = Some((width, height));
    }

    /// Whether a pen is currently down.
    pub fn is_pen_active(&self) -> bool {
        self.pen_active
    }

    /// Number of touches currently tracked.
    pub fn active_touches(&self) -> u32 {
        self.active_touches
    }

    /// Mark the pen as down.
    pub fn on_pen_down(&mut self, now_ms: u64) {
        self.pen_active = true;
        self.pen_detected = true;
        self.last_pen_ms = now_ms;
    }

    /// Mark the pen as lifted; touch stays rejected for `PEN_TIMEOUT_MS`.
    pub fn on_pen_up(&mut self, now_ms: u64) {
        self.pen_active = false;
        self.last_pen_ms = now_ms;
    }

    /// Decide whether an event should be rejected, without mutating state.
    ///
    /// Pen and mouse events are never rejected.
    pub fn should_reject(&self, input: &PointerInput) -> Option<RejectReason> {
        if input.kind != PointerKind::Touch {
            return None;
        }

        match self.mode {
            PalmRejectionMode::Never => None,
            PalmRejectionMode::Always => Some(RejectReason::ModeAlways),
            PalmRejectionMode::Auto => {
                if self.pen_active {
                    return Some(RejectReason::PenActive);
                }
                let since_pen = input.timestamp_ms.saturating_sub(self.last_pen_ms);
                if self.pen_detected && since_pen < PEN_TIMEOUT_MS {
                    return Some(RejectReason::PenActive);
                }
                if input.contact_width > LARGE_CONTACT_RADIUS
                    || input.contact_height > LARGE_CONTACT_RADIUS
                {
                    return Some(RejectReason::LargeContact);
                }
                if self.active_touches > MAX_SIMULTANEOUS_TOUCHES {
                    return Some(RejectReason::TooManyTouches);
                }
                if let Some((width, height)) = self.canvas_size {
                    let p = input.position;
                    if p.x < EDGE_MARGIN_PX
                        || p.y < EDGE_MARGIN_PX
                        || p.x > width - EDGE_MARGIN_PX
                        || p.y > height - EDGE_MARGIN_PX
                    {
                        return Some(RejectReason::EdgeTouch);
                    }
                }
                None
            }
        }
    }

    /// Process an event: track pen state and touch count, then decide.
    ///
    /// Returns the rejection reason, or `None` if the event is allowed
    /// through.
    pub fn filter_event(&mut self, input: &PointerInput) -> Option<RejectReason> {
        match (input.kind, input.phase) {
            (PointerKind::Pen, PointerPhase::Down) => self.on_pen_down(input.timestamp_ms),
            (PointerKind::Pen, PointerPhase::Up) | (PointerKind::Pen, PointerPhase::Cancel) => {
                self.on_pen_up(input.timestamp_ms)
            }
            (PointerKind::Touch, PointerPhase::Down) => {
                self.active_touches += 1;
            }
            (PointerKind::Touch, PointerPhase::Up) | (PointerKind::Touch, PointerPhase::Cancel) => {
                self.active_touches = self.active_touches.saturating_sub(1);
            }
            _ => {}
        }

        self.should_reject(input)
    }

    /// Clear transient state (pen down flag, touch count).
    pub fn reset(&mut self) {
        self.pen_active = false;
        self.active_touches = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn touch_at(ms: u64) -> PointerInput {
        PointerInput::touch(7, PointerPhase::Down, 400.0, 300.0, ms)
    }

    #[test]
    fn test_pen_never_rejected() {
        let filter = PalmFilter::new(PalmRejectionMode::Always);
        let pen = PointerInput::pen(1, PointerPhase::Down, 10.0, 10.0, 0);
        assert_eq!(filter.should_reject(&pen), None);
    }

    #[test]
    fn test_mouse_never_rejected() {
        let filter = PalmFilter::new(PalmRejectionMode::Always);
        let mouse = PointerInput {
            kind: PointerKind::Mouse,
            ..PointerInput::touch(1, PointerPhase::Down, 10.0, 10.0, 0)
        };
        assert_eq!(filter.should_reject(&mouse), None);
    }

    #[test]
    fn test_touch_rejected_while_pen_down() {
        let mut filter = PalmFilter::new(PalmRejectionMode::Auto);
        filter.on_pen_down(1000);
        assert_eq!(
            filter.should_reject(&touch_at(1100)),
            Some(RejectReason::PenActive)
        );
    }

    #[test]
    fn test_touch_rejected_within_pen_timeout() {
        let mut filter = PalmFilter::new(PalmRejectionMode::Auto);
        filter.on_pen_down(1000);
        filter.on_pen_up(1200);
        // 400 ms after pen-up: still inside the 500 ms window
        assert_eq!(
            filter.should_reject(&touch_at(1600)),
            Some(RejectReason::PenActive)
        );
        // 600 ms after pen-up: accepted again
        assert_eq!(filter.should_reject(&touch_at(1800)), None);
    }

    #[test]
    fn test_large_contact_rejected() {
        let filter = PalmFilter::new(PalmRejectionMode::Auto);
        let mut palm = touch_at(0);
        palm.contact_width = 30.0;
        assert_eq!(
            filter.should_reject(&palm),
            Some(RejectReason::LargeContact)
        );

        let mut fingertip = touch_at(0);
        fingertip.contact_width = 5.0;
        fingertip.contact_height = 5.0;
        assert_eq!(filter.should_reject(&fingertip), None);
    }

    #[test]
    fn test_too_many_touches() {
        let mut filter = PalmFilter::new(PalmRejectionMode::Auto);
        let results: Vec<_> = (0..4u64)
            .map(|id| {
                let t = PointerInput::touch(id, PointerPhase::Down, 400.0, 300.0, 0);
                filter.filter_event(&t)
            })
            .collect();
        // Two fingers are fine; the third pushes the count over the limit
        assert_eq!(results[0], None);
        assert_eq!(results[1], None);
        assert_eq!(results[2], Some(RejectReason::TooManyTouches));
        assert_eq!(results[3], Some(RejectReason::TooManyTouches));
    }

    #[test]
    fn test_edge_touch_rejected() {
        let mut filter = PalmFilter::new(PalmRejectionMode::Auto);
        filter.set_canvas_size(800.0, 600.0);
        let edge = PointerInput::touch(1, PointerPhase::Down, 5.0, 300.0, 0);
        assert_eq!(filter.should_reject(&edge), Some(RejectReason::EdgeTouch));
        let inner = PointerInput::touch(1, PointerPhase::Down, 100.0, 300.0, 0);
        assert_eq!(filter.should_reject(&inner), None);
    }

    #[test]
    fn test_always_mode_rejects_touch() {
        let filter = PalmFilter::new(PalmRejectionMode::Always);
        assert_eq!(
            filter.should_reject(&touch_at(0)),
            Some(RejectReason::ModeAlways)
        );
    }

    #[test]
    fn test_never_mode_accepts_everything() {
        let mut filter = PalmFilter::new(PalmRejectionMode::Never);
        filter.on_pen_down(0);
        let mut palm = touch_at(10);
        palm.contact_width = 50.0;
        assert_eq!(filter.should_reject(&palm), None);
    }

    #[test]
    fn test_mode_persistence_round_trip() {
        let store = MemoryStorage::new();
        let mut filter = PalmFilter::from_settings(&store);
        assert_eq!(filter.mode(), PalmRejectionMode::Auto);

        filter.set_mode(PalmRejectionMode::Never, &store);
        let reloaded = PalmFilter::from_settings(&store);
        assert_eq!(reloaded.mode(), PalmRejectionMode::Never);

        filter.set_mode(PalmRejectionMode::Always, &store);
        let reloaded = PalmFilter::from_settings(&store);
        assert_eq!(reloaded.mode(), PalmRejectionMode::Always);
    }

    #[test]
    fn test_unrecognized_persisted_mode_falls_back_to_auto() {
        let store = MemoryStorage::new();
        store.set(MODE_SETTINGS_KEY, "aggressive").unwrap();
        let filter = PalmFilter::from_settings(&store);
        assert_eq!(filter.mode(), PalmRejectionMode::Auto);
    }

    #[test]
    fn test_reset_clears_transients() {
        let mut filter = PalmFilter::new(PalmRejectionMode::Auto);
        filter.on_pen_down(0);
        let _ = filter.filter_event(&touch_at(10));
        filter.reset();
        assert!(!filter.is_pen_active());
        assert_eq!(filter.active_touches(), 0);
    }
}
