//! Multi-touch gesture recognition.
//!
//! Consumes accepted touch pointers and disambiguates: one finger is left to
//! the drawing pipeline (unless it arms an edge swipe or a long press), two
//! fingers pan and pinch the viewport, three or more swipe for undo/redo.
//! Recognized gestures are queued as [`GestureEvent`]s and drained with
//! `poll_events`; `tick` drives the long-press deadline and inertia frames.

use crate::camera::{ZOOM_MAX, ZOOM_MIN};
use crate::input::{PointerInput, PointerPhase};
use kurbo::Point;
use std::collections::{HashMap, VecDeque};

/// Movement below this is a tap; above it cancels a long press.
pub const PAN_THRESHOLD: f64 = 5.0;
/// Minimum zoom change propagated during a pinch.
pub const PINCH_THRESHOLD: f64 = 0.02;
/// Horizontal centroid travel that triggers a 3-finger undo/redo swipe.
pub const SWIPE_THRESHOLD: f64 = 60.0;
/// Maximum delay between taps of a double tap.
pub const DOUBLE_TAP_MS: u64 = 300;
/// Maximum distance between taps of a double tap.
pub const DOUBLE_TAP_DISTANCE: f64 = 30.0;
/// Hold duration for a long press.
pub const LONG_PRESS_MS: u64 = 500;
/// Width of the edge-swipe arming zone on either side of the canvas.
pub const EDGE_ZONE_PX: f64 = 24.0;
/// Horizontal travel required to complete an edge swipe.
pub const EDGE_SWIPE_MIN: f64 = 60.0;
/// Per-frame velocity decay during inertia.
pub const INERTIA_FRICTION: f64 = 0.92;
/// Velocity (px/frame) below which inertia stops.
pub const INERTIA_MIN_VELOCITY: f64 = 0.5;
/// Window over which release velocity is sampled.
pub const VELOCITY_SAMPLE_MS: u64 = 100;
/// Haptic cue length for a long press.
pub const HAPTIC_MS: u64 = 10;

/// Nominal frame duration used to convert px/ms into px/frame.
const FRAME_MS: f64 = 16.0;

/// A recognized gesture, drained via `poll_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// Viewport pan delta in screen pixels.
    Pan { dx: f64, dy: f64 },
    /// Pan finished (fingers lifted and inertia, if any, ran out).
    PanEnd,
    /// Absolute zoom level, anchored at `center` (screen pixels).
    Zoom { zoom: f64, center: Point },
    /// Three-finger swipe left.
    Undo,
    /// Three-finger swipe right.
    Redo,
    /// Two taps on the same spot in quick succession.
    DoubleTap(Point),
    /// One finger held still.
    LongPress(Point),
    /// Swipe inward from the canvas edge (panel reveal).
    EdgeSwipe { from_left: bool },
    /// Haptic cue request.
    Haptic { duration_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ActiveGesture {
    None,
    /// One finger down: tap / long press / edge swipe candidate.
    Single {
        start: Point,
        start_ms: u64,
        /// Greatest displacement from the start position so far.
        moved: f64,
        edge: Option<EdgeSide>,
        edge_fired: bool,
        long_press_armed: bool,
        long_press_fired: bool,
    },
    /// Two fingers: combined centroid pan + pinch zoom.
    PanZoom {
        start_dist: f64,
        start_zoom: f64,
        anchor: Point,
        last_zoom: f64,
        last_centroid: Point,
    },
    /// Three or more fingers: horizontal undo/redo swipe.
    Swipe { start_x: f64, fired: bool },
}

#[derive(Debug, Clone, Copy)]
struct TrackedPointer {
    id: u64,
    start: Point,
    current: Point,
    start_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Inertia {
    /// Velocity in px/frame.
    vx: f64,
    vy: f64,
}

/// The gesture recognizer state machine.
///
/// Pointers live in a dense arena with an id→index lookup so reused platform
/// pointer ids never grow the table.
#[derive(Debug)]
pub struct GestureRecognizer {
    pointers: Vec<TrackedPointer>,
    index: HashMap<u64, usize>,
    gesture: ActiveGesture,
    events: Vec<GestureEvent>,
    /// Current viewport zoom, mirrored in by the caller.
    zoom: f64,
    canvas_width: f64,
    canvas_height: f64,
    reduced_motion: bool,
    last_tap: Option<(u64, Point)>,
    inertia: Option<Inertia>,
    /// Recent centroid samples for release-velocity estimation.
    samples: VecDeque<(u64, Point)>,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self {
            pointers: Vec::new(),
            index: HashMap::new(),
            gesture: ActiveGesture::None,
            events: Vec::new(),
            zoom: 1.0,
            canvas_width: 0.0,
            canvas_height: 0.0,
            reduced_motion: false,
            last_tap: None,
            inertia: None,
            samples: VecDeque::new(),
        }
    }

    /// Record the canvas size used for edge-zone detection.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_width = width;
        self.canvas_height = height;
    }

    /// Mirror the current viewport zoom so pinch targets are absolute.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    /// Skip inertia animations (accessibility).
    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    /// Whether the recognizer currently claims the touch stream.
    pub fn is_gesture_active(&self) -> bool {
        match self.gesture {
            ActiveGesture::PanZoom { .. } | ActiveGesture::Swipe { .. } => true,
            ActiveGesture::Single { edge, edge_fired, .. } => edge.is_some() && !edge_fired,
            _ => false,
        }
    }

    /// Number of tracked pointers.
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Drain recognized gestures.
    pub fn poll_events(&mut self) -> Vec<GestureEvent> {
        std::mem::take(&mut self.events)
    }

    /// Feed one touch pointer event.
    pub fn on_pointer(&mut self, input: &PointerInput) {
        match input.phase {
            PointerPhase::Down => self.on_down(input),
            PointerPhase::Move => self.on_move(input),
            PointerPhase::Up => self.on_up(input, false),
            PointerPhase::Cancel => self.on_up(input, true),
        }
    }

    /// Advance time-driven state: long-press deadline and inertia frames.
    ///
    /// Call once per animation frame with the current time.
    pub fn tick(&mut self, now_ms: u64) {
        if let ActiveGesture::Single {
            start,
            start_ms,
            moved,
            edge: None,
            long_press_armed: true,
            long_press_fired: false,
            ..
        } = self.gesture
        {
            if moved <= PAN_THRESHOLD && now_ms.saturating_sub(start_ms) >= LONG_PRESS_MS {
                self.events.push(GestureEvent::LongPress(start));
                self.events.push(GestureEvent::Haptic {
                    duration_ms: HAPTIC_MS,
                });
                if let ActiveGesture::Single {
                    long_press_armed,
                    long_press_fired,
                    ..
                } = &mut self.gesture
                {
                    *long_press_armed = false;
                    *long_press_fired = true;
                }
            }
        }

        if let Some(mut inertia) = self.inertia.take() {
            inertia.vx *= INERTIA_FRICTION;
            inertia.vy *= INERTIA_FRICTION;
            if inertia.vx.hypot(inertia.vy) < INERTIA_MIN_VELOCITY {
                self.events.push(GestureEvent::PanEnd);
            } else {
                self.events.push(GestureEvent::Pan {
                    dx: inertia.vx,
                    dy: inertia.vy,
                });
                self.inertia = Some(inertia);
            }
        }
    }

    /// Drop all pointers, timers and the inertia animation (detach).
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.index.clear();
        self.gesture = ActiveGesture::None;
        self.inertia = None;
        self.samples.clear();
        self.last_tap = None;
    }

    fn on_down(&mut self, input: &PointerInput) {
        // A fresh contact stops any running inertia
        if self.inertia.take().is_some() {
            self.events.push(GestureEvent::PanEnd);
        }

        if let Some(&slot) = self.index.get(&input.id) {
            // Stale entry from a missed Up; reuse the slot
            self.pointers[slot] = TrackedPointer {
                id: input.id,
                start: input.position,
                current: input.position,
                start_ms: input.timestamp_ms,
            };
        } else {
            self.index.insert(input.id, self.pointers.len());
            self.pointers.push(TrackedPointer {
                id: input.id,
                start: input.position,
                current: input.position,
                start_ms: input.timestamp_ms,
            });
        }

        self.resolve_gesture(input.timestamp_ms, true);
    }

    fn on_move(&mut self, input: &PointerInput) {
        let Some(&slot) = self.index.get(&input.id) else {
            return;
        };
        self.pointers[slot].current = input.position;

        match self.gesture {
            ActiveGesture::Single {
                start,
                edge,
                edge_fired,
                ..
            } => {
                let displacement = (input.position - start).hypot();
                if let ActiveGesture::Single {
                    moved,
                    long_press_armed,
                    ..
                } = &mut self.gesture
                {
                    if displacement > *moved {
                        *moved = displacement;
                    }
                    if displacement > PAN_THRESHOLD {
                        *long_press_armed = false;
                    }
                }

                if let Some(side) = edge {
                    if !edge_fired {
                        let dx = input.position.x - start.x;
                        let completed = match side {
                            EdgeSide::Left => dx >= EDGE_SWIPE_MIN,
                            EdgeSide::Right => dx <= -EDGE_SWIPE_MIN,
                        };
                        if completed {
                            self.events.push(GestureEvent::EdgeSwipe {
                                from_left: side == EdgeSide::Left,
                            });
                            if let ActiveGesture::Single { edge_fired, .. } = &mut self.gesture {
                                *edge_fired = true;
                            }
                        }
                    }
                }
            }
            ActiveGesture::PanZoom {
                start_dist,
                start_zoom,
                anchor,
                last_zoom,
                last_centroid,
            } => {
                let centroid = self.centroid();
                let delta = centroid - last_centroid;
                if delta.x != 0.0 || delta.y != 0.0 {
                    self.events.push(GestureEvent::Pan {
                        dx: delta.x,
                        dy: delta.y,
                    });
                }

                self.samples.push_back((input.timestamp_ms, centroid));
                let cutoff = input.timestamp_ms.saturating_sub(VELOCITY_SAMPLE_MS);
                while self.samples.front().is_some_and(|(t, _)| *t < cutoff) {
                    self.samples.pop_front();
                }

                let mut new_last_zoom = last_zoom;
                if self.pointers.len() >= 2 {
                    let dist = (self.pointers[0].current - self.pointers[1].current).hypot();
                    let target = (start_zoom * dist / start_dist).clamp(ZOOM_MIN, ZOOM_MAX);
                    if (target - last_zoom).abs() > PINCH_THRESHOLD {
                        self.events.push(GestureEvent::Zoom {
                            zoom: target,
                            center: anchor,
                        });
                        new_last_zoom = target;
                    }
                }

                self.gesture = ActiveGesture::PanZoom {
                    start_dist,
                    start_zoom,
                    anchor,
                    last_zoom: new_last_zoom,
                    last_centroid: centroid,
                };
            }
            ActiveGesture::Swipe { start_x, fired } => {
                if !fired {
                    let dx = self.centroid().x - start_x;
                    if dx <= -SWIPE_THRESHOLD {
                        self.events.push(GestureEvent::Undo);
                        self.gesture = ActiveGesture::Swipe { start_x, fired: true };
                    } else if dx >= SWIPE_THRESHOLD {
                        self.events.push(GestureEvent::Redo);
                        self.gesture = ActiveGesture::Swipe { start_x, fired: true };
                    }
                }
            }
            ActiveGesture::None => {}
        }
    }

    fn on_up(&mut self, input: &PointerInput, cancelled: bool) {
        let Some(&slot) = self.index.get(&input.id) else {
            return;
        };
        self.pointers[slot].current = input.position;

        // Tap / double tap on clean release of a lone finger
        if !cancelled {
            if let ActiveGesture::Single {
                moved,
                long_press_fired,
                edge_fired,
                ..
            } = self.gesture
            {
                if self.pointers.len() == 1
                    && moved <= PAN_THRESHOLD
                    && !long_press_fired
                    && !edge_fired
                {
                    self.register_tap(input.timestamp_ms, input.position);
                }
            }
        }

        // Leaving a two-finger pan starts inertia (or ends the pan)
        if matches!(self.gesture, ActiveGesture::PanZoom { .. }) && self.pointers.len() <= 2 {
            self.end_pan(input.timestamp_ms);
        }

        self.remove_pointer(input.id);
        self.resolve_gesture(input.timestamp_ms, false);
    }

    fn register_tap(&mut self, now_ms: u64, position: Point) {
        if let Some((tap_ms, tap_pos)) = self.last_tap {
            let close_in_time = now_ms.saturating_sub(tap_ms) <= DOUBLE_TAP_MS;
            let close_in_space = (position - tap_pos).hypot() <= DOUBLE_TAP_DISTANCE;
            if close_in_time && close_in_space {
                self.events.push(GestureEvent::DoubleTap(position));
                self.last_tap = None;
                return;
            }
        }
        self.last_tap = Some((now_ms, position));
    }

    fn end_pan(&mut self, now_ms: u64) {
        if self.reduced_motion {
            self.events.push(GestureEvent::PanEnd);
            return;
        }

        let velocity = self.release_velocity(now_ms);
        match velocity {
            Some((vx, vy)) if vx.hypot(vy) >= INERTIA_MIN_VELOCITY => {
                self.inertia = Some(Inertia { vx, vy });
            }
            _ => self.events.push(GestureEvent::PanEnd),
        }
    }

    /// Centroid velocity in px/frame over the trailing sample window.
    fn release_velocity(&self, now_ms: u64) -> Option<(f64, f64)> {
        let cutoff = now_ms.saturating_sub(VELOCITY_SAMPLE_MS);
        let mut recent = self.samples.iter().filter(|(t, _)| *t >= cutoff);
        let &(t0, p0) = recent.next()?;
        let &(t1, p1) = self.samples.back()?;
        if t1 <= t0 {
            return None;
        }
        let dt = (t1 - t0) as f64;
        let vx = (p1.x - p0.x) / dt * FRAME_MS;
        let vy = (p1.y - p0.y) / dt * FRAME_MS;
        Some((vx, vy))
    }

    fn remove_pointer(&mut self, id: u64) {
        let Some(slot) = self.index.remove(&id) else {
            return;
        };
        self.pointers.swap_remove(slot);
        if let Some(moved) = self.pointers.get(slot) {
            self.index.insert(moved.id, slot);
        }
    }

    /// Re-resolve the active gesture after a pointer-count transition.
    fn resolve_gesture(&mut self, now_ms: u64, fresh: bool) {
        match self.pointers.len() {
            0 => {
                self.gesture = ActiveGesture::None;
                self.samples.clear();
            }
            1 => {
                let pointer = self.pointers[0];
                let edge = if fresh {
                    self.edge_side(pointer.start)
                } else {
                    None
                };
                self.gesture = ActiveGesture::Single {
                    start: pointer.start,
                    start_ms: pointer.start_ms,
                    moved: (pointer.current - pointer.start).hypot(),
                    edge,
                    edge_fired: false,
                    long_press_armed: fresh,
                    long_press_fired: false,
                };
            }
            2 => {
                let dist = (self.pointers[0].current - self.pointers[1].current)
                    .hypot()
                    .max(f64::EPSILON);
                let centroid = self.centroid();
                self.samples.clear();
                self.samples.push_back((now_ms, centroid));
                self.gesture = ActiveGesture::PanZoom {
                    start_dist: dist,
                    start_zoom: self.zoom,
                    anchor: centroid,
                    last_zoom: self.zoom,
                    last_centroid: centroid,
                };
            }
            _ => {
                // Keep the swipe instance alive while extra fingers come and go
                if !matches!(self.gesture, ActiveGesture::Swipe { .. }) {
                    self.gesture = ActiveGesture::Swipe {
                        start_x: self.centroid().x,
                        fired: false,
                    };
                }
            }
        }
    }

    fn centroid(&self) -> Point {
        let n = self.pointers.len().max(1) as f64;
        let (sx, sy) = self
            .pointers
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.current.x, sy + p.current.y));
        Point::new(sx / n, sy / n)
    }

    fn edge_side(&self, position: Point) -> Option<EdgeSide> {
        if self.canvas_width <= 0.0 {
            return None;
        }
        if position.x <= EDGE_ZONE_PX {
            Some(EdgeSide::Left)
        } else if position.x >= self.canvas_width - EDGE_ZONE_PX {
            Some(EdgeSide::Right)
        } else {
            None
        }
    }
}
