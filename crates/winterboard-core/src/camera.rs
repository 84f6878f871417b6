//! Viewport module for pan/zoom transforms.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum allowed zoom level.
pub const ZOOM_MIN: f64 = 0.25;
/// Maximum allowed zoom level.
pub const ZOOM_MAX: f64 = 4.0;
/// Multiplicative step used by `zoom_in`/`zoom_out`.
pub const ZOOM_STEP: f64 = 1.2;

/// Viewport manages the view transform for the board.
///
/// It handles panning (translation) and zooming (scaling) operations,
/// converting between screen coordinates and canvas coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Canvas coordinate shown at the screen origin (pan)
    pub offset: Vec2,
    /// Current zoom level (1.0 = 100%)
    pub zoom: f64,
    /// Viewport width in screen pixels
    pub width: f64,
    /// Viewport height in screen pixels
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the viewport size in screen pixels.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts canvas coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom) * Affine::translate(-self.offset)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to canvas coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(1.0 / self.zoom)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Pan the viewport by a delta in screen pixels.
    ///
    /// The delta is divided by the zoom level so a one-pixel drag moves the
    /// content by one pixel regardless of magnification.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset += Vec2::new(dx / self.zoom, dy / self.zoom);
    }

    /// Set the zoom level, clamped to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Set the zoom level, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, zoom: f64) {
        let new_zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        // Canvas point under the anchor before the zoom change
        let anchor = self.screen_to_canvas(screen_point);

        self.zoom = new_zoom;

        // Adjust offset so the anchor stays at screen_point
        let after = self.screen_to_canvas(screen_point);
        self.offset += anchor - after;
    }

    /// Zoom in by one step, anchored at the viewport center.
    pub fn zoom_in(&mut self) {
        self.zoom_at(self.center(), self.zoom * ZOOM_STEP);
    }

    /// Zoom out by one step, anchored at the viewport center.
    pub fn zoom_out(&mut self) {
        self.zoom_at(self.center(), self.zoom / ZOOM_STEP);
    }

    /// Reset pan and zoom to the home position.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }

    fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}
