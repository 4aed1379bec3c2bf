//! Screen/world transform of the editing canvas.

use crate::spatial::{world_to_cell, GridCoord};
use macroquad::prelude::*;

/// Smallest zoom factor.
pub const MIN_ZOOM: f32 = 0.1;
/// Largest zoom factor.
pub const MAX_ZOOM: f32 = 5.0;
const ZOOM_OUT_STEP: f32 = 0.9;
const ZOOM_IN_STEP: f32 = 1.1;

/// Pan/zoom transform between screen pixels and world units.
///
/// `origin` is the canvas' top-left corner on screen. A world point `w` is shown at
/// `origin + pan + w * zoom`, so zoom is anchored at the canvas origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Canvas top-left in screen pixels.
    pub origin: Vec2,
    /// Screen-pixel offset of the world origin from `origin`.
    pub pan: Vec2,
    zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            origin: Vec2::ZERO,
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Unpanned viewport at zoom 1 over a canvas at `origin`.
    pub fn new(origin: Vec2) -> Self {
        Viewport {
            origin,
            ..Default::default()
        }
    }

    /// Current zoom factor.
    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Sets the zoom, clamped to [`MIN_ZOOM`, `MAX_ZOOM`].
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// One wheel notch: positive `delta_y` zooms out by 10%, anything else zooms in.
    pub fn zoom_step(&mut self, delta_y: f32) {
        let factor = if delta_y > 0.0 {
            ZOOM_OUT_STEP
        } else {
            ZOOM_IN_STEP
        };
        self.set_zoom(self.zoom * factor);
    }

    /// Moves the world by `delta` screen pixels.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Screen pixel to world units.
    #[inline]
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.origin - self.pan) / self.zoom
    }

    /// Inverse of [`Viewport::screen_to_world`].
    #[inline]
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.zoom + self.pan + self.origin
    }

    /// Grid cell under a screen pixel for the given cell size.
    pub fn screen_to_grid(&self, screen: Vec2, cell_size: u32) -> GridCoord {
        world_to_cell(self.screen_to_world(screen), cell_size)
    }

    /// Screen rectangle covered by a cell.
    pub fn cell_screen_rect(&self, c: GridCoord, cell_size: u32) -> Rect {
        let top_left = self.world_to_screen(c.world_origin(cell_size));
        let side = cell_size as f32 * self.zoom;
        Rect::new(top_left.x, top_left.y, side, side)
    }

    /// World-space rectangle visible in a canvas of `size` screen pixels.
    pub fn visible_world_rect(&self, size: Vec2) -> Rect {
        let min = self.screen_to_world(self.origin);
        Rect::new(min.x, min.y, size.x / self.zoom, size.y / self.zoom)
    }
}
