//! Backend-neutral draw lists.

use crate::view::Viewport;
use macroquad::prelude::*;

/// One drawing step of a frame. Geometry is in world units; backends map it
/// through the frame's viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole canvas.
    Clear(Color),
    /// Straight line.
    Line {
        /// Start point.
        from: Vec2,
        /// End point.
        to: Vec2,
        /// Width in world units.
        thickness: f32,
        /// Stroke colour.
        color: Color,
    },
    /// Tile image stretched over `dest`.
    Tile {
        /// Registry name of the tile.
        name: String,
        /// Target rectangle in world units.
        dest: Rect,
        /// Multiplier on the image's own alpha.
        alpha: f32,
    },
    /// Flat rectangle, used when a tile has no image.
    Fill {
        /// Target rectangle in world units.
        dest: Rect,
        /// Fill colour, alpha already scaled by layer opacity.
        color: Color,
    },
    /// Rectangle border.
    Outline {
        /// Rectangle whose edges are stroked.
        dest: Rect,
        /// Border width in world units.
        thickness: f32,
        /// Stroke colour.
        color: Color,
    },
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Transform the commands are drawn through.
    pub viewport: Viewport,
    /// Commands in drawing order.
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    /// Name, destination and alpha of every tile command, in order.
    pub fn tiles(&self) -> impl Iterator<Item = (&str, Rect, f32)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Tile { name, dest, alpha } => Some((name.as_str(), *dest, *alpha)),
            _ => None,
        })
    }
}
