use super::RenderTarget;
use crate::command::{DrawCommand, Frame};
use crate::tileset::TileRegistry;
use macroquad::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Draws frames with macroquad. Textures are uploaded lazily per tile and
/// re-uploaded when the registry replaces a tile's image.
pub struct MacroquadCanvas {
    area: Rect,
    textures: HashMap<String, (usize, Texture2D)>,
}

impl MacroquadCanvas {
    /// Canvas drawing into `area` of the window.
    pub fn new(area: Rect) -> Self {
        MacroquadCanvas {
            area,
            textures: HashMap::new(),
        }
    }

    /// Screen rectangle the canvas occupies.
    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    /// GPU texture of a registered tile, uploaded on first use.
    pub fn texture(&mut self, registry: &TileRegistry, name: &str) -> Option<Texture2D> {
        let def = registry.get(name)?;
        let key = Arc::as_ptr(&def.image) as usize;
        if let Some((k, tex)) = self.textures.get(name) {
            if *k == key {
                return Some(tex.clone());
            }
        }
        let (w, h) = def.image.dimensions();
        let tex = Texture2D::from_rgba8(
            u16::try_from(w).ok()?,
            u16::try_from(h).ok()?,
            def.image.as_raw(),
        );
        tex.set_filter(FilterMode::Nearest);
        self.textures
            .insert(name.to_string(), (key, tex.clone()));
        Some(tex)
    }
}

impl RenderTarget for MacroquadCanvas {
    fn execute(&mut self, frame: &Frame, registry: &TileRegistry) {
        let vp = frame.viewport;
        let zoom = vp.zoom();
        for cmd in &frame.commands {
            match cmd {
                DrawCommand::Clear(color) => {
                    draw_rectangle(self.area.x, self.area.y, self.area.w, self.area.h, *color);
                }
                DrawCommand::Line {
                    from,
                    to,
                    thickness,
                    color,
                } => {
                    let a = vp.world_to_screen(*from);
                    let b = vp.world_to_screen(*to);
                    draw_line(a.x, a.y, b.x, b.y, thickness * zoom, *color);
                }
                DrawCommand::Tile { name, dest, alpha } => {
                    let Some(tex) = self.texture(registry, name) else {
                        continue;
                    };
                    let p = vp.world_to_screen(vec2(dest.x, dest.y));
                    draw_texture_ex(
                        &tex,
                        p.x,
                        p.y,
                        Color::new(1.0, 1.0, 1.0, *alpha),
                        DrawTextureParams {
                            dest_size: Some(vec2(dest.w * zoom, dest.h * zoom)),
                            ..Default::default()
                        },
                    );
                }
                DrawCommand::Fill { dest, color } => {
                    let p = vp.world_to_screen(vec2(dest.x, dest.y));
                    draw_rectangle(p.x, p.y, dest.w * zoom, dest.h * zoom, *color);
                }
                DrawCommand::Outline {
                    dest,
                    thickness,
                    color,
                } => {
                    let p = vp.world_to_screen(vec2(dest.x, dest.y));
                    draw_rectangle_lines(
                        p.x,
                        p.y,
                        dest.w * zoom,
                        dest.h * zoom,
                        thickness * zoom,
                        *color,
                    );
                }
            }
        }
    }
}
