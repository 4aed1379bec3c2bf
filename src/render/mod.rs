//! Frame building: turns model + viewport state into a list of draw commands.

mod cull;
mod mq;
mod raster;

pub use cull::{grid_lines, visible_cells};
pub use mq::MacroquadCanvas;
pub use raster::RasterCanvas;

use crate::command::{DrawCommand, Frame};
use crate::error::{EditorError, Result};
use crate::input::Tool;
use crate::layer::{Layer, LayerId};
use crate::map::TileMap;
use crate::spatial::{CellBounds, GridCoord};
use crate::tileset::TileRegistry;
use crate::view::Viewport;
use macroquad::prelude::*;

/// Editor canvas background, `#0a0a0f`.
pub const CANVAS_BG: Color = Color::new(10.0 / 255.0, 10.0 / 255.0, 15.0 / 255.0, 1.0);
/// Grid lines, `#2a2a34`.
pub const GRID_COLOR: Color = Color::new(42.0 / 255.0, 42.0 / 255.0, 52.0 / 255.0, 1.0);
/// Fill for image-less tiles on the active layer.
pub const ACTIVE_FALLBACK: Color = Color::new(0.0, 1.0, 1.0, 1.0);
/// Fill for image-less tiles on every other layer.
pub const INACTIVE_FALLBACK: Color = Color::new(128.0 / 255.0, 128.0 / 255.0, 144.0 / 255.0, 1.0);
/// Border around the hovered cell while painting.
pub const GHOST_OUTLINE: Color = Color::new(0.0, 1.0, 1.0, 1.0);
/// Alpha of the tile preview under the cursor.
pub const GHOST_ALPHA: f32 = 0.5;

/// Something that can execute a [`Frame`].
pub trait RenderTarget {
    /// Draws every command of `frame`, looking tile images up in `registry`.
    fn execute(&mut self, frame: &Frame, registry: &TileRegistry);
}

/// Inputs of one editor frame.
pub struct FrameInput<'a> {
    /// Map to draw.
    pub map: &'a TileMap,
    /// Source of tile images.
    pub registry: &'a TileRegistry,
    /// Current pan and zoom.
    pub viewport: &'a Viewport,
    /// Canvas size in screen pixels, used for culling.
    pub canvas_size: Vec2,
    /// Draw grid lines for the active layer's cell size.
    pub grid_visible: bool,
    /// Current tool; only the paint tool shows a preview.
    pub tool: Tool,
    /// Tile previewed under the cursor.
    pub selected: Option<&'a str>,
    /// Cell under the cursor, on the active layer's grid.
    pub hovered: Option<GridCoord>,
}

/// Builds the editor frame from scratch. Never touches the model.
pub fn build_frame(input: &FrameInput) -> Frame {
    let vp = *input.viewport;
    let view = vp.visible_world_rect(input.canvas_size);
    let cell = input.map.active_cell_size();
    let mut commands = vec![DrawCommand::Clear(CANVAS_BG)];

    if input.grid_visible {
        let (xs, ys) = grid_lines(view, cell);
        let thickness = 1.0 / vp.zoom();
        let (top, bottom) = (ys.first().copied(), ys.last().copied());
        let (left, right) = (xs.first().copied(), xs.last().copied());
        if let (Some(top), Some(bottom), Some(left), Some(right)) = (top, bottom, left, right) {
            let s = cell as f32;
            for x in &xs {
                commands.push(DrawCommand::Line {
                    from: vec2(*x, top),
                    to: vec2(*x, bottom + s),
                    thickness,
                    color: GRID_COLOR,
                });
            }
            for y in &ys {
                commands.push(DrawCommand::Line {
                    from: vec2(left, *y),
                    to: vec2(right + s, *y),
                    thickness,
                    color: GRID_COLOR,
                });
            }
        }
    }

    let active = input.map.active_layer_id();
    for layer in input.map.layers() {
        let bounds = visible_cells(view, layer.cell_size());
        draw_layer(&mut commands, layer, input.registry, Some(active), Some(bounds));
    }

    if let (Tool::Paint, Some(tile), Some(hovered)) = (input.tool, input.selected, input.hovered) {
        let s = cell as f32;
        let origin = hovered.world_origin(cell);
        let dest = Rect::new(origin.x, origin.y, s, s);
        if input.registry.get(tile).is_some() {
            commands.push(DrawCommand::Tile {
                name: tile.to_string(),
                dest,
                alpha: GHOST_ALPHA,
            });
        }
        commands.push(DrawCommand::Outline {
            dest,
            thickness: 2.0 / vp.zoom(),
            color: GHOST_OUTLINE,
        });
    }

    Frame {
        viewport: vp,
        commands,
    }
}

fn draw_layer(
    commands: &mut Vec<DrawCommand>,
    layer: &Layer,
    registry: &TileRegistry,
    active: Option<&LayerId>,
    bounds: Option<CellBounds>,
) {
    if !layer.visible {
        return;
    }
    let size = layer.cell_size();
    let s = size as f32;
    let fallback = if active == Some(&layer.id) {
        ACTIVE_FALLBACK
    } else {
        INACTIVE_FALLBACK
    };

    let mut cells: Vec<(GridCoord, &str)> = layer
        .tiles
        .iter()
        .filter(|(c, _)| bounds.map_or(true, |b| b.contains(*c)))
        .collect();
    cells.sort_unstable_by_key(|(c, _)| (c.y, c.x));

    for (c, name) in cells {
        let origin = c.world_origin(size);
        let dest = Rect::new(origin.x, origin.y, s, s);
        if registry.get(name).is_some() {
            commands.push(DrawCommand::Tile {
                name: name.to_string(),
                dest,
                alpha: layer.opacity,
            });
        } else {
            commands.push(DrawCommand::Fill {
                dest,
                color: Color {
                    a: fallback.a * layer.opacity,
                    ..fallback
                },
            });
        }
    }
}

/// Largest export, in pixels, that [`build_export_frame`] will lay out.
pub const MAX_EXPORT_PIXELS: u64 = 8192 * 8192;

/// Occupied area of the visible layers in world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportArea {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width in pixels.
    pub width: u64,
    /// Height in pixels.
    pub height: u64,
}

/// Area covering every occupied cell of the visible layers. Computed in
/// `i64` so cells anywhere on the grid cannot overflow the span.
pub fn occupied_area(map: &TileMap) -> Option<ExportArea> {
    map.layers()
        .iter()
        .filter(|l| l.visible)
        .filter_map(|l| {
            let b = l.tiles.bounds()?;
            let s = i64::from(l.cell_size());
            Some((
                i64::from(b.min.x) * s,
                i64::from(b.min.y) * s,
                (i64::from(b.max.x) + 1) * s,
                (i64::from(b.max.y) + 1) * s,
            ))
        })
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
        .map(|(x0, y0, x1, y1)| ExportArea {
            x: x0,
            y: y0,
            width: x1.abs_diff(x0),
            height: y1.abs_diff(y0),
        })
}

/// 1:1 frame of all visible layers over their occupied area, on a transparent
/// background. Returns the frame and its pixel size.
///
/// Fails with [`EditorError::EmptyMap`] when nothing is visible and with
/// [`EditorError::ExportTooLarge`] when the area exceeds [`MAX_EXPORT_PIXELS`].
pub fn build_export_frame(map: &TileMap, registry: &TileRegistry) -> Result<(Frame, u32, u32)> {
    let area = occupied_area(map).ok_or(EditorError::EmptyMap)?;
    let too_large = || EditorError::ExportTooLarge {
        width: area.width,
        height: area.height,
    };
    if area.width.saturating_mul(area.height) > MAX_EXPORT_PIXELS {
        return Err(too_large());
    }
    let width = u32::try_from(area.width).map_err(|_| too_large())?;
    let height = u32::try_from(area.height).map_err(|_| too_large())?;

    let mut viewport = Viewport::default();
    viewport.pan = -vec2(area.x as f32, area.y as f32);

    let mut commands = vec![DrawCommand::Clear(Color::new(0.0, 0.0, 0.0, 0.0))];
    for layer in map.layers() {
        draw_layer(&mut commands, layer, registry, None, None);
    }
    Ok((Frame { viewport, commands }, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerId;
    use crate::tileset::{TileDefinition, TileRect};
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    fn registry_with(names: &[&str]) -> TileRegistry {
        let mut reg = TileRegistry::new();
        let defs = names
            .iter()
            .map(|n| TileDefinition {
                name: n.to_string(),
                rect: TileRect {
                    x: 0,
                    y: 0,
                    width: 2,
                    height: 2,
                },
                image: Arc::new(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))),
            })
            .collect();
        reg.merge(defs, 1);
        reg
    }

    fn input<'a>(map: &'a TileMap, reg: &'a TileRegistry, vp: &'a Viewport) -> FrameInput<'a> {
        FrameInput {
            map,
            registry: reg,
            viewport: vp,
            canvas_size: vec2(640.0, 480.0),
            grid_visible: false,
            tool: Tool::Paint,
            selected: None,
            hovered: None,
        }
    }

    #[test]
    fn layers_draw_bottom_to_top_and_skip_hidden() {
        let mut map = TileMap::new();
        map.set_active_layer(&LayerId::from("1")).unwrap();
        map.place_tile(GridCoord::new(0, 0), "background_solid_sky");
        map.set_active_layer(&LayerId::from("2")).unwrap();
        map.place_tile(GridCoord::new(1, 1), "heart");
        map.set_active_layer(&LayerId::from("3")).unwrap();
        map.place_tile(GridCoord::new(2, 2), "enemy_bee");
        map.toggle_layer_visibility(&LayerId::from("3")).unwrap();

        let reg = registry_with(&["background_solid_sky", "heart", "enemy_bee"]);
        let vp = Viewport::default();
        let frame = build_frame(&input(&map, &reg, &vp));
        let names: Vec<_> = frame.tiles().map(|(n, _, _)| n).collect();
        assert_eq!(names, vec!["background_solid_sky", "heart"]);

        let (_, sky, _) = frame.tiles().next().unwrap();
        assert_eq!(sky.w, 256.0);
        let (_, heart, _) = frame.tiles().nth(1).unwrap();
        assert_eq!((heart.x, heart.w), (64.0, 64.0));
    }

    #[test]
    fn missing_images_fall_back_to_tinted_fill() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(0, 0), "unknown");
        map.set_layer_opacity(&LayerId::from("2"), 0.5).unwrap();
        let reg = TileRegistry::new();
        let vp = Viewport::default();
        let frame = build_frame(&input(&map, &reg, &vp));
        let fill = frame
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Fill { color, .. } => Some(*color),
                _ => None,
            })
            .unwrap();
        assert_eq!((fill.r, fill.g, fill.b), (0.0, 1.0, 1.0));
        assert!((fill.a - 0.5).abs() < 1e-6);

        map.set_active_layer(&LayerId::from("1")).unwrap();
        let frame = build_frame(&input(&map, &reg, &vp));
        assert!(frame.commands.iter().any(|c| matches!(
            c,
            DrawCommand::Fill { color, .. } if color.r > 0.5 && color.r < 0.51
        )));
    }

    #[test]
    fn ghost_only_with_paint_tool_and_selection() {
        let map = TileMap::new();
        let reg = registry_with(&["coin_gold"]);
        let vp = Viewport::default();
        let mut fi = input(&map, &reg, &vp);
        fi.hovered = Some(GridCoord::new(2, -1));
        assert!(!build_frame(&fi).commands.iter().any(|c| matches!(c, DrawCommand::Outline { .. })));

        fi.selected = Some("coin_gold");
        let frame = build_frame(&fi);
        let (_, dest, alpha) = frame.tiles().next().unwrap();
        assert_eq!((dest.x, dest.y), (128.0, -64.0));
        assert_eq!(alpha, GHOST_ALPHA);
        assert!(frame.commands.iter().any(|c| matches!(c, DrawCommand::Outline { .. })));

        fi.tool = Tool::Erase;
        assert_eq!(build_frame(&fi).tiles().count(), 0);
    }

    #[test]
    fn grid_follows_active_cell_size() {
        let mut map = TileMap::new();
        let reg = TileRegistry::new();
        let vp = Viewport::default();
        let mut fi = input(&map, &reg, &vp);
        fi.grid_visible = true;
        let fg_lines = build_frame(&fi).commands.len();

        map.set_active_layer(&LayerId::from("1")).unwrap();
        let mut fi = input(&map, &reg, &vp);
        fi.grid_visible = true;
        let bg_lines = build_frame(&fi).commands.len();
        assert!(bg_lines < fg_lines);
    }

    #[test]
    fn tiles_outside_view_are_culled() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(1, 1), "heart");
        map.place_tile(GridCoord::new(500, 500), "heart");
        let reg = registry_with(&["heart"]);
        let vp = Viewport::default();
        assert_eq!(build_frame(&input(&map, &reg, &vp)).tiles().count(), 1);
    }

    #[test]
    fn export_area_spans_mixed_cell_sizes() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(-1, 0), "heart");
        map.set_active_layer(&LayerId::from("1")).unwrap();
        map.place_tile(GridCoord::new(0, 0), "background_solid_sky");

        let area = occupied_area(&map).unwrap();
        assert_eq!(
            area,
            ExportArea {
                x: -64,
                y: 0,
                width: 320,
                height: 256
            }
        );

        let (frame, w, h) = build_export_frame(&map, &TileRegistry::new()).unwrap();
        assert_eq!((w, h), (320, 256));
        assert_eq!(frame.viewport.pan, vec2(64.0, 0.0));
        assert!(matches!(
            build_export_frame(&TileMap::new(), &TileRegistry::new()),
            Err(EditorError::EmptyMap)
        ));
    }

    #[test]
    fn export_area_at_the_grid_edge_does_not_overflow() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(i32::MIN, 0), "heart");
        map.place_tile(GridCoord::new(10, 0), "heart");

        let area = occupied_area(&map).unwrap();
        assert_eq!(area.x, i64::from(i32::MIN) * 64);
        assert_eq!(area.width, (11 - i64::from(i32::MIN)) as u64 * 64);
        assert_eq!(area.height, 64);

        let err = build_export_frame(&map, &TileRegistry::new()).unwrap_err();
        assert!(matches!(err, EditorError::ExportTooLarge { height: 64, .. }));
    }
}
