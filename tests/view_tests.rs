// tests/view_tests.rs

use macroquad::prelude::vec2;
use macroquad_tile_editor::export::flatten;
use macroquad_tile_editor::render::{build_frame, FrameInput, RasterCanvas, RenderTarget};
use macroquad_tile_editor::{GridCoord, TileMap, TileRegistry, Tool, Viewport};

#[test]
fn screen_to_grid_inverts_tile_placement() {
    let pans = [vec2(0.0, 0.0), vec2(37.5, -120.0), vec2(-999.0, 4.25)];
    let zooms = [0.1, 0.37, 1.0, 2.5, 5.0];
    let cells = [(0, 0), (3, 7), (-1, -1), (-25, 40), (120, -300)];
    for size in [64u32, 256] {
        for pan in pans {
            for zoom in zooms {
                let mut vp = Viewport::new(vec2(220.0, 0.0));
                vp.pan = pan;
                vp.set_zoom(zoom);
                for (gx, gy) in cells {
                    let rect = vp.cell_screen_rect(GridCoord::new(gx, gy), size);
                    let s = size as f32 * zoom;
                    assert!((rect.x - (gx as f32 * s + pan.x + 220.0)).abs() < 0.1);
                    assert!((rect.w - s).abs() < 1e-3);
                    assert_eq!(vp.screen_to_grid(rect.center(), size), GridCoord::new(gx, gy));
                }
            }
        }
    }
}

#[test]
fn zoom_is_clamped_under_any_wheel_sequence() {
    let mut vp = Viewport::default();
    for i in 0..2_000u32 {
        // bursts of each direction of varying length
        let delta = if (i / 37) % 3 == 0 { -1.0 } else { 1.0 };
        vp.zoom_step(delta);
        assert!((0.1..=5.0).contains(&vp.zoom()));
    }
}

#[test]
fn frame_raster_matches_export_for_same_content() {
    let mut map = TileMap::new();
    map.place_tile(GridCoord::new(0, 0), "missing");
    let registry = TileRegistry::new();

    let exported = flatten(&map, &registry).unwrap();
    assert_eq!(exported.dimensions(), (64, 64));

    let vp = Viewport::default();
    let frame = build_frame(&FrameInput {
        map: &map,
        registry: &registry,
        viewport: &vp,
        canvas_size: vec2(64.0, 64.0),
        grid_visible: false,
        tool: Tool::Move,
        selected: None,
        hovered: None,
    });
    let mut canvas = RasterCanvas::new(64, 64);
    canvas.execute(&frame, &registry);
    // editor draws the active layer's fallback in cyan on the dark background
    assert_eq!(canvas.image().get_pixel(32, 32).0, [0, 255, 255, 255]);
    assert_eq!(exported.get_pixel(32, 32).0, [128, 128, 144, 255]);
}
