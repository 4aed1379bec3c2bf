//! Flattened PNG export of the visible layers.

use crate::error::{EditorError, Result};
use crate::map::TileMap;
use crate::render::{build_export_frame, RasterCanvas, RenderTarget};
use crate::tileset::TileRegistry;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Composites every visible layer at 1:1 over the occupied area.
///
/// The area is size-checked before any pixel buffer is allocated.
pub fn flatten(map: &TileMap, registry: &TileRegistry) -> Result<RgbaImage> {
    let (frame, width, height) = build_export_frame(map, registry)?;
    let mut canvas = RasterCanvas::new(width, height);
    canvas.execute(&frame, registry);
    Ok(canvas.into_image())
}

/// PNG bytes of [`flatten`].
pub fn export_png(map: &TileMap, registry: &TileRegistry) -> Result<Vec<u8>> {
    let image = flatten(map, registry)?;
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    log::info!("exported {}x{} png", image.width(), image.height());
    Ok(bytes.into_inner())
}

/// Writes [`export_png`] output to `path`.
pub fn export_png_file(map: &TileMap, registry: &TileRegistry, path: &Path) -> Result<()> {
    let bytes = export_png(map, registry)?;
    std::fs::write(path, bytes).map_err(|source| EditorError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerId;
    use crate::spatial::GridCoord;
    use crate::tileset::{TileDefinition, TileRect};
    use image::Rgba;
    use std::sync::Arc;

    fn solid(name: &str, px: [u8; 4]) -> TileDefinition {
        TileDefinition {
            name: name.to_owned(),
            rect: TileRect {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            },
            image: Arc::new(RgbaImage::from_pixel(4, 4, Rgba(px))),
        }
    }

    #[test]
    fn empty_map_is_an_error() {
        let err = export_png(&TileMap::new(), &TileRegistry::new()).unwrap_err();
        assert!(matches!(err, EditorError::EmptyMap));
    }

    #[test]
    fn flattens_layers_in_order_at_their_opacity() {
        let mut reg = TileRegistry::new();
        reg.merge(
            vec![solid("red", [255, 0, 0, 255]), solid("blue", [0, 0, 255, 255])],
            1,
        );
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(0, 0), "red");
        map.place_tile(GridCoord::new(1, 0), "red");
        map.set_active_layer(&LayerId::from("3")).unwrap();
        map.place_tile(GridCoord::new(1, 0), "blue");
        map.set_layer_opacity(&LayerId::from("3"), 0.5).unwrap();

        let img = flatten(&map, &reg).unwrap();
        assert_eq!(img.dimensions(), (128, 64));
        assert_eq!(img.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
        let mixed = img.get_pixel(100, 10);
        assert_eq!(mixed.0[3], 255);
        assert!(mixed.0[0] > 120 && mixed.0[0] < 135);
        assert!(mixed.0[2] > 120 && mixed.0[2] < 135);
    }

    #[test]
    fn hidden_layers_and_missing_images() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(0, 0), "nowhere");
        map.set_active_layer(&LayerId::from("3")).unwrap();
        map.place_tile(GridCoord::new(5, 5), "nowhere");
        map.toggle_layer_visibility(&LayerId::from("3")).unwrap();

        let img = flatten(&map, &TileRegistry::new()).unwrap();
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(img.get_pixel(0, 0), &Rgba([128, 128, 144, 255]));

        let png = export_png(&map, &TileRegistry::new()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn cells_at_the_grid_edge_are_refused() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(i32::MIN, 0), "red");
        map.place_tile(GridCoord::new(10, 0), "red");
        let err = flatten(&map, &TileRegistry::new()).unwrap_err();
        assert!(matches!(err, EditorError::ExportTooLarge { height: 64, .. }));
    }

    #[test]
    fn far_apart_cells_are_refused_before_allocating() {
        let mut map = TileMap::new();
        map.place_tile(GridCoord::new(0, 0), "red");
        map.place_tile(GridCoord::new(200_000, 200_000), "red");
        match export_png(&map, &TileRegistry::new()) {
            Err(EditorError::ExportTooLarge { width, height }) => {
                assert_eq!((width, height), (200_001 * 64, 200_001 * 64));
            }
            other => panic!("expected ExportTooLarge, got {other:?}"),
        }

        map.erase_tile(GridCoord::new(200_000, 200_000));
        map.place_tile(GridCoord::new(127, 0), "red");
        assert_eq!(flatten(&map, &TileRegistry::new()).unwrap().dimensions(), (8192, 64));
    }
}
