//! TextureAtlas descriptors, async image fetch and tile slicing.

use crate::error::{EditorError, Result};
use crate::layer::TilesetKind;
use crate::tileset::{TileDefinition, TileRect};
use image::{Rgba, RgbaImage};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Size SubTexture width/height fall back to when missing.
const DEFAULT_TILE_SIZE: u32 = 64;

/// One named sub-rectangle of an atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTexture {
    /// `name` attribute; becomes the tile name.
    pub name: String,
    /// `x`, `y`, `width` and `height` attributes.
    pub rect: TileRect,
}

/// Parsed `<TextureAtlas imagePath=..>` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasDescriptor {
    /// Image file name, relative to the assets directory.
    pub image_path: String,
    /// Sub-rectangles in document order.
    pub sub_textures: Vec<SubTexture>,
}

fn parse_attributes(elem: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in elem.attributes() {
        let attr = attr.map_err(|e| EditorError::Xml(format!("attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| EditorError::Xml(format!("invalid UTF-8 in attribute key: {e}")))?
            .to_string();
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| EditorError::Xml(format!("invalid UTF-8 in attribute value: {e}")))?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn attr_u32(attrs: &HashMap<String, String>, key: &str, default: u32) -> Result<u32> {
    match attrs.get(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| EditorError::Xml(format!("attribute {key}='{v}' is not a number"))),
        None => Ok(default),
    }
}

/// Parses a TextureAtlas XML descriptor.
pub fn parse_descriptor(xml: &str) -> Result<AtlasDescriptor> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut image_path = None;
    let mut sub_textures = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"TextureAtlas" => {
                    let attrs = parse_attributes(e)?;
                    image_path = Some(attrs.get("imagePath").cloned().ok_or_else(|| {
                        EditorError::Xml("TextureAtlas is missing imagePath".to_string())
                    })?);
                }
                b"SubTexture" => {
                    let attrs = parse_attributes(e)?;
                    sub_textures.push(SubTexture {
                        name: attrs.get("name").cloned().unwrap_or_default(),
                        rect: TileRect {
                            x: attr_u32(&attrs, "x", 0)?,
                            y: attr_u32(&attrs, "y", 0)?,
                            width: attr_u32(&attrs, "width", DEFAULT_TILE_SIZE)?,
                            height: attr_u32(&attrs, "height", DEFAULT_TILE_SIZE)?,
                        },
                    });
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(EditorError::Xml(format!("{e}"))),
            _ => {}
        }
    }

    let image_path =
        image_path.ok_or_else(|| EditorError::Xml("no TextureAtlas element".to_string()))?;
    Ok(AtlasDescriptor {
        image_path,
        sub_textures,
    })
}

/// Decodes a fetched atlas image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Crops every sub-texture out of a decoded atlas.
pub fn slice_atlas(atlas: &RgbaImage, desc: &AtlasDescriptor) -> Result<Vec<TileDefinition>> {
    let (image_w, image_h) = atlas.dimensions();
    desc.sub_textures
        .iter()
        .map(|sub| {
            let r = sub.rect;
            let fits = r.width > 0
                && r.height > 0
                && r.x.checked_add(r.width).is_some_and(|e| e <= image_w)
                && r.y.checked_add(r.height).is_some_and(|e| e <= image_h);
            if !fits {
                return Err(EditorError::RectOutOfBounds {
                    name: sub.name.clone(),
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    image_w,
                    image_h,
                });
            }
            let tile = image::imageops::crop_imm(atlas, r.x, r.y, r.width, r.height).to_image();
            Ok(TileDefinition {
                name: sub.name.clone(),
                rect: r,
                image: Arc::new(tile),
            })
        })
        .collect()
}

/// Synchronous half of a load: descriptor + already fetched image bytes.
pub fn atlas_from_bytes(xml: &str, image_bytes: &[u8]) -> Result<Vec<TileDefinition>> {
    let desc = parse_descriptor(xml)?;
    let atlas = decode_image(image_bytes)?;
    slice_atlas(&atlas, &desc)
}

async fn fetch(path: &Path) -> Result<Vec<u8>> {
    let path_str = path.to_string_lossy().into_owned();
    macroquad::file::load_file(&path_str)
        .await
        .map_err(|e| EditorError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, format!("{e:?}")),
        })
}

/// Loads one atlas: the whole image is fetched and decoded before any crop.
pub async fn load_atlas(xml: &str, assets_dir: &Path) -> Result<Vec<TileDefinition>> {
    let desc = parse_descriptor(xml)?;
    let bytes = fetch(&assets_dir.join(&desc.image_path)).await?;
    let atlas = decode_image(&bytes)?;
    slice_atlas(&atlas, &desc)
}

fn descriptor(kind: TilesetKind) -> &'static str {
    match kind {
        TilesetKind::Foreground => TILES_ATLAS,
        TilesetKind::Background => BACKGROUNDS_ATLAS,
        TilesetKind::Entities => ENEMIES_ATLAS,
    }
}

fn with_markers(kind: TilesetKind, tiles: Vec<TileDefinition>) -> Vec<TileDefinition> {
    if kind != TilesetKind::Entities {
        return tiles;
    }
    let mut all = entity_markers();
    all.extend(tiles);
    all
}

/// Loads every tile of a category. Entities are the marker tiles followed by enemies.
pub async fn load_category(kind: TilesetKind, assets_dir: PathBuf) -> Result<Vec<TileDefinition>> {
    let tiles = load_atlas(descriptor(kind), &assets_dir).await?;
    Ok(with_markers(kind, tiles))
}

/// Blocking variant of [`load_category`] for use without a window.
pub fn read_category(kind: TilesetKind, assets_dir: &Path) -> Result<Vec<TileDefinition>> {
    let xml = descriptor(kind);
    let desc = parse_descriptor(xml)?;
    let path = assets_dir.join(&desc.image_path);
    let bytes = std::fs::read(&path).map_err(|source| EditorError::Io { path, source })?;
    let atlas = decode_image(&bytes)?;
    Ok(with_markers(kind, slice_atlas(&atlas, &desc)?))
}

// ---- procedural entity markers ----------------------------------------------

const MARKER_SIZE: u32 = 64;

// 5x7 bitmaps, one row per byte, high bit = left column.
const GLYPH_S: [u8; 7] = [0x0f, 0x10, 0x10, 0x0e, 0x01, 0x01, 0x1e];
const GLYPH_E: [u8; 7] = [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f];
const GLYPH_BANG: [u8; 7] = [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04];

fn draw_marker(color: [u8; 3], glyph: &[u8; 7]) -> RgbaImage {
    let mut img = RgbaImage::new(MARKER_SIZE, MARKER_SIZE);
    let c = MARKER_SIZE as f32 / 2.0;
    for (x, y, px) in img.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - c;
        let dy = y as f32 + 0.5 - c;
        let d = (dx * dx + dy * dy).sqrt();
        if (26.5..=29.5).contains(&d) {
            *px = Rgba([255, 255, 255, 255]);
        } else if d < 26.5 {
            *px = Rgba([color[0], color[1], color[2], 255]);
        }
    }

    // glyph scaled 4x, centred
    let scale = 4;
    let x0 = (MARKER_SIZE - 5 * scale) / 2;
    let y0 = (MARKER_SIZE - 7 * scale) / 2;
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..5u32 {
            if bits & (0x10 >> col) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    img.put_pixel(
                        x0 + col * scale + sx,
                        y0 + row as u32 * scale + sy,
                        Rgba([255, 255, 255, 255]),
                    );
                }
            }
        }
    }
    img
}

/// Start/end/enemy markers, drawn without any atlas.
pub fn entity_markers() -> Vec<TileDefinition> {
    [
        ("start-marker", [0x00, 0xff, 0x00], &GLYPH_S),
        ("end-marker", [0xff, 0x00, 0x00], &GLYPH_E),
        ("enemy-marker", [0xff, 0x00, 0xff], &GLYPH_BANG),
    ]
    .into_iter()
    .map(|(name, color, glyph)| TileDefinition {
        name: name.to_string(),
        rect: TileRect {
            x: 0,
            y: 0,
            width: MARKER_SIZE,
            height: MARKER_SIZE,
        },
        image: Arc::new(draw_marker(color, glyph)),
    })
    .collect()
}

// ---- bundled descriptors --------------------------------------------------------

/// Descriptor of the foreground (terrain and items) atlas.
pub const TILES_ATLAS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TextureAtlas imagePath="spritesheet-tiles-default.png">
	<SubTexture name="block_blue" x="0" y="0" width="64" height="64"/>
	<SubTexture name="terrain_grass_block_top" x="448" y="960" width="64" height="64"/>
	<SubTexture name="terrain_grass_block_center" x="512" y="0" width="64" height="64"/>
	<SubTexture name="terrain_dirt_block_top" x="576" y="448" width="64" height="64"/>
	<SubTexture name="terrain_dirt_block_center" x="576" y="640" width="64" height="64"/>
	<SubTexture name="terrain_sand_block_top" x="256" y="832" width="64" height="64"/>
	<SubTexture name="terrain_sand_block_center" x="256" y="1024" width="64" height="64"/>
	<SubTexture name="terrain_stone_block_top" x="64" y="704" width="64" height="64"/>
	<SubTexture name="terrain_stone_block_center" x="64" y="896" width="64" height="64"/>
	<SubTexture name="coin_gold" x="960" y="512" width="64" height="64"/>
	<SubTexture name="gem_blue" x="896" y="320" width="64" height="64"/>
	<SubTexture name="heart" x="832" y="1088" width="64" height="64"/>
	<SubTexture name="key_blue" x="768" y="64" width="64" height="64"/>
	<SubTexture name="door_closed" x="960" y="192" width="64" height="64"/>
	<SubTexture name="spikes" x="640" y="512" width="64" height="64"/>
	<SubTexture name="ladder_middle" x="704" y="896" width="64" height="64"/>
</TextureAtlas>"#;

/// Descriptor of the background atlas.
pub const BACKGROUNDS_ATLAS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TextureAtlas imagePath="spritesheet-backgrounds-default.png">
	<SubTexture name="background_solid_sky" x="0" y="0" width="256" height="256"/>
	<SubTexture name="background_solid_grass" x="0" y="512" width="256" height="256"/>
	<SubTexture name="background_solid_sand" x="0" y="256" width="256" height="256"/>
	<SubTexture name="background_solid_dirt" x="0" y="768" width="256" height="256"/>
	<SubTexture name="background_color_desert" x="768" y="0" width="256" height="256"/>
	<SubTexture name="background_color_hills" x="512" y="768" width="256" height="256"/>
	<SubTexture name="background_fade_desert" x="512" y="0" width="256" height="256"/>
	<SubTexture name="background_fade_hills" x="256" y="768" width="256" height="256"/>
</TextureAtlas>"#;

/// Descriptor of the enemy atlas, shown after the entity markers.
pub const ENEMIES_ATLAS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TextureAtlas imagePath="spritesheet-enemies-default.png">
	<SubTexture name="enemy_slime_purple" x="0" y="0" width="64" height="64"/>
	<SubTexture name="enemy_snail" x="64" y="64" width="64" height="64"/>
	<SubTexture name="enemy_frog" x="320" y="64" width="64" height="64"/>
	<SubTexture name="enemy_bee" x="192" y="320" width="64" height="64"/>
	<SubTexture name="enemy_fish_blue" x="384" y="192" width="64" height="64"/>
	<SubTexture name="enemy_fish_orange" x="320" y="320" width="64" height="64"/>
	<SubTexture name="enemy_ladybug" x="256" y="192" width="64" height="64"/>
</TextureAtlas>"#;
