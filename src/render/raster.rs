use super::RenderTarget;
use crate::command::{DrawCommand, Frame};
use crate::tileset::TileRegistry;
use crate::view::Viewport;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use macroquad::prelude::{Color, Rect, Vec2};
use std::collections::HashMap;

/// Software render target over an RGBA buffer. Used for export and for
/// checking frames without a window.
pub struct RasterCanvas {
    image: RgbaImage,
    scaled: HashMap<(String, u32, u32), RgbaImage>,
}

#[derive(Clone, Copy)]
struct PixelRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl PixelRect {
    fn width(&self) -> u32 {
        (self.x1 - self.x0).max(0) as u32
    }
    fn height(&self) -> u32 {
        (self.y1 - self.y0).max(0) as u32
    }
}

fn to_rgba8(c: Color) -> Rgba<u8> {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([q(c.r), q(c.g), q(c.b), q(c.a)])
}

/// Source-over blend of `src` scaled by `alpha` onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, alpha: f32) {
    let sa = src.0[3] as f32 / 255.0 * alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for i in 0..3 {
        let s = src.0[i] as f32;
        let d = dst.0[i] as f32;
        dst.0[i] = ((s * sa + d * da * (1.0 - sa)) / out_a).round() as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

impl RasterCanvas {
    /// Fully transparent canvas of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        RasterCanvas {
            image: RgbaImage::new(width, height),
            scaled: HashMap::new(),
        }
    }

    /// Pixels drawn so far.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consumes the canvas, returning its pixels.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn to_pixels(vp: &Viewport, r: Rect) -> PixelRect {
        let a = vp.world_to_screen(Vec2::new(r.x, r.y));
        let b = vp.world_to_screen(Vec2::new(r.x + r.w, r.y + r.h));
        PixelRect {
            x0: a.x.round() as i64,
            y0: a.y.round() as i64,
            x1: b.x.round() as i64,
            y1: b.y.round() as i64,
        }
    }

    fn fill(&mut self, r: PixelRect, color: Rgba<u8>, alpha: f32) {
        let (w, h) = (self.image.width() as i64, self.image.height() as i64);
        for y in r.y0.max(0)..r.y1.min(h) {
            for x in r.x0.max(0)..r.x1.min(w) {
                blend(self.image.get_pixel_mut(x as u32, y as u32), color, alpha);
            }
        }
    }

    fn blit(&mut self, src: &RgbaImage, r: PixelRect, alpha: f32) {
        let (w, h) = (self.image.width() as i64, self.image.height() as i64);
        for y in r.y0.max(0)..r.y1.min(h) {
            for x in r.x0.max(0)..r.x1.min(w) {
                let px = *src.get_pixel((x - r.x0) as u32, (y - r.y0) as u32);
                blend(self.image.get_pixel_mut(x as u32, y as u32), px, alpha);
            }
        }
    }

    fn scaled_tile(&mut self, src: &RgbaImage, name: &str, w: u32, h: u32) -> RgbaImage {
        let key = (name.to_string(), w, h);
        self.scaled
            .entry(key)
            .or_insert_with(|| {
                if src.dimensions() == (w, h) {
                    src.clone()
                } else {
                    imageops::resize(src, w, h, FilterType::Nearest)
                }
            })
            .clone()
    }
}

impl RenderTarget for RasterCanvas {
    fn execute(&mut self, frame: &Frame, registry: &TileRegistry) {
        let vp = &frame.viewport;
        for cmd in &frame.commands {
            match cmd {
                DrawCommand::Clear(color) => {
                    let c = to_rgba8(*color);
                    for px in self.image.pixels_mut() {
                        *px = c;
                    }
                }
                DrawCommand::Line {
                    from,
                    to,
                    thickness,
                    color,
                } => {
                    // axis-aligned only; the frame builder never emits diagonals
                    let half = thickness / 2.0;
                    let r = Rect::new(
                        from.x.min(to.x) - half,
                        from.y.min(to.y) - half,
                        (to.x - from.x).abs() + thickness,
                        (to.y - from.y).abs() + thickness,
                    );
                    self.fill(Self::to_pixels(vp, r), to_rgba8(*color), 1.0);
                }
                DrawCommand::Tile { name, dest, alpha } => {
                    let Some(def) = registry.get(name) else {
                        continue;
                    };
                    let r = Self::to_pixels(vp, *dest);
                    if r.width() == 0 || r.height() == 0 {
                        continue;
                    }
                    let tile = self.scaled_tile(&def.image, name, r.width(), r.height());
                    self.blit(&tile, r, *alpha);
                }
                DrawCommand::Fill { dest, color } => {
                    self.fill(Self::to_pixels(vp, *dest), to_rgba8(*color), 1.0);
                }
                DrawCommand::Outline {
                    dest,
                    thickness,
                    color,
                } => {
                    let t = *thickness;
                    let c = to_rgba8(*color);
                    for edge in [
                        Rect::new(dest.x, dest.y, dest.w, t),
                        Rect::new(dest.x, dest.y + dest.h - t, dest.w, t),
                        Rect::new(dest.x, dest.y, t, dest.h),
                        Rect::new(dest.x + dest.w - t, dest.y, t, dest.h),
                    ] {
                        self.fill(Self::to_pixels(vp, edge), c, 1.0);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tileset::{TileDefinition, TileRect};
    use std::sync::Arc;

    #[test]
    fn blend_respects_alpha() {
        let mut dst = Rgba([0, 0, 0, 255]);
        blend(&mut dst, Rgba([255, 255, 255, 255]), 0.5);
        assert_eq!(dst, Rgba([128, 128, 128, 255]));

        let mut empty = Rgba([0, 0, 0, 0]);
        blend(&mut empty, Rgba([200, 10, 10, 255]), 0.5);
        assert_eq!(empty, Rgba([200, 10, 10, 128]));
    }

    #[test]
    fn tiles_are_scaled_into_place() {
        let mut reg = TileRegistry::new();
        reg.merge(
            vec![TileDefinition {
                name: "dot".into(),
                rect: TileRect {
                    x: 0,
                    y: 0,
                    width: 1,
                    height: 1,
                },
                image: Arc::new(RgbaImage::from_pixel(1, 1, Rgba([9, 8, 7, 255]))),
            }],
            1,
        );
        let frame = Frame {
            viewport: Viewport::default(),
            commands: vec![DrawCommand::Tile {
                name: "dot".into(),
                dest: Rect::new(2.0, 2.0, 4.0, 4.0),
                alpha: 1.0,
            }],
        };
        let mut canvas = RasterCanvas::new(8, 8);
        canvas.execute(&frame, &reg);
        let img = canvas.image();
        assert_eq!(img.get_pixel(2, 2), &Rgba([9, 8, 7, 255]));
        assert_eq!(img.get_pixel(5, 5), &Rgba([9, 8, 7, 255]));
        assert_eq!(img.get_pixel(6, 6).0[3], 0);
        assert_eq!(img.get_pixel(1, 1).0[3], 0);
    }
}
