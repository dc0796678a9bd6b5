/// CPU drawing surface for overlays
///
/// A transparent RGBA canvas with the handful of primitives the overlay needs:
/// clear, filled and stroked rectangles with source-over blending, and 8x8
/// bitmap text.
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};

use crate::transform::ScreenRect;

/// Glyph cell size of the bitmap font in pixels
pub const GLYPH_SIZE: u32 = 8;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Build a colour from 8-bit channels and a 0..1 alpha
pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Rgba<u8> {
    Rgba([r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// Source-over blend of straight-alpha colours
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let channel = |s: u8, d: u8| -> u8 {
        let c = (f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySurface {
    canvas: RgbaImage,
}

impl OverlaySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Resize to the viewer's rendered size; contents are discarded
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.canvas.dimensions() {
            self.canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);
        } else {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    /// True when no pixel has been painted since the last clear
    pub fn is_clear(&self) -> bool {
        self.canvas.pixels().all(|p| p[3] == 0)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.canvas.as_raw()
    }

    /// Blend `color` over the half-open pixel span `[x0, x1) x [y0, y1)`,
    /// clipped to the canvas
    fn fill_span(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
        let width = i64::from(self.canvas.width());
        let height = i64::from(self.canvas.height());
        let (x0, x1) = (x0.clamp(0, width), x1.clamp(0, width));
        let (y0, y1) = (y0.clamp(0, height), y1.clamp(0, height));

        for y in y0..y1 {
            for x in x0..x1 {
                let dst = self.canvas.get_pixel_mut(x as u32, y as u32);
                *dst = blend_pixel(*dst, color);
            }
        }
    }

    pub fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>) {
        self.fill_span(
            rect.x.round() as i64,
            rect.y.round() as i64,
            rect.right().round() as i64,
            rect.bottom().round() as i64,
            color,
        );
    }

    /// Stroke the outline of `rect` with a line centred on its edges
    pub fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, line_width: f64) {
        let half = line_width.max(1.0) / 2.0;

        let ox0 = (rect.x - half).round() as i64;
        let oy0 = (rect.y - half).round() as i64;
        let ox1 = (rect.right() + half).round() as i64;
        let oy1 = (rect.bottom() + half).round() as i64;
        let ix0 = (rect.x + half).round() as i64;
        let iy0 = (rect.y + half).round() as i64;
        let ix1 = (rect.right() - half).round() as i64;
        let iy1 = (rect.bottom() - half).round() as i64;

        if ix0 >= ix1 || iy0 >= iy1 {
            // Box thinner than the line
            self.fill_span(ox0, oy0, ox1, oy1, color);
            return;
        }

        // Bands are disjoint so translucent strokes blend once per pixel
        self.fill_span(ox0, oy0, ox1, iy0, color);
        self.fill_span(ox0, iy1, ox1, oy1, color);
        self.fill_span(ox0, iy0, ix0, iy1, color);
        self.fill_span(ix1, iy0, ox1, iy1, color);
    }

    /// Width in pixels of `text` drawn at integer `scale`
    pub fn measure_text(text: &str, scale: u32) -> f64 {
        f64::from(GLYPH_SIZE * scale.max(1)) * text.chars().count() as f64
    }

    /// Draw `text` with its top-left corner at `(x, y)`
    pub fn draw_text(&mut self, text: &str, x: f64, y: f64, color: Rgba<u8>, scale: u32) {
        let scale = i64::from(scale.max(1));
        let cell = i64::from(GLYPH_SIZE) * scale;
        let origin_x = x.round() as i64;
        let origin_y = y.round() as i64;

        for (index, ch) in text.chars().enumerate() {
            let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
                continue;
            };
            // Origins far off-canvas saturate instead of overflowing
            let cursor_x = origin_x.saturating_add((index as i64).saturating_mul(cell));
            for (row_idx, &row) in glyph.iter().enumerate() {
                for col_idx in 0..GLYPH_SIZE {
                    if (row >> col_idx) & 1 == 0 {
                        continue;
                    }
                    let px = cursor_x.saturating_add(i64::from(col_idx) * scale);
                    let py = origin_y.saturating_add(row_idx as i64 * scale);
                    self.fill_span(px, py, px.saturating_add(scale), py.saturating_add(scale), color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([231, 76, 60, 255]);

    fn painted(surface: &OverlaySurface) -> usize {
        surface.image().pixels().filter(|p| p[3] != 0).count()
    }

    #[test]
    fn test_fill_rect_clips_to_canvas() {
        let mut surface = OverlaySurface::new(10, 10);
        surface.fill_rect(ScreenRect::new(-5.0, -5.0, 8.0, 8.0), RED);
        assert_eq!(painted(&surface), 9);
        assert_eq!(*surface.image().get_pixel(2, 2), RED);
        assert_eq!(*surface.image().get_pixel(3, 3), TRANSPARENT);
    }

    #[test]
    fn test_stroke_rect_outline_only() {
        let mut surface = OverlaySurface::new(40, 40);
        surface.stroke_rect(ScreenRect::new(10.0, 10.0, 20.0, 20.0), RED, 2.0);

        // Outer 22x22 minus inner 18x18
        assert_eq!(painted(&surface), 22 * 22 - 18 * 18);
        assert_eq!(*surface.image().get_pixel(9, 9), RED);
        assert_eq!(*surface.image().get_pixel(20, 20), TRANSPARENT);
    }

    #[test]
    fn test_translucent_stroke_blends_once() {
        let mut surface = OverlaySurface::new(40, 40);
        let color = rgba(231, 76, 60, 0.5);
        surface.stroke_rect(ScreenRect::new(10.0, 10.0, 20.0, 20.0), color, 4.0);
        let corner = *surface.image().get_pixel(9, 9);
        let edge = *surface.image().get_pixel(20, 9);
        assert_eq!(corner, edge);
        assert_eq!(corner[3], 128);
    }

    #[test]
    fn test_blend_over_transparent_keeps_source() {
        let src = rgba(231, 76, 60, 0.8);
        assert_eq!(blend_pixel(TRANSPARENT, src), src);
        assert_eq!(blend_pixel(RED, TRANSPARENT), RED);
    }

    #[test]
    fn test_clear_and_resize() {
        let mut surface = OverlaySurface::new(8, 8);
        surface.fill_rect(ScreenRect::new(0.0, 0.0, 8.0, 8.0), RED);
        assert!(!surface.is_clear());
        surface.clear();
        assert!(surface.is_clear());

        surface.fill_rect(ScreenRect::new(0.0, 0.0, 8.0, 8.0), RED);
        surface.resize(16, 4);
        assert_eq!((surface.width(), surface.height()), (16, 4));
        assert!(surface.is_clear());
    }

    #[test]
    fn test_text_measure_and_draw() {
        assert_eq!(OverlaySurface::measure_text("WBC", 1), 24.0);
        assert_eq!(OverlaySurface::measure_text("WBC", 2), 48.0);
        assert_eq!(OverlaySurface::measure_text("", 1), 0.0);

        let mut surface = OverlaySurface::new(32, 8);
        surface.draw_text("WBC", 0.0, 0.0, RED, 1);
        let count = painted(&surface);
        assert!(count > 0);
        // Nothing beyond the three glyph cells
        assert!(surface.image().enumerate_pixels().all(|(x, _, p)| x < 24 || p[3] == 0));
    }

    #[test]
    fn test_text_at_extreme_origin_is_clipped() {
        let mut surface = OverlaySurface::new(32, 32);
        surface.draw_text("WBC", 1e19, 1e19, RED, 1);
        surface.draw_text("WBC", -1e19, -1e19, RED, 3);
        surface.draw_text("WBC", f64::MAX, 0.0, RED, 1);
        assert!(surface.is_clear());
    }
}
