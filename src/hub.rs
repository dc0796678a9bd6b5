/// Overview ("hub") thumbnail indicator
///
/// The hub shows the whole slide with a rectangle marking what the main viewer
/// currently shows. The rectangle is expressed in percent of the image so it
/// applies to a thumbnail of any size.
use image::{imageops, RgbaImage};

use crate::surface::{blend_pixel, rgba};
use crate::transform::{ScreenRect, ViewportTransform};

/// Visible region in percent of the overview image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubIndicator {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for HubIndicator {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, width: 30.0, height: 30.0 }
    }
}

impl HubIndicator {
    /// Whole image visible
    pub fn full() -> Self {
        Self { x: 0.0, y: 0.0, width: 100.0, height: 100.0 }
    }

    /// Indicator rectangle in thumbnail pixels
    pub fn to_pixels(&self, thumb_width: u32, thumb_height: u32) -> ScreenRect {
        let (w, h) = (f64::from(thumb_width), f64::from(thumb_height));
        ScreenRect::new(
            self.x / 100.0 * w,
            self.y / 100.0 * h,
            self.width / 100.0 * w,
            self.height / 100.0 * h,
        )
    }
}

/// Unrotated visible bounds of the viewport as percentages of the image
pub fn viewport_indicator(viewport: &ViewportTransform) -> HubIndicator {
    let (x, y, width, height) = viewport.visible_bounds();
    HubIndicator {
        x: x / viewport.image_width * 100.0,
        y: y / viewport.image_height * 100.0,
        width: width / viewport.image_width * 100.0,
        height: height / viewport.image_height * 100.0,
    }
}

/// Downscale a slide to `width` pixels wide, keeping aspect ratio
pub fn make_thumbnail(image: &RgbaImage, width: u32) -> RgbaImage {
    let width = width.max(1);
    let height = ((f64::from(image.height()) * f64::from(width) / f64::from(image.width().max(1))).round() as u32).max(1);
    imageops::thumbnail(image, width, height)
}

/// Paint the indicator onto a thumbnail: translucent fill, 2px border
pub fn paint_indicator(thumbnail: &mut RgbaImage, indicator: &HubIndicator) {
    let rect = indicator.to_pixels(thumbnail.width(), thumbnail.height());
    let fill = rgba(231, 76, 60, 0.1);
    let border = rgba(0xE7, 0x4C, 0x3C, 1.0);
    let border_width = 2;

    let w = i64::from(thumbnail.width());
    let h = i64::from(thumbnail.height());
    let x0 = (rect.x.round() as i64).clamp(0, w);
    let y0 = (rect.y.round() as i64).clamp(0, h);
    let x1 = (rect.right().round() as i64).clamp(0, w);
    let y1 = (rect.bottom().round() as i64).clamp(0, h);

    // CSS-style border: drawn inside the box
    let raw_x0 = rect.x.round() as i64;
    let raw_y0 = rect.y.round() as i64;
    let raw_x1 = rect.right().round() as i64;
    let raw_y1 = rect.bottom().round() as i64;

    for y in y0..y1 {
        for x in x0..x1 {
            let on_border = x < raw_x0 + border_width
                || x >= raw_x1 - border_width
                || y < raw_y0 + border_width
                || y >= raw_y1 - border_width;
            let color = if on_border { border } else { fill };
            let dst = thumbnail.get_pixel_mut(x as u32, y as u32);
            *dst = blend_pixel(*dst, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_home_view_covers_image_width() {
        // Square image in a wide container: full height visible, extra width
        let viewport = ViewportTransform::home(1000.0, 1000.0, 800.0, 400.0);
        let indicator = viewport_indicator(&viewport);
        assert!((indicator.y - 0.0).abs() < 1e-9);
        assert!((indicator.height - 100.0).abs() < 1e-9);
        assert!((indicator.width - 200.0).abs() < 1e-9);
        assert!((indicator.x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoomed_view_shrinks_indicator() {
        let viewport = ViewportTransform::home(1000.0, 500.0, 1000.0, 500.0)
            .with_zoom(4.0)
            .with_center(0.25, 0.125);
        let indicator = viewport_indicator(&viewport);
        assert!((indicator.width - 25.0).abs() < 1e-9);
        assert!((indicator.height - 25.0).abs() < 1e-9);
        assert!((indicator.x - 12.5).abs() < 1e-9);
        assert!((indicator.y - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_to_pixels() {
        let rect = HubIndicator::default().to_pixels(200, 100);
        assert_eq!(rect, ScreenRect::new(0.0, 0.0, 60.0, 30.0));
    }

    #[test]
    fn test_paint_indicator() {
        let base = Rgba([0, 0, 0, 255]);
        let mut thumb = RgbaImage::from_pixel(100, 100, base);
        paint_indicator(&mut thumb, &HubIndicator { x: 10.0, y: 10.0, width: 50.0, height: 50.0 });

        assert_eq!(*thumb.get_pixel(10, 10), rgba(0xE7, 0x4C, 0x3C, 1.0));
        assert_eq!(*thumb.get_pixel(59, 30), rgba(0xE7, 0x4C, 0x3C, 1.0));
        let inner = *thumb.get_pixel(30, 30);
        assert_ne!(inner, base);
        assert!(inner[0] > 0 && inner[0] < 60);
        assert_eq!(*thumb.get_pixel(60, 30), base);
        assert_eq!(*thumb.get_pixel(5, 5), base);
    }

    #[test]
    fn test_make_thumbnail_keeps_aspect() {
        let slide = RgbaImage::from_pixel(400, 100, Rgba([1, 2, 3, 255]));
        let thumb = make_thumbnail(&slide, 200);
        assert_eq!(thumb.dimensions(), (200, 50));
    }
}
