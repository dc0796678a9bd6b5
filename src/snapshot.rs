/// Viewer frame rendering
///
/// Produces what the main viewer would show for a transform: the slide
/// resampled (nearest neighbour) into a frame of the viewer's size on a black
/// background, with an overlay composited on top.
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::surface::blend_pixel;
use crate::transform::ViewMapper;

pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub fn render_view(image: &RgbaImage, transform: &dyn ViewMapper, width: u32, height: u32) -> RgbaImage {
    let mut frame = RgbaImage::from_pixel(width, height, BACKGROUND);
    if width == 0 || height == 0 {
        return frame;
    }

    let (img_w, img_h) = (f64::from(image.width()), f64::from(image.height()));
    let row_len = width as usize * 4;

    // Transforms are affine: unmap two points per row and step linearly.
    // Only these precomputed rows cross into the rayon workers.
    let rows: Vec<((f64, f64), (f64, f64))> = (0..height)
        .map(|y| {
            let cy = f64::from(y) + 0.5;
            let start = transform.unmap_point(0.5, cy);
            let next = transform.unmap_point(1.5, cy);
            (start, (next.0 - start.0, next.1 - start.1))
        })
        .collect();

    let buffer: &mut [u8] = &mut frame;
    buffer
        .par_chunks_mut(row_len)
        .zip(rows.par_iter())
        .for_each(|(row, &(start, step))| {
            for x in 0..width as usize {
                let ix = start.0 + step.0 * x as f64;
                let iy = start.1 + step.1 * x as f64;
                if ix < 0.0 || iy < 0.0 || ix >= img_w || iy >= img_h {
                    continue;
                }
                let pixel = image.get_pixel(ix as u32, iy as u32);
                row[x * 4..x * 4 + 4].copy_from_slice(&pixel.0);
            }
        });

    frame
}

/// Blend `overlay` onto `frame`; both must share dimensions
pub fn compose(frame: &mut RgbaImage, overlay: &RgbaImage) {
    if frame.dimensions() != overlay.dimensions() {
        log::warn!(
            "Overlay size {:?} does not match frame size {:?}, skipping composite",
            overlay.dimensions(),
            frame.dimensions()
        );
        return;
    }
    for (dst, src) in frame.pixels_mut().zip(overlay.pixels()) {
        *dst = blend_pixel(*dst, *src);
    }
}
