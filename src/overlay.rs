/// Detection overlay rendering
///
/// Maps detections from image pixels into surface pixels through the current
/// view transform and paints boxes with labels onto an `OverlaySurface`.
/// `repaint` always clears first, so its output depends only on its inputs.
use image::Rgba;
use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use log::{debug, trace};

use crate::detection::Detection;
use crate::surface::{rgba, OverlaySurface, GLYPH_SIZE};
use crate::transform::{ScreenRect, ViewMapper};

/// What to do with a label that would start above the surface's top edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOverflow {
    /// Push the label down so it stays inside the surface
    #[default]
    Clamp,
    /// Draw at the natural position even if partly off-surface
    Allow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub stroke_color: Rgba<u8>,
    pub line_width: f64,
    pub label_background: Rgba<u8>,
    pub label_text_color: Rgba<u8>,
    pub label_height: f64,
    pub label_padding: f64,
    pub text_scale: u32,
    pub label_overflow: LabelOverflow,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_color: rgba(0xE7, 0x4C, 0x3C, 1.0),
            line_width: 2.0,
            label_background: rgba(231, 76, 60, 0.8),
            label_text_color: rgba(255, 255, 255, 1.0),
            label_height: 20.0,
            label_padding: 4.0,
            text_scale: 1,
            label_overflow: LabelOverflow::Clamp,
        }
    }
}

/// A detection laid out in surface pixels
#[derive(Debug, Clone, PartialEq)]
pub struct MappedDetection {
    pub rect: ScreenRect,
    pub label_rect: ScreenRect,
    /// Top-left corner of the label text
    pub text_origin: (f64, f64),
    pub label: String,
}

fn layout_label(rect: ScreenRect, label: &str, style: &OverlayStyle) -> (ScreenRect, (f64, f64)) {
    let text_width = OverlaySurface::measure_text(label, style.text_scale);
    let mut label_rect = ScreenRect::new(
        rect.x,
        rect.y - style.label_height,
        text_width + style.label_padding * 2.0,
        style.label_height,
    );

    if style.label_overflow == LabelOverflow::Clamp && label_rect.y < 0.0 {
        label_rect.y = 0.0;
    }

    let glyph_height = f64::from(GLYPH_SIZE * style.text_scale.max(1));
    let text_origin = (
        label_rect.x + style.label_padding,
        label_rect.y + (style.label_height - glyph_height) / 2.0,
    );
    (label_rect, text_origin)
}

/// Lay out every detection without painting anything
pub fn map_detections(
    detections: &[Detection],
    transform: &dyn ViewMapper,
    style: &OverlayStyle,
) -> Vec<MappedDetection> {
    detections
        .iter()
        .map(|detection| {
            let rect = transform.map_rect(detection.x1, detection.y1, detection.x2, detection.y2);
            let (label_rect, text_origin) = layout_label(rect, &detection.label, style);
            MappedDetection {
                rect,
                label_rect,
                text_origin,
                label: detection.label.clone(),
            }
        })
        .collect()
}

/// Clear `surface` and paint every detection through `transform`.
///
/// Without a transform (image not loaded yet) the surface is left untouched
/// and `false` is returned.
pub fn repaint(
    detections: &[Detection],
    transform: Option<&dyn ViewMapper>,
    surface: &mut OverlaySurface,
    style: &OverlayStyle,
) -> bool {
    let Some(transform) = transform else {
        trace!("Skipping overlay repaint: no view transform yet");
        return false;
    };

    let mapped = map_detections(detections, transform, style);

    surface.clear();
    for item in &mapped {
        surface.stroke_rect(item.rect, style.stroke_color, style.line_width);
        surface.fill_rect(item.label_rect, style.label_background);
        surface.draw_text(
            &item.label,
            item.text_origin.0,
            item.text_origin.1,
            style.label_text_color,
            style.text_scale,
        );
    }

    trace!(
        "Repainted {} detections on {}x{} overlay",
        mapped.len(),
        surface.width(),
        surface.height()
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{ScaledTransform, ViewportTransform};

    fn sample() -> Vec<Detection> {
        vec![
            Detection::new(121.0, 4.0, 163.0, 45.0, "Circular_RBC"),
            Detection::new(396.0, 312.0, 433.0, 353.0, "Circular_RBC"),
            Detection::new(10.0, 100.0, 60.0, 160.0, "WBC"),
        ]
    }

    #[test]
    fn test_identity_mapping_is_exact() {
        let style = OverlayStyle::default();
        let mapped = map_detections(&sample(), &ScaledTransform::new(1.0), &style);
        for (item, detection) in mapped.iter().zip(sample()) {
            assert_eq!(
                item.rect,
                ScreenRect::new(detection.x1, detection.y1, detection.width(), detection.height())
            );
        }
    }

    #[test]
    fn test_scaled_mapping() {
        let style = OverlayStyle::default();
        let mapped = map_detections(&sample(), &ScaledTransform::new(0.5), &style);
        assert_eq!(mapped[2].rect, ScreenRect::new(5.0, 50.0, 25.0, 30.0));
    }

    #[test]
    fn test_label_sits_above_box() {
        let style = OverlayStyle { label_overflow: LabelOverflow::Allow, ..OverlayStyle::default() };
        let mapped = map_detections(&sample(), &ScaledTransform::new(1.0), &style);

        let wbc = &mapped[2];
        assert_eq!(wbc.label_rect, ScreenRect::new(10.0, 80.0, 24.0 + 8.0, 20.0));
        assert_eq!(wbc.text_origin, (14.0, 86.0));

        // Box at y=4 pushes the unclamped label off the top
        assert_eq!(mapped[0].label_rect.y, -16.0);
    }

    #[test]
    fn test_label_clamped_to_top_edge() {
        let style = OverlayStyle::default();
        let mapped = map_detections(&sample(), &ScaledTransform::new(1.0), &style);
        assert_eq!(mapped[0].label_rect.y, 0.0);
        assert_eq!(mapped[0].text_origin.1, 6.0);
        // Labels with room above are unaffected
        assert_eq!(mapped[1].label_rect.y, 292.0);
    }

    #[test]
    fn test_repaint_is_idempotent() {
        let style = OverlayStyle::default();
        let transform = ViewportTransform::home(800.0, 600.0, 640.0, 480.0)
            .with_zoom(1.7)
            .with_rotation(15.0);

        let mut first = OverlaySurface::new(640, 480);
        let mut second = OverlaySurface::new(640, 480);
        assert!(repaint(&sample(), Some(&transform), &mut first, &style));
        assert!(repaint(&sample(), Some(&transform), &mut second, &style));
        assert!(repaint(&sample(), Some(&transform), &mut second, &style));
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert!(!first.is_clear());
    }

    #[test]
    fn test_repaint_empty_clears() {
        let style = OverlayStyle::default();
        let transform = ScaledTransform::new(1.0);
        let mut surface = OverlaySurface::new(500, 400);
        repaint(&sample(), Some(&transform), &mut surface, &style);
        assert!(!surface.is_clear());

        assert!(repaint(&[], Some(&transform), &mut surface, &style));
        assert!(surface.is_clear());
    }

    #[test]
    fn test_repaint_without_transform_is_noop() {
        let style = OverlayStyle::default();
        let mut surface = OverlaySurface::new(500, 400);
        repaint(&sample(), Some(&ScaledTransform::new(1.0)), &mut surface, &style);
        let before = surface.clone();

        assert!(!repaint(&sample(), None, &mut surface, &style));
        assert_eq!(surface, before);
    }

    #[test]
    fn test_repaint_draws_stroke_and_label() {
        let style = OverlayStyle::default();
        let mut surface = OverlaySurface::new(200, 200);
        let detections = vec![Detection::new(50.0, 60.0, 100.0, 120.0, "WBC")];
        repaint(&detections, Some(&ScaledTransform::new(1.0)), &mut surface, &style);

        let image = surface.image();
        // Stroke on the left edge, below the label
        assert_eq!(*image.get_pixel(50, 90), style.stroke_color);
        // Box interior untouched
        assert_eq!(image.get_pixel(75, 90)[3], 0);
        // Label background corner (no glyph there)
        assert_eq!(*image.get_pixel(51, 41), style.label_background);
        // Past the label width nothing is drawn above the box
        assert_eq!(image.get_pixel(90, 45)[3], 0);
    }

    #[test]
    fn test_repaint_far_off_canvas_draws_nothing() {
        let detections = vec![
            Detection::new(1e19, 1e19, 2e19, 2e19, "WBC"),
            Detection::new(-2e19, -2e19, -1e19, -1e19, "WBC"),
        ];
        for overflow in [LabelOverflow::Clamp, LabelOverflow::Allow] {
            let style = OverlayStyle { label_overflow: overflow, ..OverlayStyle::default() };
            let mut surface = OverlaySurface::new(200, 200);
            assert!(repaint(&detections, Some(&ScaledTransform::new(1.0)), &mut surface, &style));
            assert!(surface.is_clear());
        }
    }
}
