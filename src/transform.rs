/// Image-to-screen transforms
///
/// Every view the overlay can be drawn on is described by a `ViewMapper`: a
/// mapping from full-resolution image pixels to surface pixels. Two
/// implementations exist, a deep-zoom viewport with pan/zoom/rotation and a
/// plain uniform scale for statically rendered images.

/// Minimal mapping interface the overlay depends on
pub trait ViewMapper {
    /// Image pixel -> surface pixel
    fn map_point(&self, x: f64, y: f64) -> (f64, f64);

    /// Surface pixel -> image pixel
    fn unmap_point(&self, x: f64, y: f64) -> (f64, f64);

    /// Map the two corners of an image-space box and normalise the result
    fn map_rect(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> ScreenRect {
        let a = self.map_point(x1, y1);
        let b = self.map_point(x2, y2);
        ScreenRect::from_corners(a, b)
    }
}

/// Axis-aligned rectangle in surface pixels, width and height never negative
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let min_x = a.0.min(b.0);
        let min_y = a.1.min(b.1);
        Self {
            x: min_x,
            y: min_y,
            width: a.0.max(b.0) - min_x,
            height: a.1.max(b.1) - min_y,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Snapshot of a deep-zoom viewport.
///
/// Viewport coordinates normalise the image width to 1.0, so the image spans
/// `[0, 1] x [0, height / width]`. `zoom` 1.0 means the image width fills
/// the container width. Rotation is in degrees, clockwise on screen, about the
/// container centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub image_width: f64,
    pub image_height: f64,
    pub container_width: f64,
    pub container_height: f64,
    pub zoom: f64,
    pub center: (f64, f64),
    pub rotation: f64,
}

impl ViewportTransform {
    /// Home view: the whole image fitted inside the container and centred
    pub fn home(image_width: f64, image_height: f64, container_width: f64, container_height: f64) -> Self {
        let aspect = image_height / image_width;
        Self {
            image_width,
            image_height,
            container_width,
            container_height,
            zoom: Self::fit_zoom(aspect, container_width, container_height),
            center: (0.5, aspect / 2.0),
            rotation: 0.0,
        }
    }

    fn fit_zoom(aspect: f64, container_width: f64, container_height: f64) -> f64 {
        if container_width <= 0.0 || aspect <= 0.0 {
            return 1.0;
        }
        (container_height / (aspect * container_width)).min(1.0)
    }

    /// Zoom the home view would use for the current container
    pub fn home_zoom(&self) -> f64 {
        Self::fit_zoom(self.image_height / self.image_width, self.container_width, self.container_height)
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_center(mut self, x: f64, y: f64) -> Self {
        self.center = (x, y);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees.rem_euclid(360.0);
        self
    }

    /// Same view reflowed into a new container; zoom relative to the home
    /// view is kept
    pub fn resized(self, container_width: f64, container_height: f64) -> Self {
        let relative = self.zoom / self.home_zoom();
        let mut resized = Self { container_width, container_height, ..self };
        resized.zoom = resized.home_zoom() * relative;
        resized
    }

    /// Pan by a screen-space delta in pixels
    pub fn pan_by(mut self, dx: f64, dy: f64) -> Self {
        let (ux, uy) = self.unrotate(dx, dy);
        let scale = self.viewport_scale();
        self.center.0 -= ux / scale;
        self.center.1 -= uy / scale;
        self
    }

    /// Zoom by `factor` keeping the image point under the screen point
    /// `(sx, sy)` fixed
    pub fn zoom_by(self, factor: f64, sx: f64, sy: f64) -> Self {
        let (ix, iy) = self.unmap_point(sx, sy);
        let zoomed = Self { zoom: self.zoom * factor, ..self };
        let (nx, ny) = zoomed.map_point(ix, iy);
        zoomed.pan_by(sx - nx, sy - ny)
    }

    /// Clamp zoom between `min_zoom_image_ratio` of the home zoom and the
    /// zoom where one image pixel covers `max_zoom_pixel_ratio` screen pixels
    pub fn constrained(mut self, min_zoom_image_ratio: f64, max_zoom_pixel_ratio: f64) -> Self {
        let min_zoom = self.home_zoom() * min_zoom_image_ratio;
        let max_zoom = (max_zoom_pixel_ratio * self.image_width / self.container_width).max(min_zoom);
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
        self
    }

    /// Surface pixels per viewport unit
    fn viewport_scale(&self) -> f64 {
        self.container_width * self.zoom
    }

    /// Surface pixels per image pixel
    pub fn pixel_ratio(&self) -> f64 {
        self.viewport_scale() / self.image_width
    }

    fn rotate(&self, dx: f64, dy: f64) -> (f64, f64) {
        if self.rotation == 0.0 {
            return (dx, dy);
        }
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (dx * cos - dy * sin, dx * sin + dy * cos)
    }

    fn unrotate(&self, dx: f64, dy: f64) -> (f64, f64) {
        if self.rotation == 0.0 {
            return (dx, dy);
        }
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// Visible region in image pixels, ignoring rotation
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let scale = self.viewport_scale();
        let width = self.container_width / scale;
        let height = self.container_height / scale;
        let left = self.center.0 - width / 2.0;
        let top = self.center.1 - height / 2.0;
        (
            left * self.image_width,
            top * self.image_width,
            width * self.image_width,
            height * self.image_width,
        )
    }
}

impl ViewMapper for ViewportTransform {
    fn map_point(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = self.viewport_scale();
        let dx = (x / self.image_width - self.center.0) * scale;
        let dy = (y / self.image_width - self.center.1) * scale;
        let (rx, ry) = self.rotate(dx, dy);
        (rx + self.container_width / 2.0, ry + self.container_height / 2.0)
    }

    fn unmap_point(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = self.viewport_scale();
        let (ux, uy) = self.unrotate(x - self.container_width / 2.0, y - self.container_height / 2.0);
        (
            (ux / scale + self.center.0) * self.image_width,
            (uy / scale + self.center.1) * self.image_width,
        )
    }
}

/// Uniform scale for an image rendered at a fixed size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledTransform {
    pub scale: f64,
}

impl ScaledTransform {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Scale = rendered width / natural width
    pub fn from_sizes(rendered_width: f64, natural_width: f64) -> Self {
        if natural_width <= 0.0 {
            return Self::new(1.0);
        }
        Self::new(rendered_width / natural_width)
    }
}

impl ViewMapper for ScaledTransform {
    fn map_point(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale, y * self.scale)
    }

    fn unmap_point(&self, x: f64, y: f64) -> (f64, f64) {
        (x / self.scale, y / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_rect_eq(actual: ScreenRect, expected: ScreenRect) {
        assert!((actual.x - expected.x).abs() < EPS, "x: {:?} vs {:?}", actual, expected);
        assert!((actual.y - expected.y).abs() < EPS, "y: {:?} vs {:?}", actual, expected);
        assert!((actual.width - expected.width).abs() < EPS, "w: {:?} vs {:?}", actual, expected);
        assert!((actual.height - expected.height).abs() < EPS, "h: {:?} vs {:?}", actual, expected);
    }

    /// Viewport where one image pixel is one screen pixel at the origin
    fn identity_viewport() -> ViewportTransform {
        ViewportTransform::home(800.0, 600.0, 800.0, 600.0)
    }

    #[test]
    fn test_identity_maps_exactly() {
        let scaled = ScaledTransform::new(1.0);
        let viewport = identity_viewport();
        assert_eq!(viewport.zoom, 1.0);

        for &(x1, y1, x2, y2) in &[(0.0, 0.0, 1.0, 1.0), (121.0, 4.0, 163.0, 45.0), (396.0, 312.0, 433.0, 353.0)] {
            let expected = ScreenRect::new(x1, y1, x2 - x1, y2 - y1);
            assert_eq!(scaled.map_rect(x1, y1, x2, y2), expected);
            assert_rect_eq(viewport.map_rect(x1, y1, x2, y2), expected);
        }
    }

    #[test]
    fn test_uniform_scale_about_origin() {
        for &s in &[0.25, 0.5, 2.0, 3.5] {
            let scaled = ScaledTransform::new(s);
            assert_rect_eq(
                scaled.map_rect(10.0, 20.0, 50.0, 60.0),
                ScreenRect::new(10.0 * s, 20.0 * s, 40.0 * s, 40.0 * s),
            );

            let viewport = identity_viewport()
                .with_zoom(s)
                .with_center(0.5 / s, 0.375 / s);
            assert_rect_eq(
                viewport.map_rect(10.0, 20.0, 50.0, 60.0),
                ScreenRect::new(10.0 * s, 20.0 * s, 40.0 * s, 40.0 * s),
            );
        }
    }

    #[test]
    fn test_rotation_swaps_extent() {
        let viewport = identity_viewport().with_rotation(90.0);
        let rect = viewport.map_rect(10.0, 10.0, 20.0, 30.0);
        assert!((rect.width - 20.0).abs() < EPS);
        assert!((rect.height - 10.0).abs() < EPS);
        assert!(rect.width >= 0.0 && rect.height >= 0.0);

        let flipped = identity_viewport().with_rotation(180.0);
        let rect = flipped.map_rect(10.0, 10.0, 20.0, 30.0);
        assert!((rect.width - 10.0).abs() < 1e-6);
        assert!((rect.height - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_unmap_inverts_map() {
        let viewport = ViewportTransform::home(4000.0, 3000.0, 1024.0, 768.0)
            .with_zoom(3.0)
            .with_center(0.3, 0.2)
            .with_rotation(30.0);
        let (sx, sy) = viewport.map_point(1234.0, 567.0);
        let (x, y) = viewport.unmap_point(sx, sy);
        assert!((x - 1234.0).abs() < 1e-6);
        assert!((y - 567.0).abs() < 1e-6);
    }

    #[test]
    fn test_home_fits_image() {
        // Tall image in a wide container: height is the limiting side
        let viewport = ViewportTransform::home(1000.0, 2000.0, 800.0, 400.0);
        let (_, top) = viewport.map_point(0.0, 0.0);
        let (_, bottom) = viewport.map_point(0.0, 2000.0);
        assert!(top.abs() < EPS);
        assert!((bottom - 400.0).abs() < EPS);

        let (x, y, w, h) = viewport.visible_bounds();
        assert!((h - 2000.0).abs() < 1e-6);
        assert!((w - 4000.0).abs() < 1e-6);
        assert!((x + 1500.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_zoom_by_keeps_anchor() {
        let viewport = identity_viewport();
        let zoomed = viewport.zoom_by(2.0, 200.0, 150.0);
        let (sx, sy) = zoomed.map_point(200.0, 150.0);
        assert!((sx - 200.0).abs() < 1e-6);
        assert!((sy - 150.0).abs() < 1e-6);
        assert!((zoomed.pixel_ratio() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_pan_by_moves_content() {
        let panned = identity_viewport().with_rotation(90.0).pan_by(15.0, -5.0);
        let before = identity_viewport().with_rotation(90.0).map_point(100.0, 100.0);
        let after = panned.map_point(100.0, 100.0);
        assert!((after.0 - before.0 - 15.0).abs() < 1e-6);
        assert!((after.1 - before.1 + 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_constrained_clamps_zoom() {
        let viewport = identity_viewport();
        let too_far = viewport.with_zoom(0.1).constrained(0.8, 2.0);
        assert!((too_far.zoom - 0.8).abs() < EPS);

        let too_close = viewport.with_zoom(50.0).constrained(0.8, 2.0);
        assert!((too_close.pixel_ratio() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_resized_keeps_relative_zoom() {
        let viewport = ViewportTransform::home(1000.0, 1000.0, 500.0, 500.0).with_zoom(2.0);
        let resized = viewport.resized(1000.0, 500.0);
        assert!((resized.zoom / resized.home_zoom() - 2.0).abs() < EPS);
        assert_eq!(resized.center, viewport.center);
    }
}
