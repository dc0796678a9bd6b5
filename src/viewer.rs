/// Viewer event dispatcher
///
/// `ViewerController` owns everything the overlay depends on and reacts to the
/// events an image viewer emits. Each event is handled to completion before the
/// next one, and every repaint receives an immutable transform snapshot.
use image::RgbaImage;

#[allow(unused_imports)]
use log::{debug, info, warn, error, trace};

use crate::detection::Detection;
use crate::hub::{self, HubIndicator};
use crate::loader::{LoadOutcome, LoadTicket, LoadedImage};
use crate::overlay::{self, OverlayStyle};
use crate::snapshot;
use crate::surface::OverlaySurface;
use crate::transform::{ScaledTransform, ViewMapper, ViewportTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    /// Pan/zoom/rotate viewport; repaints on every view change
    DeepZoom,
    /// Static image scaled to fit; repaints once per load
    Scaled,
}

#[derive(Debug, Clone)]
pub enum ViewerEvent {
    ImageRequested(String),
    ImageLoaded(LoadOutcome),
    ImageFailed { ticket: LoadTicket, error: String },
    ViewChanged(ViewportTransform),
    Resized(u32, u32),
    DetectionsChanged(Vec<Detection>),
}

/// Zoom limits applied to incoming viewport snapshots
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_zoom_image_ratio: f64,
    pub max_zoom_pixel_ratio: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_zoom_image_ratio: 0.8,
            max_zoom_pixel_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
enum ActiveTransform {
    Viewport(ViewportTransform),
    Scaled(ScaledTransform),
}

fn mapper(transform: &Option<ActiveTransform>) -> Option<&dyn ViewMapper> {
    match transform {
        Some(ActiveTransform::Viewport(viewport)) => Some(viewport),
        Some(ActiveTransform::Scaled(scaled)) => Some(scaled),
        None => None,
    }
}

pub struct ViewerController {
    mode: ViewerMode,
    style: OverlayStyle,
    limits: ZoomLimits,
    latest_ticket: LoadTicket,
    requested_source: Option<String>,
    image: Option<LoadedImage>,
    transform: Option<ActiveTransform>,
    detections: Vec<Detection>,
    surface: OverlaySurface,
    repaint_count: usize,
}

impl ViewerController {
    pub fn new(mode: ViewerMode, width: u32, height: u32) -> Self {
        Self {
            mode,
            style: OverlayStyle::default(),
            limits: ZoomLimits::default(),
            latest_ticket: 0,
            requested_source: None,
            image: None,
            transform: None,
            detections: Vec::new(),
            surface: OverlaySurface::new(width, height),
            repaint_count: 0,
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_limits(mut self, limits: ZoomLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn mode(&self) -> ViewerMode {
        self.mode
    }

    pub fn surface(&self) -> &OverlaySurface {
        &self.surface
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Source of the image currently on screen, if any has finished loading
    pub fn displayed_source(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.source.as_str())
    }

    pub fn requested_source(&self) -> Option<&str> {
        self.requested_source.as_deref()
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn latest_ticket(&self) -> LoadTicket {
        self.latest_ticket
    }

    pub fn repaint_count(&self) -> usize {
        self.repaint_count
    }

    pub fn viewport(&self) -> Option<ViewportTransform> {
        match self.transform {
            Some(ActiveTransform::Viewport(viewport)) => Some(viewport),
            _ => None,
        }
    }

    pub fn transform(&self) -> Option<&dyn ViewMapper> {
        mapper(&self.transform)
    }

    /// Start a new image request and return its ticket
    pub fn request_image(&mut self, source: impl Into<String>) -> LoadTicket {
        self.handle(ViewerEvent::ImageRequested(source.into()));
        self.latest_ticket
    }

    /// Dispatch one event; returns true when the overlay was repainted
    pub fn handle(&mut self, event: ViewerEvent) -> bool {
        match event {
            ViewerEvent::ImageRequested(source) => {
                self.latest_ticket += 1;
                debug!("Requesting image {} [ticket {}]", source, self.latest_ticket);
                self.requested_source = Some(source);
                self.image = None;
                self.transform = None;
                self.surface.clear();
                false
            }
            ViewerEvent::ImageLoaded(outcome) => self.on_image_loaded(outcome),
            ViewerEvent::ImageFailed { ticket, error } => {
                if ticket == self.latest_ticket {
                    error!("Failed to load image [ticket {}]: {}", ticket, error);
                } else {
                    debug!("Ignoring failure of stale ticket {}: {}", ticket, error);
                }
                false
            }
            ViewerEvent::ViewChanged(view) => self.on_view_changed(view),
            ViewerEvent::Resized(width, height) => self.on_resized(width, height),
            ViewerEvent::DetectionsChanged(detections) => {
                self.detections = detections;
                self.repaint()
            }
        }
    }

    fn on_image_loaded(&mut self, outcome: LoadOutcome) -> bool {
        if outcome.ticket != self.latest_ticket {
            debug!(
                "Dropping stale load of {} [ticket {}, latest {}]",
                outcome.source, outcome.ticket, self.latest_ticket
            );
            return false;
        }

        let image = match outcome.result {
            Ok(image) => image,
            Err(error) => {
                return self.handle(ViewerEvent::ImageFailed { ticket: outcome.ticket, error });
            }
        };

        info!("Displaying {} ({}x{})", image.source, image.width, image.height);
        self.transform = Some(self.initial_transform(&image));
        self.image = Some(image);
        self.repaint()
    }

    fn initial_transform(&self, image: &LoadedImage) -> ActiveTransform {
        let (width, height) = (f64::from(self.surface.width()), f64::from(self.surface.height()));
        let (natural_w, natural_h) = (f64::from(image.width), f64::from(image.height));
        match self.mode {
            ViewerMode::DeepZoom => {
                ActiveTransform::Viewport(ViewportTransform::home(natural_w, natural_h, width, height))
            }
            ViewerMode::Scaled => {
                // Contain fit: the limiting side decides the rendered size
                let rendered_w = natural_w * (width / natural_w).min(height / natural_h);
                ActiveTransform::Scaled(ScaledTransform::from_sizes(rendered_w, natural_w))
            }
        }
    }

    fn on_view_changed(&mut self, view: ViewportTransform) -> bool {
        if self.mode != ViewerMode::DeepZoom {
            trace!("Ignoring view change in scaled mode");
            return false;
        }
        let Some(image) = &self.image else {
            trace!("Ignoring view change before image load");
            return false;
        };

        let snapshot = ViewportTransform {
            image_width: f64::from(image.width),
            image_height: f64::from(image.height),
            container_width: f64::from(self.surface.width()),
            container_height: f64::from(self.surface.height()),
            ..view
        }
        .constrained(self.limits.min_zoom_image_ratio, self.limits.max_zoom_pixel_ratio);

        self.transform = Some(ActiveTransform::Viewport(snapshot));
        self.repaint()
    }

    fn on_resized(&mut self, width: u32, height: u32) -> bool {
        self.surface.resize(width, height);

        self.transform = match (&self.transform, &self.image) {
            (Some(ActiveTransform::Viewport(viewport)), Some(_)) => Some(ActiveTransform::Viewport(
                viewport.resized(f64::from(width), f64::from(height)),
            )),
            (Some(ActiveTransform::Scaled(_)), Some(image)) => Some(self.initial_transform(image)),
            _ => None,
        };
        self.repaint()
    }

    fn repaint(&mut self) -> bool {
        let painted = overlay::repaint(&self.detections, mapper(&self.transform), &mut self.surface, &self.style);
        if painted {
            self.repaint_count += 1;
        }
        painted
    }

    /// Rectangle of the visible region for the overview thumbnail
    pub fn hub_indicator(&self) -> HubIndicator {
        match (&self.transform, &self.image) {
            (Some(ActiveTransform::Viewport(viewport)), Some(_)) => hub::viewport_indicator(viewport),
            (Some(ActiveTransform::Scaled(_)), Some(_)) => HubIndicator::full(),
            _ => HubIndicator::default(),
        }
    }

    /// Viewer frame with the overlay composited on top, if an image is shown
    pub fn render_frame(&self) -> Option<RgbaImage> {
        let image = self.image.as_ref()?;
        let transform = self.transform()?;
        let mut frame = snapshot::render_view(&image.pixels, transform, self.surface.width(), self.surface.height());
        snapshot::compose(&mut frame, self.surface.image());
        Some(frame)
    }
}
