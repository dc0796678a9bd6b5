pub mod build_info;
pub mod config;
pub mod detection;
pub mod hub;
pub mod loader;
pub mod logging;
pub mod overlay;
pub mod settings;
pub mod snapshot;
pub mod surface;
pub mod transform;
pub mod viewer;

pub use detection::{Detection, InferenceRecord, ParsedDetectionResults};
pub use overlay::{repaint, LabelOverflow, OverlayStyle};
pub use surface::OverlaySurface;
pub use transform::{ScaledTransform, ScreenRect, ViewMapper, ViewportTransform};
pub use viewer::{ViewerController, ViewerEvent, ViewerMode};
