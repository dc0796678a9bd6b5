use crate::settings::UserSettings;

// Default values for configuration
// These serve as fallback values and can be used for "reset to defaults" functionality
pub const DEFAULT_VIEWER_WIDTH: u32 = 1024;
pub const DEFAULT_VIEWER_HEIGHT: u32 = 768;
pub const DEFAULT_HUB_WIDTH: u32 = 300;
pub const APP_NAME: &str = "slidescope";

pub struct Config {
    pub viewer_width: u32,     // Main viewer surface width
    pub viewer_height: u32,    // Main viewer surface height
    pub hub_width: u32,        // Overview thumbnail width
    pub images_dir: String,    // Base directory for record filenames
}

impl From<&UserSettings> for Config {
    fn from(settings: &UserSettings) -> Self {
        Config {
            viewer_width: settings.viewer_width,
            viewer_height: settings.viewer_height,
            hub_width: settings.hub_width,
            images_dir: settings.images_dir.clone(),
        }
    }
}
