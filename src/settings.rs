use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn, error};

use crate::overlay::{LabelOverflow, OverlayStyle};
use crate::viewer::ZoomLimits;

/// User-specific settings that persist across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Labels near the top edge: "clamp" or "allow"
    #[serde(default = "default_label_overflow")]
    pub label_overflow: String,

    /// Box outline width in pixels
    #[serde(default = "default_line_width")]
    pub line_width: f64,

    #[serde(default = "default_label_height")]
    pub label_height: f64,

    #[serde(default = "default_label_padding")]
    pub label_padding: f64,

    /// Integer scale of the 8x8 label font
    #[serde(default = "default_text_scale")]
    pub text_scale: u32,

    #[serde(default = "default_viewer_width")]
    pub viewer_width: u32,

    #[serde(default = "default_viewer_height")]
    pub viewer_height: u32,

    /// Overview thumbnail width in pixels
    #[serde(default = "default_hub_width")]
    pub hub_width: u32,

    /// Directory slide images are resolved against
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    #[serde(default = "default_min_zoom_image_ratio")]
    pub min_zoom_image_ratio: f64,

    #[serde(default = "default_max_zoom_pixel_ratio")]
    pub max_zoom_pixel_ratio: f64,
}

fn default_label_overflow() -> String {
    "clamp".to_string()
}

fn default_line_width() -> f64 {
    2.0
}

fn default_label_height() -> f64 {
    20.0
}

fn default_label_padding() -> f64 {
    4.0
}

fn default_text_scale() -> u32 {
    1
}

fn default_viewer_width() -> u32 {
    crate::config::DEFAULT_VIEWER_WIDTH
}

fn default_viewer_height() -> u32 {
    crate::config::DEFAULT_VIEWER_HEIGHT
}

fn default_hub_width() -> u32 {
    crate::config::DEFAULT_HUB_WIDTH
}

fn default_images_dir() -> String {
    "images".to_string()
}

fn default_min_zoom_image_ratio() -> f64 {
    0.8
}

fn default_max_zoom_pixel_ratio() -> f64 {
    2.0
}

/// A string as a single-line YAML scalar, quoted and escaped as needed
fn yaml_string(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(yaml) => yaml.trim_end().to_string(),
        Err(e) => {
            warn!("Failed to serialize settings value {:?}: {}", value, e);
            format!("{:?}", value)
        }
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            label_overflow: default_label_overflow(),
            line_width: default_line_width(),
            label_height: default_label_height(),
            label_padding: default_label_padding(),
            text_scale: default_text_scale(),
            viewer_width: default_viewer_width(),
            viewer_height: default_viewer_height(),
            hub_width: default_hub_width(),
            images_dir: default_images_dir(),
            min_zoom_image_ratio: default_min_zoom_image_ratio(),
            max_zoom_pixel_ratio: default_max_zoom_pixel_ratio(),
        }
    }
}

impl UserSettings {
    /// Get the path to the settings file
    /// On macOS: ~/Library/Application Support/slidescope/settings.yaml
    /// On Linux: ~/.config/slidescope/settings.yaml
    /// On Windows: C:\Users\<user>\AppData\Roaming\slidescope\settings.yaml
    pub fn settings_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."));

        config_dir.join("slidescope").join("settings.yaml")
    }

    /// Load settings from the YAML file
    /// If custom_path is provided, uses that path; otherwise uses the default settings path
    pub fn load(custom_path: Option<&str>) -> Self {
        let path = match custom_path {
            Some(p) => {
                info!("Using custom settings path: {}", p);
                PathBuf::from(p)
            }
            None => Self::settings_path(),
        };

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                match serde_yaml::from_str::<UserSettings>(&contents) {
                    Ok(settings) => {
                        info!("Loaded settings from {:?}", path);
                        debug!("Settings: label_overflow={}, line_width={}, viewer={}x{}",
                            settings.label_overflow, settings.line_width, settings.viewer_width, settings.viewer_height);
                        settings
                    }
                    Err(e) => {
                        error!("Failed to parse settings file at {:?}: {}", path, e);
                        warn!("Using default settings");
                        Self::default()
                    }
                }
            }
            Err(e) => {
                error!("Failed to read settings file at {:?}: {}", path, e);
                warn!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to the default path
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::settings_path())
    }

    /// Save settings to `path` while preserving comments
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create settings directory: {}", e))?;
            }
        }

        // If file exists, try to preserve comments by doing in-place value updates
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => {
                    let updated = self.update_yaml_values(&contents);
                    fs::write(path, updated)
                        .map_err(|e| format!("Failed to write settings file: {}", e))?;
                    info!("Saved settings to {:?} (comments preserved)", path);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Failed to read existing settings file for comment preservation: {}", e);
                }
            }
        }

        let yaml = self.to_yaml_with_comments();
        fs::write(path, yaml)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Update YAML values while preserving existing comments and structure
    fn update_yaml_values(&self, yaml_content: &str) -> String {
        let mut result = yaml_content.to_string();

        result = Self::replace_yaml_value(&result, "label_overflow", &yaml_string(&self.label_overflow));
        result = Self::replace_yaml_value(&result, "line_width", &self.line_width.to_string());
        result = Self::replace_yaml_value(&result, "label_height", &self.label_height.to_string());
        result = Self::replace_yaml_value(&result, "label_padding", &self.label_padding.to_string());
        result = Self::replace_yaml_value(&result, "text_scale", &self.text_scale.to_string());
        result = Self::replace_yaml_value(&result, "viewer_width", &self.viewer_width.to_string());
        result = Self::replace_yaml_value(&result, "viewer_height", &self.viewer_height.to_string());
        result = Self::replace_yaml_value(&result, "hub_width", &self.hub_width.to_string());
        result = Self::replace_yaml_value(&result, "images_dir", &yaml_string(&self.images_dir));
        result = Self::replace_yaml_value(&result, "min_zoom_image_ratio", &self.min_zoom_image_ratio.to_string());
        result = Self::replace_yaml_value(&result, "max_zoom_pixel_ratio", &self.max_zoom_pixel_ratio.to_string());

        result
    }

    /// Replace a YAML key's value while preserving the rest of the line
    fn replace_yaml_value(yaml: &str, key: &str, new_value: &str) -> String {
        let pattern = format!(r"(?m)^(\s*{}\s*:\s*).*$", regex::escape(key));
        match regex::Regex::new(&pattern) {
            Ok(re) => re
                .replace_all(yaml, |caps: &regex::Captures| {
                    format!("{}{}", &caps[1], new_value)
                })
                .to_string(),
            Err(e) => {
                warn!("Failed to create regex for key '{}': {}", key, e);
                yaml.to_string()
            }
        }
    }

    /// Generate YAML content with comments for new files
    fn to_yaml_with_comments(&self) -> String {
        format!(
            r#"# slidescope user settings
# This file is loaded automatically at startup.
# Settings specified here override the default values.

# Labels of boxes near the top edge of the viewer:
# - "clamp": keep the label inside the viewer
# - "allow": draw it above the box even if it leaves the viewer
label_overflow: {}

# Box outline width in pixels
line_width: {}

# Label background height and horizontal padding in pixels
label_height: {}
label_padding: {}

# Integer scale of the 8x8 label font
text_scale: {}

# Main viewer size in pixels
viewer_width: {}
viewer_height: {}

# Overview thumbnail width in pixels
hub_width: {}

# Directory slide images are resolved against (record "filename" is joined to it)
images_dir: {}

# Zoom limits: minimum zoom as a fraction of the home view, and the maximum
# number of screen pixels one image pixel may cover
min_zoom_image_ratio: {}
max_zoom_pixel_ratio: {}
"#,
            yaml_string(&self.label_overflow),
            self.line_width,
            self.label_height,
            self.label_padding,
            self.text_scale,
            self.viewer_width,
            self.viewer_height,
            self.hub_width,
            yaml_string(&self.images_dir),
            self.min_zoom_image_ratio,
            self.max_zoom_pixel_ratio
        )
    }

    /// Convert label_overflow string to LabelOverflow enum
    pub fn get_label_overflow(&self) -> LabelOverflow {
        match self.label_overflow.to_lowercase().as_str() {
            "clamp" => LabelOverflow::Clamp,
            "allow" => LabelOverflow::Allow,
            _ => {
                warn!("Unknown label overflow policy '{}', defaulting to clamp", self.label_overflow);
                LabelOverflow::Clamp
            }
        }
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            line_width: self.line_width,
            label_height: self.label_height,
            label_padding: self.label_padding,
            text_scale: self.text_scale.max(1),
            label_overflow: self.get_label_overflow(),
            ..OverlayStyle::default()
        }
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min_zoom_image_ratio: self.min_zoom_image_ratio,
            max_zoom_pixel_ratio: self.max_zoom_pixel_ratio,
        }
    }
}
