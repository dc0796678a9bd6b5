/// Asynchronous image loading
///
/// Reads the file with tokio and decodes it on the blocking pool. Each load
/// carries the ticket it was requested with so the viewer can drop
/// completions that belong to a source it has already moved away from.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use image::RgbaImage;
use tokio::time::Instant;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

/// Identifies one image request; strictly increasing per viewer
pub type LoadTicket = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<RgbaImage>,
}

impl LoadedImage {
    pub fn from_rgba(source: impl Into<String>, pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            source: source.into(),
            width,
            height,
            pixels: Arc::new(pixels),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub source: String,
    pub result: Result<LoadedImage, String>,
}

pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbaImage, String> {
    image::load_from_memory(bytes)
        .map(|img| img.into_rgba8())
        .map_err(|e| format!("Failed to decode image: {}", e))
}

async fn read_and_decode(path: PathBuf) -> Result<RgbaImage, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Failed to read image {}: {}", path.display(), e))?;

    tokio::task::spawn_blocking(move || decode_image_bytes(&bytes))
        .await
        .map_err(|e| format!("Image decode task failed: {}", e))?
}

/// Load and decode `path`, tagging the outcome with `ticket`
pub async fn load_image(ticket: LoadTicket, path: impl AsRef<Path>) -> LoadOutcome {
    let path = path.as_ref().to_path_buf();
    let source = path.to_string_lossy().to_string();
    let start = Instant::now();

    let result = read_and_decode(path)
        .await
        .map(|pixels| LoadedImage::from_rgba(source.clone(), pixels));

    match &result {
        Ok(image) => debug!(
            "Loaded {} ({}x{}) in {:?} [ticket {}]",
            source,
            image.width,
            image.height,
            start.elapsed(),
            ticket
        ),
        Err(e) => warn!("Image load failed for {} [ticket {}]: {}", source, ticket, e),
    }

    LoadOutcome { ticket, source, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("slidescope_loader_{}_{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_load_png() {
        let path = temp_path("ok.png");
        RgbaImage::from_pixel(12, 7, Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let outcome = load_image(3, &path).await;
        assert_eq!(outcome.ticket, 3);
        let image = outcome.result.unwrap();
        assert_eq!((image.width, image.height), (12, 7));
        assert_eq!(*image.pixels.get_pixel(0, 0), Rgba([10, 20, 30, 255]));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let outcome = load_image(1, temp_path("missing.png")).await;
        assert!(outcome.result.unwrap_err().contains("Failed to read image"));
    }

    #[tokio::test]
    async fn test_garbage_bytes_is_error() {
        let path = temp_path("garbage.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let outcome = load_image(2, &path).await;
        assert!(outcome.result.unwrap_err().contains("Failed to decode image"));

        std::fs::remove_file(&path).ok();
    }
}
