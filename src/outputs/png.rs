//! PNG writer for the selected image.

use crate::models::ValidatedImage;
use image::ImageFormat;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Re-encode the decoded pixels as PNG at `path`.
#[instrument(level = "info", skip(image), fields(url = %image.candidate.url))]
pub async fn write_png(image: &ValidatedImage, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pixels = image.pixels.clone();
    let target = path.to_path_buf();
    // Encoding a large image is CPU-bound.
    tokio::task::spawn_blocking(move || pixels.save_with_format(&target, ImageFormat::Png)).await??;
    info!(width = image.width, height = image.height, "Wrote image");
    Ok(())
}
