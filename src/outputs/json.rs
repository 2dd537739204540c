//! `meta.json` writer.

use super::RunMeta;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const META_FILE: &str = "meta.json";

/// Serialize `meta` to `<output_dir>/meta.json`, creating the directory if needed.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_meta(meta: &RunMeta, output_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(meta)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = output_dir.join(META_FILE);
    fs::write(&path, json).await?;
    info!(path = %path.display(), uid = %meta.uid, "Wrote meta.json");
    Ok(path)
}
