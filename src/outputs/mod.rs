//! Output writers for a finished run.
//!
//! # Submodules
//!
//! - [`json`]: writes `meta.json` describing the selected story
//! - [`png`]: re-encodes the winning image as PNG
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 20250914_0930_sensex-climbs-500-points_3f2a9c1d.png
//! └── meta.json
//! ```
//!
//! Skipped and empty runs write nothing, so the previous `meta.json` stays in
//! place for whatever consumes it.

pub mod json;
pub mod png;

use crate::models::{OutcomeSignal, RunOutcome, SelectionResult, Tier};
use crate::utils::slugify_title;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const SLUG_LEN: usize = 48;
const FP_PREFIX_LEN: usize = 8;

/// Contents of `meta.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub uid: String,
    pub outcome: OutcomeSignal,
    pub title: String,
    pub link: Option<String>,
    pub canonical_link: Option<String>,
    pub published_utc: Option<DateTime<Utc>>,
    pub caption: String,
    pub image: Option<ImageMeta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageMeta {
    pub file: String,
    pub url: String,
    pub tier: Tier,
    pub width: u32,
    pub height: u32,
    pub source_host: String,
}

/// `<YYYYmmdd_HHMM>_<slug>_<fingerprint prefix>.png`
pub fn image_file_name(result: &SelectionResult, now: DateTime<Utc>) -> String {
    let fp = result.fingerprint.as_str();
    format!(
        "{}_{}_{}.png",
        now.format("%Y%m%d_%H%M"),
        slugify_title(&result.item.title, SLUG_LEN),
        &fp[..FP_PREFIX_LEN.min(fp.len())]
    )
}

pub fn caption(title: &str, canonical: Option<&str>) -> String {
    match canonical {
        Some(link) => format!("{}\n\nSource: {}", title, link),
        None => title.to_string(),
    }
}

/// Write the image and `meta.json` for a rendered or overridden run.
///
/// Returns the path of `meta.json`, or `None` when the outcome produces no
/// output.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_run(
    outcome: &RunOutcome,
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let meta = match outcome {
        RunOutcome::Overridden {
            headline,
            fingerprint,
        } => RunMeta {
            uid: fingerprint.to_string(),
            outcome: outcome.signal(),
            title: headline.clone(),
            link: None,
            canonical_link: None,
            published_utc: None,
            caption: caption(headline, None),
            image: None,
        },
        RunOutcome::Rendered(result) => {
            let image = match &result.image {
                Some(img) => {
                    let file = image_file_name(result, now);
                    png::write_png(img, &output_dir.join(&file)).await?;
                    Some(ImageMeta {
                        file,
                        url: img.candidate.url.clone(),
                        tier: img.tier(),
                        width: img.width,
                        height: img.height,
                        source_host: img.source_host.clone(),
                    })
                }
                None => None,
            };
            RunMeta {
                uid: result.fingerprint.to_string(),
                outcome: outcome.signal(),
                title: result.item.title.clone(),
                link: Some(result.item.link.clone()),
                canonical_link: Some(result.canonical_link.clone()),
                published_utc: result.item.published_at,
                caption: caption(&result.item.title, Some(&result.canonical_link)),
                image,
            }
        }
        other => {
            info!(outcome = %other.signal(), "Nothing to write");
            return Ok(None);
        }
    };

    let path = json::write_meta(&meta, output_dir).await?;
    Ok(Some(path))
}
