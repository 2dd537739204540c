//! Image selector: one winner among validated candidates.

use super::{MIN_HEIGHT, MIN_WIDTH};
use crate::extractors::blocklist::Blocklist;
use crate::models::{Tier, ValidatedImage};
use tracing::debug;

/// Pixel area scaled down for images served by penalized hosts.
pub fn score(image: &ValidatedImage, blocklist: &Blocklist, penalty: f64) -> f64 {
    let multiplier = if blocklist.is_penalized_host(&image.source_host) {
        penalty
    } else {
        1.0
    };
    image.area() as f64 * multiplier
}

/// Best image of the highest tier that has any. Within a tier the highest
/// score wins and ties go to the earlier candidate. Images under the minimum
/// dimensions never win.
pub fn select(images: Vec<ValidatedImage>, blocklist: &Blocklist, penalty: f64) -> Option<ValidatedImage> {
    let eligible = images
        .into_iter()
        .filter(|i| {
            let big_enough = i.width >= MIN_WIDTH && i.height >= MIN_HEIGHT;
            if !big_enough {
                debug!(url = %i.candidate.url, width = i.width, height = i.height, "Ignoring undersized image");
            }
            big_enough
        })
        .collect::<Vec<_>>();

    for tier in Tier::ALL {
        let mut best: Option<(f64, ValidatedImage)> = None;
        for image in eligible.iter().filter(|i| i.tier() == tier) {
            let s = score(image, blocklist, penalty);
            if best.as_ref().is_none_or(|(top, _)| s > *top) {
                best = Some((s, image.clone()));
            }
        }
        if let Some((s, winner)) = best {
            debug!(%tier, score = s, url = %winner.candidate.url, "Selected image");
            return Some(winner);
        }
    }
    None
}
