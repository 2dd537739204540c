//! AMP extractor: the largest image declared on the article's AMP variant.
//!
//! AMP pages must declare `width`/`height` on every `amp-img`, which makes them
//! a cheap way to find the full-size hero image without downloading anything.

use super::{ExtractContext, ExtractOutcome, ImageExtractor, meta};
use crate::models::Tier;
use async_trait::async_trait;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy)]
pub struct AmpPage;

#[async_trait]
impl ImageExtractor for AmpPage {
    fn name(&self) -> &'static str {
        "amp_page"
    }

    fn tier(&self) -> Tier {
        Tier::Publisher
    }

    #[instrument(level = "debug", skip_all, fields(url = %ctx.canonical_url))]
    async fn extract(&self, ctx: &ExtractContext) -> ExtractOutcome {
        if ctx.unresolved_aggregator() {
            return ExtractOutcome::NotFound;
        }
        let amp_url = {
            let page = match ctx.publisher_page().await {
                Ok(page) => page,
                Err(e) => return ExtractOutcome::Failed(e.to_string()),
            };
            match meta::amp_link(&page.body, &page.url) {
                Some(url) => url,
                None => return ExtractOutcome::NotFound,
            }
        };
        debug!(%amp_url, "Found AMP variant");

        let amp = match ctx.http.get_page(&amp_url).await {
            Ok(page) => page,
            Err(e) => return ExtractOutcome::Failed(format!("AMP fetch: {e}")),
        };
        let images = meta::declared_images(&amp.body, &amp.url)
            .into_iter()
            .filter(|img| !ctx.blocklist.is_blocked(&img.url))
            .collect::<Vec<_>>();

        match meta::largest_declared(&images) {
            Some(best) => self.found(best.url.clone()),
            None => ExtractOutcome::NotFound,
        }
    }
}
