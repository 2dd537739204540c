//! Publisher page extractor: the resolved article's own preview metadata.

use super::{ExtractContext, ExtractOutcome, ImageExtractor, meta};
use crate::models::Tier;
use async_trait::async_trait;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy)]
pub struct PublisherPage;

#[async_trait]
impl ImageExtractor for PublisherPage {
    fn name(&self) -> &'static str {
        "publisher_page"
    }

    fn tier(&self) -> Tier {
        Tier::Publisher
    }

    #[instrument(level = "debug", skip_all, fields(url = %ctx.canonical_url))]
    async fn extract(&self, ctx: &ExtractContext) -> ExtractOutcome {
        if ctx.unresolved_aggregator() {
            debug!("Canonical URL is still an aggregator page; nothing publisher-owned to scan");
            return ExtractOutcome::NotFound;
        }
        let page = match ctx.publisher_page().await {
            Ok(page) => page,
            Err(e) => return ExtractOutcome::Failed(e.to_string()),
        };
        let urls = meta::page_image_urls(&page.body, &page.url);
        match ctx.first_allowed(self.name(), urls) {
            Some(url) => self.found(url),
            None => ExtractOutcome::NotFound,
        }
    }
}
