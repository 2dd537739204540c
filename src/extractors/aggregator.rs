//! Aggregator page extractor: preview metadata of the feed's own listing page.

use super::{ExtractContext, ExtractOutcome, ImageExtractor, meta};
use crate::models::Tier;
use async_trait::async_trait;
use std::borrow::Cow;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Clone, Copy)]
pub struct AggregatorPage;

impl AggregatorPage {
    /// The raw link already resolved to the publisher itself, so there is no
    /// separate aggregator page to consult.
    fn is_publisher_link(ctx: &ExtractContext) -> bool {
        if ctx.blocklist.is_aggregator_url(&ctx.item.link) {
            return false;
        }
        match (host_of(&ctx.item.link), host_of(&ctx.canonical_url)) {
            (Some(raw), Some(canonical)) => raw == canonical,
            _ => false,
        }
    }
}

#[async_trait]
impl ImageExtractor for AggregatorPage {
    fn name(&self) -> &'static str {
        "aggregator_page"
    }

    fn tier(&self) -> Tier {
        Tier::Aggregator
    }

    #[instrument(level = "debug", skip_all, fields(link = %ctx.item.link))]
    async fn extract(&self, ctx: &ExtractContext) -> ExtractOutcome {
        if Self::is_publisher_link(ctx) {
            debug!("Raw link is the publisher page; skipping aggregator scan");
            return ExtractOutcome::NotFound;
        }

        let raw_host = host_of(&ctx.item.link);
        let page = match &ctx.page {
            Some(page) if raw_host.is_some() && page.url.host_str().map(str::to_ascii_lowercase) == raw_host => {
                Cow::Borrowed(page)
            }
            _ => match ctx.http.get_page(&ctx.item.link).await {
                Ok(page) => Cow::Owned(page),
                Err(e) => return ExtractOutcome::Failed(e.to_string()),
            },
        };

        let urls = meta::page_image_urls(&page.body, &page.url);
        match ctx.first_allowed(self.name(), urls) {
            Some(url) => self.found(url),
            None => ExtractOutcome::NotFound,
        }
    }
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}
