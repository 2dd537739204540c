//! Feed-embedded extractor: the media URL carried by the feed entry itself.

use super::{ExtractContext, ExtractOutcome, ImageExtractor};
use crate::models::Tier;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy)]
pub struct FeedMedia;

#[async_trait]
impl ImageExtractor for FeedMedia {
    fn name(&self) -> &'static str {
        "feed_media"
    }

    fn tier(&self) -> Tier {
        Tier::Syndicated
    }

    async fn extract(&self, ctx: &ExtractContext) -> ExtractOutcome {
        let embedded = ctx.item.embedded_media_url.clone();
        match ctx.first_allowed(self.name(), embedded) {
            Some(url) => self.found(url),
            None => ExtractOutcome::NotFound,
        }
    }
}
