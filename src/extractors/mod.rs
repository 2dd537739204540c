//! Image candidate extractors.
//!
//! Each extractor is one strategy for proposing an illustrative image for the
//! selected story. They share a single interface, [`ImageExtractor`], and are
//! run as an ordered list by the pipeline. An extractor never aborts the run:
//! every failure is reported as [`ExtractOutcome::Failed`] and the pipeline
//! carries on with whatever the others found.
//!
//! | Extractor | Tier | Source |
//! |-----------|------|--------|
//! | [`publisher::PublisherPage`] | Publisher | Resolved article page metadata |
//! | [`amp::AmpPage`] | Publisher | Largest image on the AMP variant |
//! | [`feed_media::FeedMedia`] | Syndicated | Media URL embedded in the feed entry |
//! | [`image_search::ImageSearch`] | Syndicated | Public image index, fallback only |
//! | [`aggregator::AggregatorPage`] | Aggregator | Aggregator listing page metadata |

pub mod aggregator;
pub mod amp;
pub mod blocklist;
pub mod feed_media;
pub mod image_search;
pub mod meta;
pub mod publisher;

use crate::config::Settings;
use crate::http::{HttpClient, Page};
use crate::models::{ImageCandidate, NewsItem, Tier};
use async_trait::async_trait;
use blocklist::Blocklist;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Everything an extractor may look at. Shared read-only between extractors.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub item: NewsItem,
    /// Publisher URL from the canonical resolver (the raw link if unresolved).
    pub canonical_url: String,
    /// Page fetched by the resolver, when resolution reached a document.
    pub page: Option<Page>,
    pub http: HttpClient,
    pub blocklist: Arc<Blocklist>,
}

impl ExtractContext {
    /// The resolved publisher page, fetching it if the resolver did not.
    pub async fn publisher_page(&self) -> Result<Cow<'_, Page>, crate::error::FetchError> {
        match &self.page {
            Some(page) => Ok(Cow::Borrowed(page)),
            None => self.http.get_page(&self.canonical_url).await.map(Cow::Owned),
        }
    }

    /// Whether the resolved URL is still an aggregator page.
    pub fn unresolved_aggregator(&self) -> bool {
        self.blocklist.is_aggregator_url(&self.canonical_url)
            || self
                .page
                .as_ref()
                .is_some_and(|p| self.blocklist.is_aggregator_url(p.url.as_str()))
    }

    /// First URL of `urls` that passes the blocklist.
    pub fn first_allowed<I>(&self, extractor: &'static str, urls: I) -> Option<String>
    where
        I: IntoIterator<Item = String>,
    {
        urls.into_iter().find(|url| match self.blocklist.check(url) {
            Ok(()) => true,
            Err(reason) => {
                debug!(extractor, %url, ?reason, "Discarded blocklisted image");
                false
            }
        })
    }
}

/// Result of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Found(ImageCandidate),
    /// The source was reachable but offered no usable image.
    NotFound,
    /// The source could not be consulted (network, parse, timeout).
    Failed(String),
}

#[cfg(test)]
impl ExtractOutcome {
    pub fn candidate(self) -> Option<ImageCandidate> {
        match self {
            ExtractOutcome::Found(c) => Some(c),
            _ => None,
        }
    }
}

/// One strategy for proposing an image.
#[async_trait]
pub trait ImageExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn tier(&self) -> Tier;

    /// Fallback extractors are only consulted when the primary extractors left
    /// the Publisher tier empty after validation.
    fn is_fallback(&self) -> bool {
        false
    }

    async fn extract(&self, ctx: &ExtractContext) -> ExtractOutcome;

    fn found(&self, url: String) -> ExtractOutcome {
        ExtractOutcome::Found(ImageCandidate {
            url,
            tier: self.tier(),
            extractor: self.name(),
        })
    }
}

/// The fixed, ordered extractor list used in production.
pub fn default_extractors(settings: &Settings) -> Vec<Box<dyn ImageExtractor>> {
    vec![
        Box::new(publisher::PublisherPage),
        Box::new(amp::AmpPage),
        Box::new(feed_media::FeedMedia),
        Box::new(image_search::ImageSearch::new(settings.image_search_url.clone())),
        Box::new(aggregator::AggregatorPage),
    ]
}
