//! Selection orchestrator.
//!
//! One call to [`Pipeline::run`] takes the persisted state in and hands the
//! next state back out alongside the outcome. Nothing here writes to disk; the
//! caller persists the new state once the outputs are safely written.
//!
//! ```text
//! manual headline? ──yes──▶ Overridden
//!        │no
//!   feed ─▶ pick ─▶ fresh? ──no──▶ SkippedStale
//!                     │yes
//!                 duplicate? ──yes──▶ SkippedDuplicate
//!                     │no
//!   resolve ─▶ primary extractors ─▶ validate ─┬─▶ select ─▶ Rendered
//!                                             │
//!               (no Publisher image) fallback ┘
//! ```

use crate::config::Settings;
use crate::error::ConfigError;
use crate::extractors::blocklist::Blocklist;
use crate::extractors::{self, ExtractContext, ExtractOutcome, ImageExtractor};
use crate::feeds::google_news::GoogleNewsFeed;
use crate::feeds::{self, FeedSource};
use crate::gate;
use crate::http::HttpClient;
use crate::images::{self, Rejection};
use crate::models::{ImageCandidate, NewsItem, PersistedState, RunOutcome, SelectionResult, Tier, ValidatedImage};
use crate::resolver;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Pipeline {
    settings: Settings,
    http: HttpClient,
    blocklist: Arc<Blocklist>,
    feed: Box<dyn FeedSource>,
    extractors: Vec<Box<dyn ImageExtractor>>,
}

impl Pipeline {
    /// Production wiring: Google News feed and the default extractor list.
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        let http = HttpClient::new(&settings)?;
        let blocklist = Arc::new(Blocklist::new(&settings.blocklist)?);
        let feed = Box::new(GoogleNewsFeed::new(&settings, http.clone()));
        let extractors = extractors::default_extractors(&settings);
        Ok(Self {
            settings,
            http,
            blocklist,
            feed,
            extractors,
        })
    }

    #[cfg(test)]
    pub fn with_feed(mut self, feed: Box<dyn FeedSource>) -> Self {
        self.feed = feed;
        self
    }

    /// Execute one run against `state`. Returns the outcome and the state to
    /// persist; skipped and empty runs hand back `state` unchanged.
    #[instrument(level = "info", skip_all)]
    pub async fn run(
        &self,
        manual: Option<&str>,
        state: &PersistedState,
        now: DateTime<Utc>,
    ) -> (RunOutcome, PersistedState) {
        if let Some(headline) = manual.map(str::trim).filter(|h| !h.is_empty()) {
            info!(headline = %truncate_for_log(headline, 120), "Manual headline supplied; bypassing feed");
            let mut next = gate::commit_manual(headline, state, now);
            self.annotate(&mut next);
            let outcome = RunOutcome::Overridden {
                headline: headline.to_string(),
                fingerprint: gate::manual_fingerprint(headline),
            };
            return (outcome, next);
        }

        let Some(item) = self.fetch_candidate().await else {
            info!("No news found");
            return (RunOutcome::NoNewsFound, state.clone());
        };

        if !gate::is_fresh(&item, now, self.settings.max_age()) {
            let age_minutes = gate::age_minutes(&item, now);
            info!(
                title = %truncate_for_log(&item.title, 120),
                ?age_minutes,
                max_age_minutes = self.settings.max_age_minutes,
                "Newest item is stale; skipping"
            );
            return (RunOutcome::SkippedStale { age_minutes }, state.clone());
        }

        let fingerprint = gate::fingerprint(&item.title, &item.link);
        if gate::is_duplicate(&fingerprint, state) {
            info!(%fingerprint, "Newest item already processed; skipping");
            return (RunOutcome::SkippedDuplicate, state.clone());
        }

        let (canonical_link, image) = match self.settings.run_timeout() {
            Some(limit) => match tokio::time::timeout(limit, self.find_image(&item)).await {
                Ok(found) => found,
                Err(_) => {
                    warn!(?limit, "Image search exceeded the run timeout; continuing without image");
                    (item.link.clone(), None)
                }
            },
            None => self.find_image(&item).await,
        };

        let mut next = gate::commit(fingerprint.clone(), &item, state, now);
        next.last_canonical_link = Some(canonical_link.clone());
        self.annotate(&mut next);

        match &image {
            Some(img) => info!(
                tier = %img.tier(),
                width = img.width,
                height = img.height,
                extractor = img.candidate.extractor,
                "Image selected"
            ),
            None => info!("No usable image; rendering without one"),
        }

        let result = SelectionResult {
            item,
            canonical_link,
            fingerprint,
            image,
        };
        (RunOutcome::Rendered(result), next)
    }

    fn annotate(&self, next: &mut PersistedState) {
        next.query = Some(self.settings.query_label());
        next.max_age_minutes = Some(self.settings.max_age_minutes);
    }

    async fn fetch_candidate(&self) -> Option<NewsItem> {
        match self.feed.fetch_items().await {
            Ok(items) => {
                debug!(feed = self.feed.name(), count = items.len(), "Feed entries");
                feeds::pick_candidate(items)
            }
            Err(e) => {
                warn!(feed = self.feed.name(), error = %e, "Feed unavailable");
                None
            }
        }
    }

    /// Resolve, extract, validate and select. Returns the canonical link and
    /// the winning image.
    async fn find_image(&self, item: &NewsItem) -> (String, Option<ValidatedImage>) {
        let resolution = resolver::resolve(&self.http, &item.link).await;
        let ctx = ExtractContext {
            item: item.clone(),
            canonical_url: resolution.canonical_url,
            page: resolution.page,
            http: self.http.clone(),
            blocklist: Arc::clone(&self.blocklist),
        };

        let primary = self.extract(&ctx, false).await;
        let mut images = self.validate_all(primary).await;

        if !images.iter().any(|img| img.tier() == Tier::Publisher) {
            debug!("No Publisher-tier image; consulting fallback extractors");
            let fallback = self.extract(&ctx, true).await;
            images.extend(self.validate_all(fallback).await);
        }

        let image = images::select(images, &self.blocklist, self.settings.aggregator_trust_penalty);
        (ctx.canonical_url, image)
    }

    /// Run the primary (or fallback) extractors concurrently, each under its
    /// own timeout. Candidates keep extractor order.
    async fn extract(&self, ctx: &ExtractContext, fallback: bool) -> Vec<ImageCandidate> {
        let limit = self.settings.extractor_timeout();
        let runs = self
            .extractors
            .iter()
            .filter(|e| e.is_fallback() == fallback)
            .map(|extractor| async move {
                let name = extractor.name();
                match tokio::time::timeout(limit, extractor.extract(ctx)).await {
                    Ok(ExtractOutcome::Found(candidate)) => {
                        debug!(extractor = name, url = %candidate.url, "Candidate found");
                        Some(candidate)
                    }
                    Ok(ExtractOutcome::NotFound) => {
                        debug!(extractor = name, "No candidate");
                        None
                    }
                    Ok(ExtractOutcome::Failed(reason)) => {
                        warn!(extractor = name, %reason, "Extractor failed");
                        None
                    }
                    Err(_) => {
                        warn!(extractor = name, ?limit, "Extractor timed out");
                        None
                    }
                }
            });

        join_all(runs).await.into_iter().flatten().collect()
    }

    async fn validate_all(&self, candidates: Vec<ImageCandidate>) -> Vec<ValidatedImage> {
        let checks = candidates
            .into_iter()
            .unique_by(|c| c.url.clone())
            .map(|candidate| async move {
                let url = candidate.url.clone();
                let extractor = candidate.extractor;
                match images::validate(&self.http, &self.blocklist, candidate).await {
                    Ok(img) => Some(img),
                    Err(Rejection::TooSmall { width, height }) => {
                        debug!(extractor, %url, width, height, "Image too small");
                        None
                    }
                    Err(e) => {
                        warn!(extractor, %url, error = %e, "Image rejected");
                        None
                    }
                }
            });

        join_all(checks).await.into_iter().flatten().collect()
    }
}
