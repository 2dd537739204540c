//! Data models shared by the gate, the image pipeline and the output writer.
//!
//! - [`NewsItem`]: a normalized feed entry
//! - [`Fingerprint`]: the dedup key
//! - [`PersistedState`]: the single-record state carried between runs
//! - [`ImageCandidate`] / [`ValidatedImage`]: image URLs before and after download
//! - [`SelectionResult`] / [`RunOutcome`]: what one run hands to the caller

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A news entry in the uniform shape every feed is normalized into.
///
/// Built once by a feed source and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Headline as published in the feed.
    pub title: String,
    /// Link from the feed, often an aggregator redirect.
    pub link: String,
    /// Publish instant, if the feed declared a parseable one.
    pub published_at: Option<DateTime<Utc>>,
    /// Media URL embedded in the entry itself (media:content, enclosure, ...).
    pub embedded_media_url: Option<String>,
    /// Publisher name, when the feed names one.
    pub source: Option<String>,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at: None,
            embedded_media_url: None,
            source: None,
        }
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn embedded_media(mut self, url: impl Into<String>) -> Self {
        self.embedded_media_url = Some(url.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Headline without the trailing `" - Publisher"` that aggregators append.
    pub fn bare_headline(&self) -> &str {
        if let Some(src) = self.source.as_deref() {
            let suffix = format!(" - {}", src);
            if let Some(stripped) = self.title.strip_suffix(&suffix) {
                return stripped.trim();
            }
        }
        match self.title.rsplit_once(" - ") {
            Some((head, tail)) if !head.trim().is_empty() && tail.split_whitespace().count() <= 4 => {
                head.trim()
            }
            _ => self.title.trim(),
        }
    }
}

/// Deterministic dedup key derived from an item's title and link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key was produced by a manual override.
    pub fn is_manual(&self) -> bool {
        self.0.starts_with(crate::gate::MANUAL_PREFIX)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The record carried from one run to the next.
///
/// Only the most recent fingerprint is kept. Every field is optional so that a
/// partially written or older file still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub last_id: Option<Fingerprint>,
    pub last_title: Option<String>,
    pub last_link: Option<String>,
    pub last_canonical_link: Option<String>,
    pub last_published_utc: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub max_age_minutes: Option<i64>,
}

/// Trust ranking of an image source. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Publisher,
    Syndicated,
    Aggregator,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Publisher, Tier::Syndicated, Tier::Aggregator];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Publisher => "publisher",
            Tier::Syndicated => "syndicated",
            Tier::Aggregator => "aggregator",
        };
        f.write_str(s)
    }
}

/// An image URL proposed by one extractor, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: String,
    pub tier: Tier,
    /// Name of the extractor that produced it.
    pub extractor: &'static str,
}

/// A downloaded, decoded candidate that passed the size and blocklist checks.
///
/// `width` and `height` are always at least [`crate::images::MIN_WIDTH`] and
/// [`crate::images::MIN_HEIGHT`]; the validator never builds one otherwise.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub candidate: ImageCandidate,
    pub width: u32,
    pub height: u32,
    /// Host the bytes were finally served from, after redirects.
    pub source_host: String,
    pub pixels: Arc<DynamicImage>,
}

impl ValidatedImage {
    pub fn tier(&self) -> Tier {
        self.candidate.tier
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// The eligible item of a run and the image chosen for it, if any.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub item: NewsItem,
    pub canonical_link: String,
    pub fingerprint: Fingerprint,
    pub image: Option<ValidatedImage>,
}

/// Terminal state of one orchestrated run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Operator headline used; gate bypassed.
    Overridden {
        headline: String,
        fingerprint: Fingerprint,
    },
    /// An eligible item was selected, with or without an image.
    Rendered(SelectionResult),
    /// `age_minutes` is absent when the item carries no publish date.
    SkippedStale { age_minutes: Option<i64> },
    SkippedDuplicate,
    NoNewsFound,
}

/// Outcome classes reported to whoever invoked the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeSignal {
    Rendered,
    SkippedStale,
    SkippedDuplicate,
    NoNewsFound,
}

impl RunOutcome {
    pub fn signal(&self) -> OutcomeSignal {
        match self {
            RunOutcome::Overridden { .. } | RunOutcome::Rendered(_) => OutcomeSignal::Rendered,
            RunOutcome::SkippedStale { .. } => OutcomeSignal::SkippedStale,
            RunOutcome::SkippedDuplicate => OutcomeSignal::SkippedDuplicate,
            RunOutcome::NoNewsFound => OutcomeSignal::NoNewsFound,
        }
    }

    /// Key recorded by this run; skipped and empty runs record none.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            RunOutcome::Overridden { fingerprint, .. } => Some(fingerprint),
            RunOutcome::Rendered(result) => Some(&result.fingerprint),
            _ => None,
        }
    }

    pub fn stale_age_minutes(&self) -> Option<i64> {
        match self {
            RunOutcome::SkippedStale { age_minutes } => *age_minutes,
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeSignal::Rendered => "rendered",
            OutcomeSignal::SkippedStale => "skipped-stale",
            OutcomeSignal::SkippedDuplicate => "skipped-duplicate",
            OutcomeSignal::NoNewsFound => "no-news-found",
        };
        f.write_str(s)
    }
}
