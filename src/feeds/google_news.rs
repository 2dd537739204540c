//! Google News RSS feed (or any RSS 2.0 feed given by URL).
//!
//! Entries carry their media in several places depending on the publisher; the
//! first usable one becomes the item's embedded media URL:
//! `media:content`, `media:thumbnail`, an image `enclosure`, then an `<img>`
//! inside the HTML description.

use super::FeedSource;
use crate::config::Settings;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::NewsItem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

static DESCRIPTION_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<RssSource>,
    // The deserializer matches on local names, so `media:` is dropped here.
    #[serde(rename = "content", default)]
    media_content: Vec<MediaRef>,
    #[serde(rename = "thumbnail", default)]
    media_thumbnail: Vec<MediaRef>,
    #[serde(default)]
    enclosure: Vec<MediaRef>,
}

#[derive(Debug, Deserialize)]
struct RssSource {
    #[serde(rename = "$text", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
    #[serde(rename = "@medium")]
    medium: Option<String>,
}

impl MediaRef {
    /// Whether the reference is (or may be) an image.
    fn is_image(&self) -> bool {
        let by_type = self.mime.as_deref().map(|t| t.starts_with("image/"));
        let by_medium = self.medium.as_deref().map(|m| m == "image");
        by_type.or(by_medium).unwrap_or(true)
    }

    fn image_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty() && self.is_image())
            .map(str::to_string)
    }
}

pub struct GoogleNewsFeed {
    url: String,
    http: HttpClient,
    max_items: usize,
}

impl GoogleNewsFeed {
    pub fn new(settings: &Settings, http: HttpClient) -> Self {
        Self {
            url: settings.resolved_feed_url(),
            http,
            max_items: settings.max_items,
        }
    }
}

#[async_trait]
impl FeedSource for GoogleNewsFeed {
    fn name(&self) -> &'static str {
        "google_news"
    }

    #[instrument(level = "info", skip(self), fields(url = %self.url))]
    async fn fetch_items(&self) -> Result<Vec<NewsItem>, FetchError> {
        let page = self.http.get_page(&self.url).await?;
        let items = parse_feed(&page.body, self.max_items)?;
        info!(count = items.len(), "Fetched feed entries");
        Ok(items)
    }
}

/// Parse an RSS 2.0 document into news items.
///
/// Only the first `max_items` entries in feed order are considered; entries
/// in that window without a title or link are then dropped.
pub fn parse_feed(xml: &str, max_items: usize) -> Result<Vec<NewsItem>, FetchError> {
    let cleaned = scrub_html_entities(xml);
    let rss: Rss = from_str(&cleaned).map_err(|e| FetchError::Parse(format!("RSS: {e}")))?;

    let items = rss
        .channel
        .items
        .into_iter()
        .take(max_items)
        .filter_map(|entry| {
            let title = entry.title.as_deref().map(str::trim).unwrap_or_default();
            let link = entry.link.as_deref().map(str::trim).unwrap_or_default();
            if title.is_empty() || link.is_empty() {
                debug!(?entry.title, "Skipping feed entry without title or link");
                return None;
            }

            let mut item = NewsItem::new(title, link);
            if let Some(at) = entry.pub_date.as_deref().and_then(parse_date) {
                item = item.published_at(at);
            } else if let Some(raw) = entry.pub_date.as_deref() {
                warn!(pub_date = raw, "Unparseable publish date");
            }
            if let Some(src) = entry.source.as_ref().map(|s| s.name.trim()).filter(|s| !s.is_empty()) {
                item = item.source(src);
            }
            if let Some(media) = embedded_media(&entry) {
                item = item.embedded_media(media);
            }
            Some(item)
        })
        .collect();
    Ok(items)
}

fn embedded_media(entry: &RssItem) -> Option<String> {
    entry
        .media_content
        .iter()
        .chain(&entry.media_thumbnail)
        .chain(&entry.enclosure)
        .find_map(MediaRef::image_url)
        .or_else(|| entry.description.as_deref().and_then(description_image))
}

fn description_image(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&DESCRIPTION_IMG)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| src.starts_with("http://") || src.starts_with("https://") || src.starts_with("//"))
        .map(|src| {
            if src.starts_with("//") {
                format!("https:{src}")
            } else {
                src.to_string()
            }
        })
}

/// RFC 2822 as feeds use it, with RFC 3339 accepted too.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// HTML named entities are not defined in XML and abort the parser.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
