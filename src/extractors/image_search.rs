//! Image-search fallback: queries a public image index for the headline.
//!
//! Only consulted when no Publisher-tier image survived validation. Results
//! point at third-party hosts, so they are ranked as Syndicated at best.

use super::{ExtractContext, ExtractOutcome, ImageExtractor};
use crate::models::Tier;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, instrument};

static RESULT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a.iusc[m]").unwrap());
static MURL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""murl"\s*:\s*"([^"]+)""#).unwrap());

/// `m` attribute payload on a search result anchor.
#[derive(Debug, Deserialize)]
struct ResultMeta {
    murl: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageSearch {
    /// Search URL with a `{query}` placeholder.
    url_template: String,
}

impl ImageSearch {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    fn search_url(&self, headline: &str) -> String {
        self.url_template
            .replace("{query}", &urlencoding::encode(headline))
    }
}

#[async_trait]
impl ImageExtractor for ImageSearch {
    fn name(&self) -> &'static str {
        "image_search"
    }

    fn tier(&self) -> Tier {
        Tier::Syndicated
    }

    fn is_fallback(&self) -> bool {
        true
    }

    #[instrument(level = "debug", skip_all)]
    async fn extract(&self, ctx: &ExtractContext) -> ExtractOutcome {
        let headline = ctx.item.bare_headline();
        if headline.is_empty() {
            return ExtractOutcome::NotFound;
        }
        let url = self.search_url(headline);
        debug!(%url, "Querying image index");

        let page = match ctx.http.get_page(&url).await {
            Ok(page) => page,
            Err(e) => return ExtractOutcome::Failed(e.to_string()),
        };
        match ctx.first_allowed(self.name(), result_urls(&page.body)) {
            Some(url) => self.found(url),
            None => ExtractOutcome::NotFound,
        }
    }
}

/// Full-size image URLs from a results page, in ranking order.
fn result_urls(body: &str) -> Vec<String> {
    let doc = Html::parse_document(body);
    let mut urls = doc
        .select(&RESULT_SEL)
        .filter_map(|a| a.value().attr("m"))
        .filter_map(|m| serde_json::from_str::<ResultMeta>(m).ok())
        .filter_map(|meta| meta.murl)
        .collect::<Vec<_>>();

    // Markup changes often; the JSON fragments survive longer than the anchors.
    if urls.is_empty() {
        urls = MURL_RE
            .captures_iter(body)
            .map(|c| c[1].replace("\\/", "/"))
            .collect();
    }

    urls.into_iter()
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::testing;
    use crate::models::NewsItem;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_result_urls_from_anchor_metadata() {
        let body = r#"<div>
            <a class="iusc" m='{"murl":"https://img.wire.example/a.jpg","turl":"https://tse1.mm.bing.net/th?id=1"}'></a>
            <a class="iusc" m='not json'></a>
            <a class="iusc" m='{"murl":"https://img.other.example/b.png"}'></a>
        </div>"#;
        assert_eq!(
            result_urls(body),
            vec!["https://img.wire.example/a.jpg", "https://img.other.example/b.png"]
        );
    }

    #[test]
    fn test_result_urls_regex_fallback() {
        let body = r#"<script>var x = {"murl":"https:\/\/img.wire.example\/c.jpg"};</script>"#;
        assert_eq!(result_urls(body), vec!["https://img.wire.example/c.jpg"]);
        assert!(result_urls("<html></html>").is_empty());
    }

    #[tokio::test]
    async fn test_queries_with_bare_headline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/search"))
            .and(query_param("q", "Sensex climbs 500 points"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a class="iusc" m='{"murl":"https://img.example/logo.png"}'></a>
                   <a class="iusc" m='{"murl":"https://img.example/markets/sensex.jpg"}'></a>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let search = ImageSearch::new(format!("{}/images/search?q={{query}}", server.uri()));
        let item = NewsItem::new(
            "Sensex climbs 500 points - The Economic Times",
            "https://news.google.com/rss/articles/x",
        );
        let ctx = testing::context(item, "https://publisher.example/x", None);

        let candidate = search.extract(&ctx).await.candidate().unwrap();
        assert_eq!(candidate.url, "https://img.example/markets/sensex.jpg");
        assert_eq!(candidate.tier, Tier::Syndicated);
    }

    #[tokio::test]
    async fn test_search_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let search = ImageSearch::new(format!("{}/s?q={{query}}", server.uri()));
        let ctx = testing::context(NewsItem::new("Headline", "https://a.example/x"), "https://a.example/x", None);
        assert!(matches!(search.extract(&ctx).await, ExtractOutcome::Failed(_)));
    }
}
