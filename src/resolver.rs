//! Canonical resolver: aggregator link in, publisher URL out.

use crate::http::{HttpClient, Page, absolutize};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

static CANONICAL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="canonical"]"#).unwrap());
static OG_URL: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"meta[property="og:url"]"#).unwrap());

/// Where a raw feed link ended up.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub canonical_url: String,
    /// The final document, when the fetch succeeded.
    pub page: Option<Page>,
}

/// Follow `raw_link` to the publisher. Never fails: on any fetch error the raw
/// link is returned as its own canonical URL, with no page.
///
/// # Arguments
///
/// * `http` - Shared client; redirects are followed by it
/// * `raw_link` - The link as it appeared in the feed
///
/// # Returns
///
/// The canonical URL (`link[rel=canonical]`, else `og:url`, else the final
/// URL after redirects) and the fetched page so extractors can reuse it.
///
/// # Examples
///
/// ```ignore
/// let resolution = resolve(&http, "https://news.google.com/rss/articles/CBMi...").await;
/// println!("{}", resolution.canonical_url);
/// ```
#[instrument(level = "info", skip(http))]
pub async fn resolve(http: &HttpClient, raw_link: &str) -> Resolution {
    match http.get_page(raw_link).await {
        Ok(page) => {
            let canonical = declared_canonical(&page).unwrap_or_else(|| page.url.to_string());
            debug!(final_url = %page.url, %canonical, "Resolved link");
            Resolution {
                canonical_url: canonical,
                page: Some(page),
            }
        }
        Err(e) => {
            warn!(error = %e, "Could not resolve link; keeping the raw link");
            Resolution {
                canonical_url: raw_link.to_string(),
                page: None,
            }
        }
    }
}

/// `link[rel=canonical]`, else `og:url`, resolved against the page URL.
fn declared_canonical(page: &Page) -> Option<String> {
    let doc = Html::parse_document(&page.body);
    let from = |sel: &Selector, attr: &str| {
        doc.select(sel)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|href| absolutize(&page.url, href))
    };
    from(&CANONICAL_LINK, "href").or_else(|| from(&OG_URL, "content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::testing::http;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(url: &str, body: &str) -> Page {
        Page {
            url: Url::parse(url).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_canonical_link_preferred_over_og_url() {
        let p = page(
            "https://m.publisher.example/a?utm=x",
            r#"<meta property="og:url" content="https://publisher.example/og">
               <link rel="canonical" href="/markets/story">"#,
        );
        assert_eq!(
            declared_canonical(&p).as_deref(),
            Some("https://m.publisher.example/markets/story")
        );

        let p = page("https://publisher.example/a", r#"<meta property="og:url" content="https://publisher.example/og">"#);
        assert_eq!(declared_canonical(&p).as_deref(), Some("https://publisher.example/og"));

        let p = page("https://publisher.example/a", r#"<link rel="canonical" href="javascript:void(0)">"#);
        assert_eq!(declared_canonical(&p), None);
    }

    #[tokio::test]
    async fn test_follows_redirect_then_reads_canonical() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/articles/abc"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/story?ref=gn", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<link rel="canonical" href="/world/story">"#),
            )
            .mount(&server)
            .await;

        let res = resolve(&http(), &format!("{}/rss/articles/abc", server.uri())).await;
        assert_eq!(res.canonical_url, format!("{}/world/story", server.uri()));
        assert_eq!(res.page.unwrap().url.path(), "/story");
    }

    #[tokio::test]
    async fn test_redirect_target_when_no_declaration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let url = format!("{}/story", server.uri());
        let res = resolve(&http(), &url).await;
        assert_eq!(res.canonical_url, url);
        assert!(res.page.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_raw_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/gone", server.uri());
        let res = resolve(&http(), &url).await;
        assert_eq!(res.canonical_url, url);
        assert!(res.page.is_none());
    }
}
