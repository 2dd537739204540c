//! Image validator: turns a candidate URL into decoded pixels, or a reason why not.

use super::{MIN_HEIGHT, MIN_WIDTH};
use crate::error::FetchError;
use crate::extractors::blocklist::{BlockReason, Blocklist};
use crate::http::HttpClient;
use crate::models::{ImageCandidate, ValidatedImage};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Why a candidate did not become a [`ValidatedImage`].
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("blocked ({reason:?}): {url}")]
    Blocked { url: String, reason: BlockReason },

    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("undecodable image: {0}")]
    Decode(String),

    #[error("too small: {width}x{height}")]
    TooSmall { width: u32, height: u32 },
}

/// Download and decode `candidate`, enforcing the blocklist on both the
/// requested and the final URL, and the minimum dimensions.
#[instrument(level = "debug", skip(http, blocklist), fields(url = %candidate.url, extractor = candidate.extractor))]
pub async fn validate(
    http: &HttpClient,
    blocklist: &Blocklist,
    candidate: ImageCandidate,
) -> Result<ValidatedImage, Rejection> {
    check(blocklist, &candidate.url)?;

    let download = http.get_bytes(&candidate.url).await?;
    check(blocklist, download.url.as_str())?;
    let source_host = download.url.host_str().unwrap_or_default().to_ascii_lowercase();

    let pixels = tokio::task::spawn_blocking(move || image::load_from_memory(&download.bytes))
        .await
        .map_err(|e| Rejection::Decode(e.to_string()))?
        .map_err(|e| Rejection::Decode(e.to_string()))?;

    let (width, height) = (pixels.width(), pixels.height());
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(Rejection::TooSmall { width, height });
    }
    debug!(width, height, %source_host, "Image validated");

    Ok(ValidatedImage {
        candidate,
        width,
        height,
        source_host,
        pixels: Arc::new(pixels),
    })
}

fn check(blocklist: &Blocklist, url: &str) -> Result<(), Rejection> {
    blocklist.check(url).map_err(|reason| Rejection::Blocked {
        url: url.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::testing::http;
    use crate::images::testing::png;
    use crate::models::Tier;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn candidate(url: String) -> ImageCandidate {
        ImageCandidate {
            url,
            tier: Tier::Publisher,
            extractor: "test",
        }
    }

    async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_accepts_large_enough_image() {
        let server = MockServer::start().await;
        serve(&server, "/hero.png", png(640, 360)).await;

        let img = validate(&http(), &Blocklist::default(), candidate(format!("{}/hero.png", server.uri())))
            .await
            .unwrap();
        assert_eq!((img.width, img.height), (640, 360));
        assert_eq!(img.source_host, "127.0.0.1");
        assert_eq!(img.tier(), Tier::Publisher);
    }

    #[tokio::test]
    async fn test_rejects_small_and_boundary() {
        let server = MockServer::start().await;
        serve(&server, "/narrow.png", png(299, 400)).await;
        serve(&server, "/exact.png", png(300, 200)).await;

        let bl = Blocklist::default();
        let narrow = validate(&http(), &bl, candidate(format!("{}/narrow.png", server.uri()))).await;
        assert!(matches!(narrow, Err(Rejection::TooSmall { width: 299, height: 400 })));

        let exact = validate(&http(), &bl, candidate(format!("{}/exact.png", server.uri()))).await;
        assert!(exact.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_garbage_and_http_errors() {
        let server = MockServer::start().await;
        serve(&server, "/not-an-image.jpg", b"<html>nope</html>".to_vec()).await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let bl = Blocklist::default();
        let garbage = validate(&http(), &bl, candidate(format!("{}/not-an-image.jpg", server.uri()))).await;
        assert!(matches!(garbage, Err(Rejection::Decode(_))));

        let missing = validate(&http(), &bl, candidate(format!("{}/missing.jpg", server.uri()))).await;
        assert!(matches!(missing, Err(Rejection::Fetch(FetchError::Status { status: 404, .. }))));
    }

    #[tokio::test]
    async fn test_blocklist_checked_after_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photo.jpg"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/img/placeholder.png", server.uri())),
            )
            .mount(&server)
            .await;
        serve(&server, "/img/placeholder.png", png(800, 600)).await;

        let res = validate(&http(), &Blocklist::default(), candidate(format!("{}/photo.jpg", server.uri()))).await;
        assert!(matches!(
            res,
            Err(Rejection::Blocked {
                reason: BlockReason::BrandingPath,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_blocked_candidate_never_downloaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png(800, 600)))
            .expect(0)
            .mount(&server)
            .await;

        let res = validate(&http(), &Blocklist::default(), candidate(format!("{}/favicon.ico", server.uri()))).await;
        assert!(matches!(res, Err(Rejection::Blocked { .. })));
    }
}
