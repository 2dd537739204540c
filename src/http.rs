//! Thin wrapper around one shared `reqwest::Client`.
//!
//! Every network call in the pipeline goes through [`HttpClient`], so all of
//! them share the same user agent, timeout and redirect policy.

use crate::config::Settings;
use crate::error::{ConfigError, FetchError};
use reqwest::{Client, redirect};
use tracing::{debug, instrument};
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// A fetched HTML (or other text) document and the URL it was served from.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
}

/// Raw bytes and the URL they were finally served from.
#[derive(Debug, Clone)]
pub struct Download {
    pub url: Url,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    max_image_bytes: usize,
}

impl HttpClient {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let inner = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.clone())
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            inner,
            max_image_bytes: settings.max_image_bytes,
        })
    }

    /// GET a text document, following redirects.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_page(&self, url: &str) -> Result<Page, FetchError> {
        let target = parse_http_url(url)?;
        let resp = self.inner.get(target).send().await?;
        let status = resp.status();
        let final_url = resp.url().clone();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }
        let body = resp.text().await?;
        debug!(final_url = %final_url, bytes = body.len(), "Fetched page");
        Ok(Page {
            url: final_url,
            body,
        })
    }

    /// GET a binary body, aborting once it grows past the image byte limit.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_bytes(&self, url: &str) -> Result<Download, FetchError> {
        let target = parse_http_url(url)?;
        let limit = self.max_image_bytes;
        let mut resp = self.inner.get(target).send().await?;
        let status = resp.status();
        let final_url = resp.url().clone();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }
        if resp.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        debug!(final_url = %final_url, bytes = bytes.len(), "Downloaded body");
        Ok(Download {
            url: final_url,
            bytes,
        })
    }
}

/// Parse `raw` as an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!("unsupported scheme {other}"))),
    }
}

/// Resolve a possibly relative reference found in a page against the page URL.
///
/// Protocol-relative (`//cdn/x.jpg`) and path-relative references are handled;
/// anything that does not end up http(s) yields `None`.
pub fn absolutize(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let joined = base.join(reference).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}
