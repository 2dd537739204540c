//! Runtime settings: built-in defaults, an optional YAML file, then CLI flags.
//!
//! Everything here is checked by [`Settings::validate`] before the first network
//! request, which makes configuration the only class of error that aborts a run.

use crate::cli::Cli;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss";
pub const DEFAULT_IMAGE_SEARCH_URL: &str =
    "https://www.bing.com/images/search?q={query}&form=HDRSC2&first=1";

/// Region parameters appended to Google News feed URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub hl: String,
    pub gl: String,
    pub ceid: String,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            hl: "en-IN".to_string(),
            gl: "IN".to_string(),
            ceid: "IN:en".to_string(),
        }
    }
}

/// Patterns that keep branding, icons and aggregator assets out of the image pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlocklistSettings {
    /// Path tokens (split on `/ _ - .`) that mark non-article images.
    pub path_tokens: Vec<String>,
    /// File extensions that are never article photos.
    pub extensions: Vec<String>,
    /// Hosts (and their subdomains) serving aggregator assets or image proxies.
    pub blocked_hosts: Vec<String>,
    /// Hosts (and their subdomains) of aggregator-owned CDNs; penalized, not blocked.
    pub penalized_hosts: Vec<String>,
    /// Hosts whose article pages are aggregator listings rather than publisher pages.
    pub aggregator_hosts: Vec<String>,
}

impl Default for BlocklistSettings {
    fn default() -> Self {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        Self {
            path_tokens: s(&[
                "logo",
                "icon",
                "favicon",
                "sprite",
                "placeholder",
                "avatar",
                "blank",
                "spacer",
                "badge",
                "1x1",
                "pixel",
                "default",
            ]),
            extensions: s(&["svg", "ico"]),
            blocked_hosts: s(&["gstatic.com", "news.google.com"]),
            penalized_hosts: s(&["googleusercontent.com", "ggpht.com", "bing.net"]),
            aggregator_hosts: s(&["news.google.com"]),
        }
    }
}

/// Fully merged settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Explicit RSS URL; overrides the Google News URL built from `news_query`.
    pub feed_url: Option<String>,
    /// Google News search query; empty means Top Stories.
    pub news_query: String,
    pub region: Region,
    pub max_items: usize,
    pub max_age_minutes: i64,
    pub output_dir: PathBuf,
    pub state_path: PathBuf,
    pub override_path: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub extractor_timeout_secs: u64,
    /// Upper bound for resolve + extract + validate; unbounded when absent.
    pub run_timeout_secs: Option<u64>,
    pub max_image_bytes: usize,
    /// Image index queried by the search fallback; `{query}` is replaced.
    pub image_search_url: String,
    /// Score multiplier applied to images served from penalized hosts.
    pub aggregator_trust_penalty: f64,
    pub blocklist: BlocklistSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: None,
            news_query: String::new(),
            region: Region::default(),
            max_items: 12,
            max_age_minutes: 60,
            output_dir: PathBuf::from("out"),
            state_path: PathBuf::from("out/last_id.json"),
            override_path: PathBuf::from("headline.txt"),
            user_agent: format!(
                "Mozilla/5.0 (compatible; news_poster/{})",
                env!("CARGO_PKG_VERSION")
            ),
            request_timeout_secs: 10,
            extractor_timeout_secs: 20,
            run_timeout_secs: None,
            max_image_bytes: 15 * 1024 * 1024,
            image_search_url: DEFAULT_IMAGE_SEARCH_URL.to_string(),
            aggregator_trust_penalty: 0.35,
            blocklist: BlocklistSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text; missing fields take their defaults.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Build the settings for this run from defaults, `--config`, then flags.
    #[instrument(level = "info", skip_all)]
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match cli.config.as_deref() {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_string(),
                    source,
                })?;
                info!(path, "Loaded config file");
                Self::from_yaml(&yaml, path)?
            }
            None => Self::default(),
        };
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.feed_url {
            self.feed_url = Some(v.clone());
        }
        if let Some(v) = &cli.news_query {
            self.news_query = v.trim().to_string();
        }
        if let Some(v) = cli.max_age_minutes {
            self.max_age_minutes = v;
        }
        if let Some(v) = &cli.output_dir {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = &cli.state_path {
            self.state_path = PathBuf::from(v);
        }
        if let Some(v) = &cli.override_path {
            self.override_path = PathBuf::from(v);
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        };

        if self.max_age_minutes <= 0 {
            return Err(invalid("max_age_minutes", "must be positive"));
        }
        if chrono::Duration::try_minutes(self.max_age_minutes).is_none() {
            return Err(invalid("max_age_minutes", "out of range"));
        }
        if self.max_items == 0 {
            return Err(invalid("max_items", "must be positive"));
        }
        if self.request_timeout_secs == 0 || self.extractor_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "timeouts must be positive"));
        }
        if self.run_timeout_secs == Some(0) {
            return Err(invalid("run_timeout_secs", "must be positive when set"));
        }
        if self.max_image_bytes == 0 {
            return Err(invalid("max_image_bytes", "must be positive"));
        }
        let p = self.aggregator_trust_penalty;
        if !(p > 0.0 && p <= 1.0) {
            return Err(invalid("aggregator_trust_penalty", "must be in (0, 1]"));
        }
        if let Some(feed) = &self.feed_url {
            if !is_http_url(feed) {
                return Err(invalid("feed_url", "must be an http(s) URL"));
            }
        }
        if !self.image_search_url.contains("{query}") {
            return Err(invalid("image_search_url", "must contain {query}"));
        }
        if !is_http_url(&self.image_search_url.replace("{query}", "x")) {
            return Err(invalid("image_search_url", "must be an http(s) URL"));
        }
        Ok(())
    }

    /// The RSS URL this run reads from.
    pub fn resolved_feed_url(&self) -> String {
        if let Some(url) = &self.feed_url {
            return url.clone();
        }
        let region = format!(
            "hl={}&gl={}&ceid={}",
            self.region.hl, self.region.gl, self.region.ceid
        );
        if self.news_query.is_empty() {
            format!("{}?{}", GOOGLE_NEWS_RSS, region)
        } else {
            format!(
                "{}/search?q={}&{}",
                GOOGLE_NEWS_RSS,
                urlencoding::encode(&self.news_query),
                region
            )
        }
    }

    /// Label recorded in the state file for observability.
    pub fn query_label(&self) -> String {
        if self.news_query.is_empty() {
            "top_stories".to_string()
        } else {
            self.news_query.clone()
        }
    }

    /// Freshness window; saturates for values `validate` would reject.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.max_age_minutes).unwrap_or(chrono::Duration::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn extractor_timeout(&self) -> Duration {
        Duration::from_secs(self.extractor_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

fn is_http_url(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
