//! URL filter for branding, icons, placeholders and aggregator-owned assets.
//!
//! Applied by every extractor before a candidate leaves it, and again by the
//! validator on the URL the bytes were actually served from.

use crate::config::BlocklistSettings;
use crate::error::ConfigError;
use regex::Regex;
use url::Url;

/// Why a URL was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    NotHttp,
    BlockedHost,
    BrandingPath,
    Extension,
}

#[derive(Debug, Clone)]
pub struct Blocklist {
    path_re: Option<Regex>,
    extensions: Vec<String>,
    blocked_hosts: Vec<String>,
    penalized_hosts: Vec<String>,
    aggregator_hosts: Vec<String>,
}

impl Blocklist {
    pub fn new(settings: &BlocklistSettings) -> Result<Self, ConfigError> {
        let tokens = settings
            .path_tokens
            .iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(&t))
            .collect::<Vec<_>>();

        let path_re = if tokens.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)(?:^|[/_.\-])(?:{})s?(?:[/_.\-]|$)", tokens.join("|"));
            Some(Regex::new(&pattern).map_err(|e| ConfigError::Invalid {
                field: "blocklist.path_tokens",
                reason: e.to_string(),
            })?)
        };

        Ok(Self {
            path_re,
            extensions: lower_all(&settings.extensions),
            blocked_hosts: lower_all(&settings.blocked_hosts),
            penalized_hosts: lower_all(&settings.penalized_hosts),
            aggregator_hosts: lower_all(&settings.aggregator_hosts),
        })
    }

    /// `Ok(())` when the URL may be used as an article image.
    pub fn check(&self, raw: &str) -> Result<(), BlockReason> {
        let url = Url::parse(raw.trim()).map_err(|_| BlockReason::NotHttp)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BlockReason::NotHttp);
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if host_matches(&host, &self.blocked_hosts) {
            return Err(BlockReason::BlockedHost);
        }

        let path = url.path().to_ascii_lowercase();
        if let Some(ext) = path.rsplit_once('.').map(|(_, ext)| ext) {
            if self.extensions.iter().any(|e| e == ext) {
                return Err(BlockReason::Extension);
            }
        }
        if self.path_re.as_ref().is_some_and(|re| re.is_match(&path)) {
            return Err(BlockReason::BrandingPath);
        }
        Ok(())
    }

    pub fn is_blocked(&self, raw: &str) -> bool {
        self.check(raw).is_err()
    }

    /// Whether images served from `host` get the aggregator trust penalty.
    pub fn is_penalized_host(&self, host: &str) -> bool {
        host_matches(&host.to_ascii_lowercase(), &self.penalized_hosts)
    }

    /// Whether `url` points at an aggregator's own listing page.
    pub fn is_aggregator_url(&self, url: &str) -> bool {
        Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| host_matches(&host, &self.aggregator_hosts))
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new(&BlocklistSettings::default()).expect("default blocklist patterns are valid")
    }
}

fn host_matches(host: &str, domains: &[String]) -> bool {
    domains
        .iter()
        .any(|d| host == d || host.strip_suffix(d.as_str()).is_some_and(|rest| rest.ends_with('.')))
}

fn lower_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
