//! Error types for configuration, HTTP fetches and the state store.
//!
//! None of these ever escape the selection pipeline itself: fetch errors are
//! absorbed as "no candidate" by the resolver, extractors and validator. Only
//! [`ConfigError`] aborts a run, and only before any network activity.

use thiserror::Error;

/// Invalid or unreadable configuration, discovered at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::config::Settings`].
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A setting has a value outside its allowed range.
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The output directory cannot be created or written to.
    #[error("Output directory {path} is not writable: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// A single HTTP fetch that did not produce a usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or is not http(s).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure (DNS, TLS, timeout, redirect loop).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// The body exceeded the configured byte limit.
    #[error("Body larger than {limit} bytes")]
    TooLarge { limit: usize },

    /// The body could not be parsed into the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Failure to persist the dedup state at the end of a run.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
