//! Command-line interface definitions for News Poster.
//!
//! Every flag is optional: unset flags fall back to the YAML config file (if
//! `--config` is given) and then to built-in defaults. See [`crate::config`].

use clap::Parser;

/// Command-line arguments for the News Poster application.
///
/// # Examples
///
/// ```sh
/// # Top stories, default one hour freshness window
/// news_poster
///
/// # Search feed with a 30 minute window
/// news_poster --news-query "nepal protests" --max-age-minutes 30
///
/// # Operator headline, bypasses freshness and dedup
/// news_poster --headline "Markets closed for Diwali"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Google News search query (Top Stories when unset)
    #[arg(short = 'q', long, env = "NEWS_QUERY")]
    pub news_query: Option<String>,

    /// Explicit RSS feed URL, overrides the Google News feed
    #[arg(long, env = "FEED_URL")]
    pub feed_url: Option<String>,

    /// Freshness window in minutes
    #[arg(short = 'a', long, env = "MAX_AGE_MINUTES")]
    pub max_age_minutes: Option<i64>,

    /// Output directory for the selected image and meta.json
    #[arg(short, long, env = "NEWS_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Path of the dedup state file
    #[arg(short, long, env = "NEWS_STATE_PATH")]
    pub state_path: Option<String>,

    /// File whose contents, when non-empty, override the feed headline
    #[arg(long)]
    pub override_path: Option<String>,

    /// Operator headline, takes precedence over the override file
    #[arg(long)]
    pub headline: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "news_poster",
            "--output-dir",
            "./out",
            "--state-path",
            "./out/last_id.json",
        ]);

        assert_eq!(cli.output_dir.as_deref(), Some("./out"));
        assert_eq!(cli.state_path.as_deref(), Some("./out/last_id.json"));
        assert!(cli.headline.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(&["news_poster", "-q", "sensex", "-a", "45", "-o", "/tmp/out"]);

        assert_eq!(cli.news_query.as_deref(), Some("sensex"));
        assert_eq!(cli.max_age_minutes, Some(45));
        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/out"));
    }

    #[test]
    fn test_cli_headline() {
        let cli = Cli::parse_from(&["news_poster", "--headline", "Markets closed today"]);
        assert_eq!(cli.headline.as_deref(), Some("Markets closed today"));
    }
}
