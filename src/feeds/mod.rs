//! Feed sources: where candidate news items come from.

pub mod google_news;

use crate::error::FetchError;
use crate::models::NewsItem;
use async_trait::async_trait;

/// Anything that can list recent news items, newest-first or not.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_items(&self) -> Result<Vec<NewsItem>, FetchError>;
}

/// The single item a run considers: the newest dated entry, or the first entry
/// when none carries a date.
pub fn pick_candidate(items: Vec<NewsItem>) -> Option<NewsItem> {
    let newest = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| item.published_at.map(|p| (p, i)))
        // Earliest index wins among equal timestamps.
        .max_by(|(pa, ia), (pb, ib)| pa.cmp(pb).then(ib.cmp(ia)))
        .map(|(_, i)| i);

    let idx = newest.unwrap_or(0);
    items.into_iter().nth(idx)
}
