//! Eligibility gate: freshness window and last-seen deduplication.
//!
//! Both checks are pure. The dedup tracker never mutates state in place;
//! [`commit`] returns the next state and the caller decides when to persist it.

use crate::models::{Fingerprint, NewsItem, PersistedState};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

/// Namespace prefix for fingerprints of operator-supplied headlines.
pub const MANUAL_PREFIX: &str = "manual_";

const FINGERPRINT_HEX_LEN: usize = 16;

/// Whether `item` was published within `max_age` of `now`.
///
/// An item without a publish instant is never fresh. The boundary is inclusive:
/// an item exactly `max_age` old still passes.
///
/// # Arguments
///
/// * `item` - The candidate story
/// * `now` - Reference instant for the run
/// * `max_age` - Width of the freshness window
///
/// # Examples
///
/// ```ignore
/// let item = NewsItem::new("t", "https://a.example/x").published_at(now - Duration::minutes(60));
/// assert!(is_fresh(&item, now, Duration::minutes(60)));
/// assert!(!is_fresh(&item, now, Duration::minutes(59)));
/// ```
pub fn is_fresh(item: &NewsItem, now: DateTime<Utc>, max_age: Duration) -> bool {
    match item.published_at {
        Some(published) => now - published <= max_age,
        None => false,
    }
}

/// Age of the item in whole minutes, if it has a publish instant.
pub fn age_minutes(item: &NewsItem, now: DateTime<Utc>) -> Option<i64> {
    item.published_at.map(|p| (now - p).num_minutes())
}

/// Dedup key for an automatically selected item.
///
/// # Returns
///
/// The first 16 hex characters of SHA-256 over `"{title}|{link}"`. Equal
/// inputs always give equal keys, across runs and processes.
///
/// # Examples
///
/// ```ignore
/// let fp = fingerprint("Market rallies", "https://a.example/x");
/// assert_eq!(fp.as_str().len(), 16);
/// assert_eq!(fp, fingerprint("Market rallies", "https://a.example/x"));
/// ```
pub fn fingerprint(title: &str, link: &str) -> Fingerprint {
    Fingerprint::from_raw(short_digest(&format!("{}|{}", title, link)))
}

/// Dedup key for an operator headline; never equal to any [`fingerprint`].
pub fn manual_fingerprint(headline: &str) -> Fingerprint {
    Fingerprint::from_raw(format!("{}{}", MANUAL_PREFIX, short_digest(headline)))
}

fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_HEX_LEN);
    hex
}

pub fn is_duplicate(fp: &Fingerprint, state: &PersistedState) -> bool {
    state.last_id.as_ref() == Some(fp)
}

/// Record `item` as the most recently processed story.
///
/// Observability fields not owned by the gate (`query`, `max_age_minutes`,
/// canonical link) are carried over and can be set by the caller afterwards.
///
/// # Arguments
///
/// * `fp` - Fingerprint of `item`
/// * `item` - The story being recorded
/// * `state` - The state loaded at the start of the run
/// * `now` - Stored as `processed_at`
///
/// # Returns
///
/// The next state. `state` itself is untouched; nothing is written to disk.
pub fn commit(
    fp: Fingerprint,
    item: &NewsItem,
    state: &PersistedState,
    now: DateTime<Utc>,
) -> PersistedState {
    PersistedState {
        last_id: Some(fp),
        last_title: Some(item.title.clone()),
        last_link: Some(item.link.clone()).filter(|l| !l.is_empty()),
        last_canonical_link: None,
        last_published_utc: item.published_at,
        processed_at: Some(now),
        ..state.clone()
    }
}

/// Record an operator headline. Metadata of the previous automatic item is
/// replaced, since the state only remembers the latest run.
pub fn commit_manual(headline: &str, state: &PersistedState, now: DateTime<Utc>) -> PersistedState {
    let item = NewsItem::new(headline, "");
    commit(manual_fingerprint(headline), &item, state, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-09T16:10:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn item_aged(minutes: i64) -> NewsItem {
        NewsItem::new("Market rallies", "https://a.example/x")
            .published_at(now() - Duration::minutes(minutes))
    }

    #[test]
    fn test_missing_timestamp_is_never_fresh() {
        let item = NewsItem::new("Market rallies", "https://a.example/x");
        for max in [0, 1, 60, 60 * 24 * 365] {
            assert!(!is_fresh(&item, now(), Duration::minutes(max)));
        }
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let max = Duration::minutes(60);
        assert!(is_fresh(&item_aged(30), now(), max));
        assert!(is_fresh(&item_aged(60), now(), max));
        assert!(!is_fresh(&item_aged(61), now(), max));
        assert!(!is_fresh(&item_aged(90), now(), max));
    }

    #[test]
    fn test_one_second_past_window_is_stale() {
        let item = NewsItem::new("t", "l")
            .published_at(now() - Duration::minutes(60) - Duration::seconds(1));
        assert!(!is_fresh(&item, now(), Duration::minutes(60)));
    }

    #[test]
    fn test_future_item_is_fresh() {
        assert!(is_fresh(&item_aged(-5), now(), Duration::minutes(60)));
    }

    #[test]
    fn test_age_minutes() {
        assert_eq!(age_minutes(&item_aged(90), now()), Some(90));
        assert_eq!(age_minutes(&NewsItem::new("t", "l"), now()), None);
    }

    #[test]
    fn test_fingerprint_is_deterministic_and_sensitive() {
        let a = fingerprint("Market rallies", "https://a.example/x");
        assert_eq!(a, fingerprint("Market rallies", "https://a.example/x"));
        assert_eq!(a.as_str().len(), 16);
        assert_ne!(a, fingerprint("Market falls", "https://a.example/x"));
        assert_ne!(a, fingerprint("Market rallies", "https://a.example/y"));
    }

    #[test]
    fn test_fingerprint_separator_prevents_shifted_collisions() {
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
    }

    #[test]
    fn test_commit_then_duplicate() {
        let item = item_aged(30);
        let fp = fingerprint(&item.title, &item.link);
        let state = commit(fp.clone(), &item, &PersistedState::default(), now());

        assert!(is_duplicate(&fp, &state));
        assert!(!is_duplicate(&fingerprint("Other", &item.link), &state));
        assert_eq!(state.last_title.as_deref(), Some("Market rallies"));
        assert_eq!(state.processed_at, Some(now()));
    }

    #[test]
    fn test_empty_state_has_no_duplicates() {
        let fp = fingerprint("Market rallies", "https://a.example/x");
        assert!(!is_duplicate(&fp, &PersistedState::default()));
    }

    #[test]
    fn test_commit_keeps_single_fingerprint() {
        let first = item_aged(30);
        let second = NewsItem::new("Bonds slide", "https://b.example/y");
        let fp1 = fingerprint(&first.title, &first.link);
        let fp2 = fingerprint(&second.title, &second.link);

        let state = commit(fp1.clone(), &first, &PersistedState::default(), now());
        let state = commit(fp2.clone(), &second, &state, now());

        assert!(is_duplicate(&fp2, &state));
        assert!(!is_duplicate(&fp1, &state));
    }

    #[test]
    fn test_manual_namespace_is_distinct() {
        let title = "Market rallies";
        let manual = manual_fingerprint(title);
        assert!(manual.is_manual());
        assert!(manual.as_str().starts_with(MANUAL_PREFIX));

        // Same text through the automatic path never matches the manual key.
        assert_ne!(manual, fingerprint(title, ""));
        assert_ne!(manual, fingerprint(title, "https://a.example/x"));

        let state = commit_manual(title, &PersistedState::default(), now());
        assert!(is_duplicate(&manual, &state));
        assert!(!is_duplicate(&fingerprint(title, "https://a.example/x"), &state));
        assert!(state.last_link.is_none());
    }

    #[test]
    fn test_auto_commit_does_not_block_manual() {
        let item = item_aged(10);
        let fp = fingerprint(&item.title, &item.link);
        let state = commit(fp, &item, &PersistedState::default(), now());
        assert!(!is_duplicate(&manual_fingerprint(&item.title), &state));
    }
}
