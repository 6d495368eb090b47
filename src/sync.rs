//! The ingestion workflow: registry → feeds → duplicate check → insert, plus
//! the retention pruner.
//!
//! Everything here runs strictly sequentially. Failures are contained at the
//! narrowest scope that still lets the run make progress:
//!
//! - registry load failure aborts the run ([`SyncError::Registry`])
//! - a fetch/parse failure skips that one source
//! - a lookup, insert or archive failure affects that one item only
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::feed::FetchFeed;
use crate::storage::{FeedItem, FeedRegistry, NewRecord, ReaderTable, StorageError};
use crate::util::{normalize_title, strip_markup};

/// Source recorded for items whose feed names no author.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// How the duplicate check resolves a failed lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Treat the item as new. A transient failure may then produce a
    /// duplicate row, but never loses an item.
    #[default]
    FailOpen,
    /// Treat the item as already recorded. It is retried on the next run.
    FailClosed,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to load feed registry: {0}")]
    Registry(#[source] StorageError),
}

/// Counters for one sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub sources: usize,
    pub disabled: usize,
    pub failed_sources: usize,
    pub items: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub failed_inserts: usize,
    /// Feed entries dropped by the parser for lacking a link
    pub linkless: usize,
}

/// Counters for one pruner pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub matched: usize,
    pub archived: usize,
    pub failed: usize,
}

/// Returns true when the reader table already has a row with this item's
/// normalized title or its link. Never fails: a lookup error is logged and
/// resolved by `policy`.
pub async fn is_duplicate(
    table: &dyn ReaderTable,
    item: &FeedItem,
    policy: DuplicatePolicy,
) -> bool {
    let title = normalize_title(&item.title);
    match table.contains(&title, &item.link).await {
        Ok(found) => found,
        Err(e) => {
            let assume_duplicate = policy == DuplicatePolicy::FailClosed;
            tracing::error!(
                title = %title,
                url = %item.link,
                error = %e,
                assume_duplicate,
                "Error checking duplicate"
            );
            assume_duplicate
        }
    }
}

/// Build the row inserted for `item`. `now` stands in for a missing publish
/// date.
pub fn new_record(item: &FeedItem, now: DateTime<Utc>) -> NewRecord {
    NewRecord {
        title: normalize_title(&item.title),
        url: item.link.clone(),
        created_at: item.published_at.unwrap_or(now),
        source: item
            .creator
            .clone()
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        body: item
            .content
            .as_deref()
            .map(strip_markup)
            .filter(|body| !body.is_empty()),
    }
}

/// Insert `item` into the reader table. Returns whether the row was written;
/// failures are logged, not raised.
pub async fn write_item(table: &dyn ReaderTable, item: &FeedItem) -> bool {
    let record = new_record(item, Utc::now());
    match table.insert(&record).await {
        Ok(id) => {
            tracing::info!(title = %record.title, page_id = %id, "Added item");
            true
        }
        Err(e) => {
            tracing::error!(title = %record.title, url = %record.url, error = %e, "Error adding item");
            false
        }
    }
}

/// Rows created at or before this instant are eligible for archiving.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(retention_days))
}

/// Archive every unread row older than the retention window. Each archive
/// call stands alone: one failure does not stop the rest.
pub async fn prune_stale(
    table: &dyn ReaderTable,
    retention_days: u32,
    now: DateTime<Utc>,
) -> PruneReport {
    let cutoff = retention_cutoff(now, retention_days);
    let mut report = PruneReport::default();

    let stale = match table.stale_unread(cutoff).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(cutoff = %cutoff, error = %e, "Error querying stale unread items");
            return report;
        }
    };
    report.matched = stale.len();

    for record in stale {
        // The backend filter is authoritative, but a read row must never go.
        if record.read || record.created_at > cutoff {
            tracing::warn!(page_id = %record.id, "Backend returned a row outside the prune filter, skipping");
            continue;
        }
        match table.archive(&record.id).await {
            Ok(()) => {
                tracing::debug!(page_id = %record.id, title = %record.title, "Archived stale item");
                report.archived += 1;
            }
            Err(e) => {
                tracing::error!(page_id = %record.id, error = %e, "Error archiving stale item");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        cutoff = %cutoff,
        matched = report.matched,
        archived = report.archived,
        failed = report.failed,
        "Pruned stale unread items"
    );
    report
}

/// Mirror every enabled source into the reader table.
pub async fn run_sync(
    registry: &dyn FeedRegistry,
    table: &dyn ReaderTable,
    fetcher: &dyn FetchFeed,
    policy: DuplicatePolicy,
) -> Result<RunReport, SyncError> {
    let sources = registry.list_sources().await.map_err(SyncError::Registry)?;

    let mut report = RunReport {
        sources: sources.len(),
        ..RunReport::default()
    };

    for source in &sources {
        if !source.enabled {
            tracing::debug!(feed = %source.feed_url, title = %source.title, "Skipping disabled feed");
            report.disabled += 1;
            continue;
        }

        tracing::info!(feed = %source.feed_url, title = %source.title, "Processing feed");
        let parsed = match fetcher.fetch(&source.feed_url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(feed = %source.feed_url, error = %e, "Error processing feed");
                report.failed_sources += 1;
                continue;
            }
        };
        report.linkless += parsed.skipped;

        for item in &parsed.items {
            report.items += 1;
            if is_duplicate(table, item, policy).await {
                tracing::debug!(title = %item.title, "Skipping duplicate");
                report.duplicates += 1;
                continue;
            }
            if write_item(table, item).await {
                report.inserted += 1;
            } else {
                report.failed_inserts += 1;
            }
        }
    }

    tracing::info!(
        sources = report.sources,
        disabled = report.disabled,
        failed_sources = report.failed_sources,
        items = report.items,
        duplicates = report.duplicates,
        inserted = report.inserted,
        failed_inserts = report.failed_inserts,
        "Feed sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn item(title: &str, link: &str) -> FeedItem {
        FeedItem {
            title: title.into(),
            link: link.into(),
            published_at: None,
            creator: None,
            content: None,
        }
    }

    #[test]
    fn test_new_record_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let record = new_record(&item("<b>Hi</b> There", "http://x/1"), now);
        assert_eq!(
            record,
            NewRecord {
                title: "Hi There".into(),
                url: "http://x/1".into(),
                created_at: now,
                source: "Unknown".into(),
                body: None,
            }
        );
    }

    #[test]
    fn test_new_record_uses_item_fields() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let published = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut it = item("Title", "http://x/2");
        it.published_at = Some(published);
        it.creator = Some("Jane".into());
        it.content = Some("<p>Some <em>body</em></p>".into());

        let record = new_record(&it, now);
        assert_eq!(record.created_at, published);
        assert_eq!(record.source, "Jane");
        assert_eq!(record.body.as_deref(), Some("Some body"));
    }

    #[test]
    fn test_new_record_drops_markup_only_body() {
        let mut it = item("T", "u");
        it.content = Some("<br/>".into());
        assert_eq!(new_record(&it, Utc::now()).body, None);
    }

    #[tokio::test]
    async fn test_duplicate_by_normalized_title() {
        let store = MemoryStore::new();
        store.seed("Hi There", "http://other", Utc::now(), false);
        let dup = is_duplicate(&store, &item("<b>Hi</b>  There", "http://x/1"), DuplicatePolicy::FailOpen).await;
        assert!(dup);
    }

    #[tokio::test]
    async fn test_duplicate_by_link() {
        let store = MemoryStore::new();
        store.seed("Something else", "http://x/1", Utc::now(), false);
        let dup = is_duplicate(&store, &item("Fresh", "http://x/1"), DuplicatePolicy::FailOpen).await;
        assert!(dup);
    }

    #[tokio::test]
    async fn test_not_duplicate_when_both_differ() {
        let store = MemoryStore::new();
        store.seed("Other", "http://x/9", Utc::now(), false);
        let dup = is_duplicate(&store, &item("Fresh", "http://x/1"), DuplicatePolicy::FailOpen).await;
        assert!(!dup);
    }

    #[tokio::test]
    async fn test_lookup_failure_follows_policy() {
        let store = MemoryStore::new();
        store.fail_lookups(true);
        let it = item("Fresh", "http://x/1");
        assert!(!is_duplicate(&store, &it, DuplicatePolicy::FailOpen).await);
        assert!(is_duplicate(&store, &it, DuplicatePolicy::FailClosed).await);
    }

    #[tokio::test]
    async fn test_write_item_failure_is_contained() {
        let store = MemoryStore::new();
        store.fail_inserts(true);
        assert!(!write_item(&store, &item("T", "u")).await);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_retention_cutoff() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(
            retention_cutoff(now, 30),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_prune_boundary_is_inclusive() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let at_cutoff = store.seed("edge", "u1", retention_cutoff(now, 30), false);
        let just_after = store.seed(
            "young",
            "u2",
            retention_cutoff(now, 30) + Duration::seconds(1),
            false,
        );

        let report = prune_stale(&store, 30, now).await;
        assert_eq!(report.archived, 1);
        assert!(store.record(&at_cutoff).unwrap().archived);
        assert!(!store.record(&just_after).unwrap().archived);
    }

    #[tokio::test]
    async fn test_prune_query_failure_archives_nothing() {
        let store = MemoryStore::new();
        let id = store.seed("old", "u", Utc::now() - Duration::days(90), false);
        store.fail_lookups(true);

        let report = prune_stale(&store, 30, Utc::now()).await;
        assert_eq!(report, PruneReport::default());
        assert!(!store.record(&id).unwrap().archived);
    }
}
