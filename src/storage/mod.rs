//! Storage seams for the feeds registry and the reader table.
//!
//! Both tables live in a remote document database. The sync workflow only
//! talks to them through [`FeedRegistry`] and [`ReaderTable`], so the Notion
//! client and the in-process [`MemoryStore`] are interchangeable.

mod memory;
mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use types::{FeedItem, FeedSource, NewRecord, ReaderRecord, StorageError};

/// Source of configured feed endpoints.
#[async_trait]
pub trait FeedRegistry: Send + Sync {
    /// Every registry row, enabled or not, in registry order.
    async fn list_sources(&self) -> Result<Vec<FeedSource>, StorageError>;
}

/// Destination table holding one row per accepted feed item.
///
/// Archived rows are invisible to every query.
#[async_trait]
pub trait ReaderTable: Send + Sync {
    /// True iff a live row has exactly this title or exactly this url.
    async fn contains(&self, title: &str, url: &str) -> Result<bool, StorageError>;

    /// Insert a new unread row, returning its id.
    async fn insert(&self, record: &NewRecord) -> Result<String, StorageError>;

    /// Live rows with `created_at <= cutoff` and `read == false`.
    async fn stale_unread(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<ReaderRecord>, StorageError>;

    /// Set the archived flag on one row.
    async fn archive(&self, id: &str) -> Result<(), StorageError>;
}
