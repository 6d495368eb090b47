use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::notion::NotionError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by a registry or reader-table backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The Notion API rejected or failed the request
    #[error(transparent)]
    Notion(#[from] NotionError),

    /// Backend could not be reached (used by non-HTTP backends)
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Data Structures
// ============================================================================

/// A configured feed endpoint from the feeds registry.
///
/// Read-only snapshot taken once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub title: String,
    pub feed_url: String,
    pub enabled: bool,
}

/// One entry of a fetched feed, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Raw title, possibly carrying markup
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub creator: Option<String>,
    pub content: Option<String>,
}

/// A row of the reader (destination) table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderRecord {
    /// Backend page id, used for archive updates
    pub id: String,
    /// Normalized title
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub source: String,
    pub read: bool,
    pub archived: bool,
}

/// Insert payload for a new reader row.
///
/// `read` and `archived` are not carried: new rows always start unread and
/// unarchived.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub source: String,
    /// Plain-text body attached to the row, if the item had content
    pub body: Option<String>,
}
