use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::borrow::Cow;

use super::client::NotionClient;
use super::filter::{format_timestamp, Filter};
use super::types::{
    paragraph_block, reader_schema, registry_schema, rich_text_value, title_value, Page,
    MAX_TEXT_LEN,
};
use crate::storage::{FeedRegistry, FeedSource, NewRecord, ReaderRecord, ReaderTable, StorageError};
use crate::util::truncate_chars;

/// The feeds registry and reader databases of one Notion workspace.
#[derive(Debug, Clone)]
pub struct NotionTables {
    client: NotionClient,
    feeds_database_id: String,
    reader_database_id: String,
}

impl NotionTables {
    pub fn new(
        client: NotionClient,
        feeds_database_id: impl Into<String>,
        reader_database_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            feeds_database_id: feeds_database_id.into(),
            reader_database_id: reader_database_id.into(),
        }
    }
}

/// Registry row → source. Rows without a link are unusable and dropped; a
/// missing `Enabled` property counts as enabled.
fn source_from_page(page: &Page) -> Option<FeedSource> {
    let feed_url = page
        .url(registry_schema::LINK)
        .filter(|u| !u.trim().is_empty())?;
    Some(FeedSource {
        title: page.title(registry_schema::TITLE).unwrap_or_default(),
        feed_url,
        enabled: page.checkbox(registry_schema::ENABLED).unwrap_or(true),
    })
}

/// Reader row → record. Falls back to the page creation time when the date
/// property is empty.
fn record_from_page(page: &Page) -> Option<ReaderRecord> {
    let created_at = page
        .date_start(reader_schema::CREATED_AT)
        .or(page.created_time)?;
    Some(ReaderRecord {
        id: page.id.clone(),
        title: page.title(reader_schema::TITLE).unwrap_or_default(),
        url: page.url(reader_schema::URL).unwrap_or_default(),
        created_at,
        source: page
            .rich_text(reader_schema::SOURCE)
            .unwrap_or_default(),
        read: page.checkbox(reader_schema::READ).unwrap_or(false),
        archived: page.archived,
    })
}

/// Clamp a property value to Notion's per-value limit.
///
/// Writes and lookups go through the same clamp, so an oversized title or
/// link still matches the row it produced.
fn bounded(value: &str) -> Cow<'_, str> {
    let clamped = truncate_chars(value, MAX_TEXT_LEN);
    if matches!(clamped, Cow::Owned(_)) {
        tracing::warn!(
            chars = value.chars().count(),
            limit = MAX_TEXT_LEN,
            "Property value exceeds Notion limit, truncating"
        );
    }
    clamped
}

fn record_properties(record: &NewRecord) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(reader_schema::TITLE.into(), title_value(&bounded(&record.title)));
    properties.insert(
        reader_schema::URL.into(),
        serde_json::json!({ "url": bounded(&record.url) }),
    );
    properties.insert(
        reader_schema::CREATED_AT.into(),
        serde_json::json!({ "date": { "start": format_timestamp(&record.created_at) } }),
    );
    properties.insert(
        reader_schema::SOURCE.into(),
        rich_text_value(&bounded(&record.source)),
    );
    properties
}

#[async_trait]
impl FeedRegistry for NotionTables {
    async fn list_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        let pages = self.client.query_all(&self.feeds_database_id, None).await?;

        let sources: Vec<FeedSource> = pages
            .iter()
            .filter_map(|page| {
                let source = source_from_page(page);
                if source.is_none() {
                    tracing::warn!(page_id = %page.id, "Registry row has no feed link, ignoring");
                }
                source
            })
            .collect();

        tracing::debug!(rows = pages.len(), sources = sources.len(), "Loaded feed registry");
        Ok(sources)
    }
}

#[async_trait]
impl ReaderTable for NotionTables {
    async fn contains(&self, title: &str, url: &str) -> Result<bool, StorageError> {
        let filter = Filter::Or(vec![
            Filter::TitleEquals {
                property: reader_schema::TITLE,
                value: bounded(title).into_owned(),
            },
            Filter::UrlEquals {
                property: reader_schema::URL,
                value: bounded(url).into_owned(),
            },
        ]);
        let response = self
            .client
            .query_database(&self.reader_database_id, Some(&filter), None, Some(1))
            .await?;
        Ok(!response.results.is_empty())
    }

    async fn insert(&self, record: &NewRecord) -> Result<String, StorageError> {
        let children = record
            .body
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| vec![paragraph_block(&truncate_chars(b, MAX_TEXT_LEN))])
            .unwrap_or_default();

        let page = self
            .client
            .create_page(&self.reader_database_id, record_properties(record), children)
            .await?;
        Ok(page.id)
    }

    async fn stale_unread(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ReaderRecord>, StorageError> {
        let filter = Filter::And(vec![
            Filter::DateOnOrBefore {
                property: reader_schema::CREATED_AT,
                value: cutoff,
            },
            Filter::CheckboxEquals {
                property: reader_schema::READ,
                value: false,
            },
        ]);
        let pages = self
            .client
            .query_all(&self.reader_database_id, Some(&filter))
            .await?;

        Ok(pages
            .iter()
            .filter_map(|page| {
                let record = record_from_page(page);
                if record.is_none() {
                    tracing::warn!(page_id = %page.id, "Reader row has no date, skipping");
                }
                record
            })
            .collect())
    }

    async fn archive(&self, id: &str) -> Result<(), StorageError> {
        self.client.archive_page(id).await?;
        Ok(())
    }
}
