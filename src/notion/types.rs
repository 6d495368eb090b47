use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Property names of the reader (destination) database.
pub mod reader_schema {
    pub const TITLE: &str = "Title";
    pub const URL: &str = "URL";
    pub const CREATED_AT: &str = "Created At";
    pub const SOURCE: &str = "Source";
    pub const READ: &str = "Read";
}

/// Property names of the feeds registry database.
pub mod registry_schema {
    pub const TITLE: &str = "Title";
    pub const LINK: &str = "Link";
    pub const ENABLED: &str = "Enabled";
}

/// Notion caps a single rich-text content item at 2000 characters.
pub const MAX_TEXT_LEN: usize = 2000;

/// Response body of `POST /databases/{id}/query`.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database row. Properties stay as raw JSON and are read through the
/// typed accessors below.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// Error body Notion returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl Page {
    /// Concatenated plain text of a `title` property.
    pub fn title(&self, property: &str) -> Option<String> {
        self.plain_text(property, "title")
    }

    /// Concatenated plain text of a `rich_text` property.
    pub fn rich_text(&self, property: &str) -> Option<String> {
        self.plain_text(property, "rich_text")
    }

    pub fn url(&self, property: &str) -> Option<String> {
        self.properties
            .get(property)?
            .get("url")?
            .as_str()
            .map(str::to_string)
    }

    pub fn checkbox(&self, property: &str) -> Option<bool> {
        self.properties.get(property)?.get("checkbox")?.as_bool()
    }

    /// Start of a `date` property. Date-only values resolve to midnight UTC.
    pub fn date_start(&self, property: &str) -> Option<DateTime<Utc>> {
        let start = self
            .properties
            .get(property)?
            .get("date")?
            .get("start")?
            .as_str()?;
        parse_date(start)
    }

    fn plain_text(&self, property: &str, kind: &str) -> Option<String> {
        let parts = self.properties.get(property)?.get(kind)?.as_array()?;
        Some(
            parts
                .iter()
                .filter_map(|p| p.get("plain_text").and_then(Value::as_str))
                .collect(),
        )
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

pub(crate) fn title_value(content: &str) -> Value {
    json!({ "title": [ { "text": { "content": content } } ] })
}

pub(crate) fn rich_text_value(content: &str) -> Value {
    json!({ "rich_text": [ { "text": { "content": content } } ] })
}

pub(crate) fn paragraph_block(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [ { "type": "text", "text": { "content": content } } ]
        }
    })
}
