use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Typed database query filter, serialized to Notion's filter JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    TitleEquals {
        property: &'static str,
        value: String,
    },
    UrlEquals {
        property: &'static str,
        value: String,
    },
    CheckboxEquals {
        property: &'static str,
        value: bool,
    },
    DateOnOrBefore {
        property: &'static str,
        value: DateTime<Utc>,
    },
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn to_json(&self) -> Value {
        match self {
            Filter::TitleEquals { property, value } => {
                json!({ "property": property, "title": { "equals": value } })
            }
            Filter::UrlEquals { property, value } => {
                json!({ "property": property, "url": { "equals": value } })
            }
            Filter::CheckboxEquals { property, value } => {
                json!({ "property": property, "checkbox": { "equals": value } })
            }
            Filter::DateOnOrBefore { property, value } => json!({
                "property": property,
                "date": { "on_or_before": format_timestamp(value) },
            }),
            Filter::Or(filters) => {
                json!({ "or": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::And(filters) => {
                json!({ "and": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

/// ISO 8601 with millisecond precision and a `Z` suffix.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
