use anyhow::Result;
use feed_rs::model::Link;
use feed_rs::parser;

use crate::storage::FeedItem;

/// Items recovered from one feed document.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub items: Vec<FeedItem>,
    /// Entries dropped because they carried no link
    pub skipped: usize,
}

/// Parse RSS/Atom/JSON Feed bytes into feed items, preserving document order.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult> {
    let feed = parser::parse(bytes)?;

    let mut result = ParseResult::default();
    for entry in feed.entries {
        let Some(link) = article_link(&entry.links) else {
            result.skipped += 1;
            continue;
        };

        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());
        let creator = entry
            .authors
            .first()
            .map(|a| a.name.trim().to_string())
            .filter(|name| !name.is_empty());
        let content = entry
            .content
            .and_then(|c| c.body)
            .or_else(|| entry.summary.map(|s| s.content));

        result.items.push(FeedItem {
            title,
            link,
            published_at: entry.published.or(entry.updated),
            creator,
            content,
        });
    }

    Ok(result)
}

/// The entry's article URL: the first `alternate` (or untyped) link, else the
/// first link of any kind.
fn article_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}
