//! Feed retrieval and parsing.
//!
//! - [`parser`] - Converts RSS/Atom bytes into [`FeedItem`](crate::storage::FeedItem)s using `feed-rs`
//! - [`fetcher`] - The [`FetchFeed`] seam and its HTTP implementation
//!
//! # Example
//!
//! ```ignore
//! use notion_feeder::feed::{FetchFeed, HttpFeedFetcher};
//!
//! let fetcher = HttpFeedFetcher::new(reqwest::Client::new());
//! let parsed = fetcher.fetch("https://example.com/feed.xml").await?;
//! for item in parsed.items {
//!     println!("{} -> {}", item.title, item.link);
//! }
//! ```

mod fetcher;
mod parser;

pub use fetcher::{FetchError, FetchFeed, HttpFeedFetcher};
pub use parser::{parse_feed, ParseResult};
