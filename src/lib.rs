//! Mirrors syndicated feed items into a Notion reader database.
//!
//! A run loads the feed registry, fetches each enabled feed, skips items the
//! reader table already holds (same normalized title or same link), inserts
//! the rest, and optionally archives unread rows past the retention window.
//!
//! The workflow in [`sync`] only sees the [`storage`] and [`feed`] traits;
//! [`notion::NotionTables`] and [`feed::HttpFeedFetcher`] are the production
//! implementations.

pub mod config;
pub mod feed;
pub mod notion;
pub mod storage;
pub mod sync;
pub mod util;
