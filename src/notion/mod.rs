//! Notion REST API backend for the feeds registry and reader table.
//!
//! - `client` - HTTP transport: auth headers, pagination, error decoding
//! - `filter` - Typed query filters serialized to Notion's JSON
//! - `types` - Response shapes, property accessors and the database schemas
//! - `tables` - [`NotionTables`], implementing the storage traits
//!
//! Only the client handle, its error type and [`NotionTables`] leave this
//! module; the sync workflow reaches Notion through the storage traits.

mod client;
mod filter;
mod tables;
mod types;

pub use client::{NotionClient, NotionError};
pub use tables::NotionTables;
