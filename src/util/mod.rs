//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Title normalization**: Markup stripping and whitespace collapsing that
//!   produces the canonical string used for duplicate detection
//! - **URL validation**: Scheme and host checks for feed endpoints
//!
//! # Examples
//!
//! ```
//! use notion_feeder::util::{normalize_title, validate_feed_url};
//!
//! assert_eq!(normalize_title("<em>Breaking</em>  news"), "Breaking news");
//! assert!(validate_feed_url("https://example.com/feed.xml").is_ok());
//! ```

mod text;
mod url_validator;

pub use text::{collapse_whitespace, normalize_title, strip_markup, truncate_chars};
pub use url_validator::{validate_feed_url, UrlValidationError};
