use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::filter::Filter;
use super::types::{ApiErrorBody, Page, QueryResponse};

/// Largest page size the query endpoint accepts.
const MAX_PAGE_SIZE: u32 = 100;

/// Upper bound on followed cursors for a single query.
const MAX_QUERY_PAGES: usize = 1000;

#[derive(Debug, Error)]
pub enum NotionError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response carrying Notion's error body
    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    /// Non-2xx response without a decodable error body
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// 2xx response whose body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Thin client over the Notion REST API.
///
/// Holds the shared `reqwest::Client` (and with it the request timeout) plus
/// the integration token. Constructed once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    token: SecretString,
    base_url: String,
}

impl NotionClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.notion.com/v1";
    pub const API_VERSION: &'static str = "2022-06-28";

    /// Create a client against `base_url` (or the public API when `None`).
    ///
    /// Plain HTTP is only accepted for localhost so the token never leaves
    /// the machine unencrypted.
    pub fn new(
        http: reqwest::Client,
        token: SecretString,
        base_url: Option<&str>,
    ) -> Result<Self, NotionError> {
        let base = base_url
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/');

        if !base.starts_with("https://") {
            let is_localhost =
                base.starts_with("http://127.0.0.1") || base.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS Notion base URL");
                return Err(NotionError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base, "Using non-HTTPS Notion base URL (localhost only)");
        }

        Ok(Self {
            http,
            token,
            base_url: base.to_string(),
        })
    }

    /// One page of a database query.
    pub(crate) async fn query_database(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
        start_cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<QueryResponse, NotionError> {
        let mut body = Map::new();
        if let Some(filter) = filter {
            body.insert("filter".into(), filter.to_json());
        }
        if let Some(cursor) = start_cursor {
            body.insert("start_cursor".into(), Value::from(cursor));
        }
        if let Some(size) = page_size {
            body.insert("page_size".into(), Value::from(size.min(MAX_PAGE_SIZE)));
        }

        let path = format!("/databases/{database_id}/query");
        let request = self.request(Method::POST, &path).json(&Value::Object(body));
        let response = self.send(request).await?;
        decode(response).await
    }

    /// All rows matching `filter`, following `next_cursor` until exhausted.
    pub(crate) async fn query_all(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Page>, NotionError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_QUERY_PAGES {
            let response = self
                .query_database(database_id, filter, cursor.as_deref(), Some(MAX_PAGE_SIZE))
                .await?;
            pages.extend(response.results);

            match (response.has_more, response.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => return Ok(pages),
            }
        }

        tracing::warn!(
            database_id = %database_id,
            pages = MAX_QUERY_PAGES,
            "Query pagination limit reached, results truncated"
        );
        Ok(pages)
    }

    /// Create a page under `database_id`.
    pub(crate) async fn create_page(
        &self,
        database_id: &str,
        properties: Map<String, Value>,
        children: Vec<Value>,
    ) -> Result<Page, NotionError> {
        let mut body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
        });
        if !children.is_empty() {
            body["children"] = Value::Array(children);
        }

        let request = self.request(Method::POST, "/pages").json(&body);
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Soft-delete a page.
    pub(crate) async fn archive_page(&self, page_id: &str) -> Result<(), NotionError> {
        let path = format!("/pages/{page_id}");
        let request = self
            .request(Method::PATCH, &path)
            .json(&json!({ "archived": true }));
        self.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose_secret())
            .header("Notion-Version", Self::API_VERSION)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, NotionError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) if !body.code.is_empty() || !body.message.is_empty() => {
                tracing::debug!(status, code = %body.code, "Notion API returned an error");
                Err(NotionError::Api {
                    status,
                    code: body.code,
                    message: body.message,
                })
            }
            _ => Err(NotionError::HttpStatus(status)),
        }
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, NotionError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| NotionError::Decode(e.to_string()))
}
