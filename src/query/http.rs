//! HTTP Query Client
//!
//! Talks JSON over HTTP POST to the logging endpoint. The access token is
//! sent as the `access_token` URL query parameter rather than a header, so it
//! can end up in proxy or server access logs. Errors produced here have the
//! URL stripped so the token never reaches our own logs.

use std::time::Duration;

use serde::Serialize;
use tail_protocol::{
    ListEntriesRequest, ListEntriesResponse, LogEntry, WriteEntriesRequest, DEFAULT_ENDPOINT,
    LIST_PATH, WRITE_PATH,
};

use super::{AccessToken, Page, QueryClient, QueryError};

/// Longest slice of an error body carried into a `QueryError`
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL, e.g. `https://logging.googleapis.com`
    pub endpoint: String,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Blocking HTTP implementation of [`QueryClient`].
///
/// Owns a connection pool which is closed when the client is dropped.
#[derive(Debug)]
pub struct HttpQueryClient {
    client: reqwest::blocking::Client,
    config: HttpClientConfig,
}

impl HttpQueryClient {
    /// Build a client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, QueryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| QueryError::TransportFailure(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Write entries via `entries:write`
    pub fn write_entries(
        &self,
        entries: Vec<LogEntry>,
        access_token: &AccessToken,
    ) -> Result<(), QueryError> {
        let count = entries.len();
        let body = WriteEntriesRequest { entries };
        self.post(WRITE_PATH, &body, access_token)?;
        tracing::debug!(entries = count, "Entries written");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// POST `body` to `path` and return the response text of a 2xx reply
    fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        access_token: &AccessToken,
    ) -> Result<String, QueryError> {
        let response = self
            .client
            .post(self.url(path))
            .query(&[("access_token", access_token.expose())])
            .json(body)
            .send()
            .map_err(transport_failure)?;

        let status = response.status();
        let text = response.text().map_err(transport_failure)?;

        if status.is_success() {
            return Ok(text);
        }

        let message = truncate(&text);
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            Err(QueryError::AuthFailure {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(QueryError::TransportFailure(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                path,
                message
            )))
        }
    }
}

impl QueryClient for HttpQueryClient {
    fn fetch_page(
        &self,
        request: &ListEntriesRequest,
        access_token: &AccessToken,
    ) -> Result<Page, QueryError> {
        let text = self.post(LIST_PATH, request, access_token)?;
        let response: ListEntriesResponse = serde_json::from_str(&text)
            .map_err(|e| QueryError::MalformedResponse(format!("Invalid entries:list body: {}", e)))?;
        Ok(response.into())
    }
}

fn transport_failure(e: reqwest::Error) -> QueryError {
    QueryError::TransportFailure(e.without_url().to_string())
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", head)
    }
}
