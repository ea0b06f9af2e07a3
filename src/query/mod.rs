//! Log Query Client
//!
//! Defines the contract for issuing a single `entries:list` request:
//! - QueryClient trait: one request, one page, no state
//! - HttpQueryClient: blocking HTTP implementation for production
//! - MockQueryClient: scripted pages and failure injection for tests
//!
//! Nothing in this module retries. A failed fetch is reported to the caller
//! as a [`QueryError`] and the caller decides what to do with it.

pub mod http;
pub mod mock;

use std::fmt;

use tail_protocol::{ListEntriesRequest, ListEntriesResponse, LogEntry, ORDER_TIMESTAMP_DESC};

pub use http::{HttpClientConfig, HttpQueryClient};
pub use mock::{MockHandle, MockQueryClient};

/// Client for the log query endpoint
pub trait QueryClient {
    /// Fetch one page of entries matching `request`
    fn fetch_page(
        &self,
        request: &ListEntriesRequest,
        access_token: &AccessToken,
    ) -> Result<Page, QueryError>;
}

impl<C: QueryClient + ?Sized> QueryClient for Box<C> {
    fn fetch_page(
        &self,
        request: &ListEntriesRequest,
        access_token: &AccessToken,
    ) -> Result<Page, QueryError> {
        (**self).fetch_page(request, access_token)
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Entries in the order the endpoint returned them
    pub entries: Vec<LogEntry>,
    /// Present when more results exist in the same window
    pub continuation_token: Option<String>,
}

impl Page {
    pub fn new(entries: Vec<LogEntry>, continuation_token: Option<String>) -> Self {
        Self {
            entries,
            continuation_token,
        }
    }

    /// Whether the endpoint said there is more to page through
    pub fn has_more(&self) -> bool {
        self.continuation_token.is_some()
    }
}

impl From<ListEntriesResponse> for Page {
    fn from(res: ListEntriesResponse) -> Self {
        Self {
            entries: res.entries,
            // An empty token means no more pages.
            continuation_token: res.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Opaque bearer token supplied by the caller.
///
/// Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for placing on the wire
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Query errors. All of them end a tail session.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Access token rejected (HTTP {status}): {message}")]
    AuthFailure { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Failure kind for exit code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, IO or HTTP failures (exit code 20)
    Transport = 20,
    /// Rejected or expired token (exit code 21)
    Auth = 21,
    /// Undecodable response body (exit code 22)
    Malformed = 22,
}

impl QueryError {
    /// Map error to failure kind for exit code
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            QueryError::TransportFailure(_) => FailureKind::Transport,
            QueryError::AuthFailure { .. } => FailureKind::Auth,
            QueryError::MalformedResponse(_) => FailureKind::Malformed,
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.failure_kind() as i32
    }
}

/// Fetch the most recent `limit` entries, newest first.
///
/// A single request with no cursor and no paging: any continuation token
/// in the response is ignored.
pub fn read_recent<C: QueryClient + ?Sized>(
    client: &C,
    resource_names: Vec<String>,
    filter: Option<String>,
    limit: u32,
    access_token: &AccessToken,
) -> Result<Vec<LogEntry>, QueryError> {
    let request = ListEntriesRequest {
        resource_names,
        filter,
        order_by: Some(ORDER_TIMESTAMP_DESC.to_string()),
        page_size: Some(limit),
        page_token: None,
    };

    let page = client.fetch_page(&request, access_token)?;
    tracing::debug!(
        entries = page.entries.len(),
        more = page.has_more(),
        "One-shot read complete"
    );
    Ok(page.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tail_protocol::MonitoredResource;

    fn entry(secs: u32) -> LogEntry {
        LogEntry::with_message(
            "projects/demo/logs/test",
            MonitoredResource::global(),
            format!("m{}", secs),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, secs).unwrap(),
        )
    }

    #[test]
    fn test_empty_token_means_no_more_pages() {
        let page = Page::from(ListEntriesResponse {
            entries: vec![],
            next_page_token: Some(String::new()),
        });
        assert!(!page.has_more());
    }

    #[test]
    fn test_access_token_debug_redacted() {
        let token = AccessToken::new("ya29.secret");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret"));
        assert_eq!(token.expose(), "ya29.secret");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(QueryError::TransportFailure("x".into()).exit_code(), 20);
        assert_eq!(
            QueryError::AuthFailure { status: 401, message: "x".into() }.exit_code(),
            21
        );
        assert_eq!(QueryError::MalformedResponse("x".into()).exit_code(), 22);
    }

    #[test]
    fn test_read_recent_single_descending_request() {
        let (client, handle) = MockQueryClient::new();
        client.push_page(Page::new(vec![entry(3), entry(2)], Some("ignored".into())));

        let entries = read_recent(
            &client,
            vec!["projects/demo".into()],
            Some("severity>=INFO".into()),
            10,
            &AccessToken::new("t"),
        )
        .unwrap();

        assert_eq!(entries, vec![entry(3), entry(2)]);

        let calls = handle.requests();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].order_by.as_deref(), Some("timestamp desc"));
        assert_eq!(calls[0].page_size, Some(10));
        assert_eq!(calls[0].page_token, None);
        assert_eq!(calls[0].filter.as_deref(), Some("severity>=INFO"));
    }

    #[test]
    fn test_read_recent_propagates_failure() {
        let (client, _handle) = MockQueryClient::new();
        client.push_error(QueryError::AuthFailure {
            status: 403,
            message: "denied".into(),
        });

        let result = read_recent(&client, vec![], None, 5, &AccessToken::new("t"));
        assert!(matches!(result, Err(QueryError::AuthFailure { status: 403, .. })));
    }
}
