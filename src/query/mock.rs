//! Mock Query Client
//!
//! In-process stand-in for the log endpoint. Pages and failures are queued
//! up front and handed out one per `fetch_page` call. Every request is
//! recorded so tests can assert on cursor and filter behaviour after the
//! client itself has been moved into (and dropped by) a tailer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tail_protocol::ListEntriesRequest;

use super::{AccessToken, Page, QueryClient, QueryError};

#[derive(Debug, Default)]
struct MockShared {
    script: Mutex<VecDeque<Result<Page, QueryError>>>,
    requests: Mutex<Vec<ListEntriesRequest>>,
    tokens: Mutex<Vec<String>>,
    released: AtomicBool,
}

/// Scripted query client for tests
#[derive(Debug)]
pub struct MockQueryClient {
    shared: Arc<MockShared>,
}

/// Observer for a [`MockQueryClient`] that outlives it
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockQueryClient {
    /// Create a client with an empty script and a handle to observe it
    pub fn new() -> (Self, MockHandle) {
        let shared = Arc::new(MockShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockHandle { shared },
        )
    }

    /// Create a client that serves `pages` in order
    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> (Self, MockHandle) {
        let (client, handle) = Self::new();
        for page in pages {
            client.push_page(page);
        }
        (client, handle)
    }

    /// Queue a successful page
    pub fn push_page(&self, page: Page) {
        self.push(Ok(page));
    }

    /// Queue a failure
    pub fn push_error(&self, error: QueryError) {
        self.push(Err(error));
    }

    fn push(&self, result: Result<Page, QueryError>) {
        if let Ok(mut script) = self.shared.script.lock() {
            script.push_back(result);
        }
    }
}

impl QueryClient for MockQueryClient {
    fn fetch_page(
        &self,
        request: &ListEntriesRequest,
        access_token: &AccessToken,
    ) -> Result<Page, QueryError> {
        if let Ok(mut requests) = self.shared.requests.lock() {
            requests.push(request.clone());
        }
        if let Ok(mut tokens) = self.shared.tokens.lock() {
            tokens.push(access_token.expose().to_string());
        }

        // A drained script behaves like a quiet log: empty page, no token.
        self.shared
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

impl Drop for MockQueryClient {
    fn drop(&mut self) {
        self.shared.released.store(true, Ordering::SeqCst);
    }
}

impl MockHandle {
    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ListEntriesRequest> {
        self.shared
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of fetches performed
    pub fn fetch_count(&self) -> usize {
        self.shared.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Access tokens presented with each request
    pub fn tokens(&self) -> Vec<String> {
        self.shared
            .tokens
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// Scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.shared.script.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the client has been dropped
    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::SeqCst)
    }
}
