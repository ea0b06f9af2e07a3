//! Live log tailing
//!
//! Turns the page-limited `entries:list` query into a live stream. A
//! [`Tailer`] is a pull-based iterator:
//!
//! ```text
//! Fetching -> Evaluating -> Emitting -> Sleeping -> Fetching ...
//!                 |             |
//!                 +-> (false) --+--> Stopped     (any fetch error -> Stopped)
//! ```
//!
//! - Each page is fetched only after the consumer has pulled every entry of
//!   the previous page and the poll interval has elapsed. There is never more
//!   than one page in memory and never more than one request in flight.
//! - The stop predicate sees each fetched page exactly once, before any of
//!   its entries are handed out. Returning `false` still delivers that page
//!   in full, then ends the session without another fetch.
//! - A fetch failure is yielded once as `Err` and ends the session. Nothing
//!   is retried here; build a new tailer from [`Tailer::resume_cursor`] to
//!   carry on.
//! - The query client is dropped as soon as the session stops, or when the
//!   consumer drops the tailer early.
//! - Every request asks for [`TAIL_PAGE_SIZE`] entries and every wait lasts
//!   [`POLL_INTERVAL`]. Neither is configurable.

mod cursor;
pub mod filter;
pub mod predicate;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tail_protocol::{format_instant, ListEntriesRequest, LogEntry, POLL_INTERVAL, TAIL_PAGE_SIZE};

use crate::query::{AccessToken, QueryClient, QueryError};

pub use cursor::Cursor;

/// Wait used between pages
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested waits instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingPause {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl Pause for RecordingPause {
    fn pause(&mut self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

/// Observable state of a tail session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// Next pull performs a fetch (only before the first page)
    Fetching,
    /// Entries of the current page are waiting to be pulled
    Emitting,
    /// Page drained; next pull waits the poll interval, then fetches
    Sleeping,
    /// No further entries or fetches
    Stopped,
}

/// What happens once the current page has been drained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterDrain {
    Fetch,
    WaitThenFetch,
    Stop,
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop predicate returned `false`
    Predicate,
    /// A fetch failed
    Failure,
}

/// Live tail over a [`QueryClient`].
///
/// Iterates over `Result<LogEntry, QueryError>`; see the module docs for
/// the state machine.
pub struct Tailer<C, P> {
    /// Dropped when the session stops
    client: Option<C>,
    predicate: P,
    pause: Box<dyn Pause + Send>,
    resource_names: Vec<String>,
    filter: Option<String>,
    access_token: AccessToken,
    cursor: Cursor,
    /// Undelivered entries of the most recent page
    buffer: VecDeque<LogEntry>,
    after_drain: AfterDrain,
    stop_reason: Option<StopReason>,
    pages_fetched: u64,
    entries_emitted: u64,
}

impl<C, P> Tailer<C, P>
where
    C: QueryClient,
    P: FnMut(&[LogEntry]) -> bool,
{
    /// Current cursor
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Cursor for a fresh session that picks up where this one left off.
    ///
    /// The in-progress page token is dropped since tokens are tied to the
    /// request that produced them. Entries at exactly `from` may be missed
    /// and entries later in an unfinished window may be seen twice.
    pub fn resume_cursor(&self) -> Cursor {
        Cursor::starting_at(self.cursor.from())
    }

    /// Current state
    pub fn state(&self) -> TailState {
        if !self.buffer.is_empty() {
            return TailState::Emitting;
        }
        match self.after_drain {
            AfterDrain::Fetch => TailState::Fetching,
            AfterDrain::WaitThenFetch => TailState::Sleeping,
            AfterDrain::Stop => TailState::Stopped,
        }
    }

    /// Whether the session has ended and every entry has been pulled
    pub fn is_stopped(&self) -> bool {
        self.state() == TailState::Stopped
    }

    /// Why the session stopped, if it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Entries handed to the consumer so far
    pub fn entries_emitted(&self) -> u64 {
        self.entries_emitted
    }

    /// Whether the query client is still held
    pub fn holds_client(&self) -> bool {
        self.client.is_some()
    }

    fn next_request(&self) -> ListEntriesRequest {
        ListEntriesRequest {
            resource_names: self.resource_names.clone(),
            filter: Some(self.cursor.effective_filter(self.filter.as_deref())),
            order_by: None,
            page_size: Some(TAIL_PAGE_SIZE),
            page_token: self.cursor.continuation_token().map(str::to_string),
        }
    }

    /// Fetch, evaluate and buffer one page, then advance the cursor
    fn fetch_page(&mut self) -> Result<(), QueryError> {
        let request = self.next_request();
        let Some(client) = self.client.as_ref() else {
            self.after_drain = AfterDrain::Stop;
            return Ok(());
        };

        let page = client.fetch_page(&request, &self.access_token)?;
        self.pages_fetched += 1;

        let keep_going = (self.predicate)(&page.entries);
        self.cursor.advance(&page);

        tracing::debug!(
            page = self.pages_fetched,
            entries = page.entries.len(),
            more = page.has_more(),
            keep_going,
            from = %format_instant(&self.cursor.from()),
            "Tail: page fetched"
        );

        self.buffer.extend(page.entries);

        if keep_going {
            self.after_drain = AfterDrain::WaitThenFetch;
        } else {
            self.stop(StopReason::Predicate);
        }
        Ok(())
    }

    fn stop(&mut self, reason: StopReason) {
        self.after_drain = AfterDrain::Stop;
        self.stop_reason = Some(reason);
        // Release the connection now; no further fetch will happen.
        self.client = None;
        tracing::info!(
            reason = ?reason,
            pages = self.pages_fetched,
            from = %format_instant(&self.cursor.from()),
            "Tail session stopped"
        );
    }
}

impl<C, P> Iterator for Tailer<C, P>
where
    C: QueryClient,
    P: FnMut(&[LogEntry]) -> bool,
{
    type Item = Result<LogEntry, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                self.entries_emitted += 1;
                return Some(Ok(entry));
            }

            match self.after_drain {
                AfterDrain::Stop => return None,
                AfterDrain::WaitThenFetch => {
                    self.pause.pause(POLL_INTERVAL);
                    self.after_drain = AfterDrain::Fetch;
                }
                AfterDrain::Fetch => {
                    if let Err(e) = self.fetch_page() {
                        tracing::warn!(error = %e, "Tail: fetch failed");
                        self.stop(StopReason::Failure);
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

impl<C, P> Drop for Tailer<C, P> {
    fn drop(&mut self) {
        if self.client.is_some() {
            tracing::debug!(
                pages = self.pages_fetched,
                entries = self.entries_emitted,
                "Tail session abandoned by consumer"
            );
        }
    }
}

/// Builder for [`Tailer`]
pub struct TailerBuilder<C> {
    client: C,
    resource_names: Vec<String>,
    access_token: AccessToken,
    filter: Option<String>,
    cursor: Option<Cursor>,
    pause: Box<dyn Pause + Send>,
}

impl<C: QueryClient> TailerBuilder<C> {
    pub fn new(client: C, resource_names: Vec<String>, access_token: AccessToken) -> Self {
        Self {
            client,
            resource_names,
            access_token,
            filter: None,
            cursor: None,
            pause: Box::new(ThreadPause),
        }
    }

    /// Caller filter, combined with the cursor's timestamp clause
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Optional caller filter
    pub fn maybe_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Initial cursor (defaults to now)
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Replace the thread sleep between pages
    pub fn pause(mut self, pause: impl Pause + Send + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    /// Finish with the stop predicate (`true` keeps tailing)
    pub fn build<P>(self, predicate: P) -> Tailer<C, P>
    where
        P: FnMut(&[LogEntry]) -> bool,
    {
        let cursor = self.cursor.unwrap_or_else(Cursor::now);

        tracing::info!(
            scopes = ?self.resource_names,
            from = %format_instant(&cursor.from()),
            "Tail session started"
        );

        Tailer {
            client: Some(self.client),
            predicate,
            pause: self.pause,
            resource_names: self.resource_names,
            filter: self.filter,
            access_token: self.access_token,
            cursor,
            buffer: VecDeque::new(),
            after_drain: AfterDrain::Fetch,
            stop_reason: None,
            pages_fetched: 0,
            entries_emitted: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{MockQueryClient, Page};
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

    fn tailer(
        client: MockQueryClient,
        pause: RecordingPause,
    ) -> Tailer<MockQueryClient, impl FnMut(&[LogEntry]) -> bool> {
        let mut calls = 0;
        TailerBuilder::new(client, vec!["projects/demo".into()], AccessToken::new("t"))
            .cursor(Cursor::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()))
            .pause(pause)
            .build(move |_| {
                calls += 1;
                calls < 2
            })
    }

    #[test]
    fn test_no_fetch_until_first_pull() {
        let (client, handle) = MockQueryClient::with_pages([Page::new(vec![entry(1)], None)]);
        let t = tailer(client, RecordingPause::new());
        assert_eq!(t.state(), TailState::Fetching);
        assert_eq!(handle.fetch_count(), 0);
    }

    #[test]
    fn test_no_look_ahead_while_page_buffered() {
        let (client, handle) = MockQueryClient::with_pages([
            Page::new(vec![entry(1), entry(2)], None),
            Page::new(vec![entry(3)], None),
        ]);
        let pause = RecordingPause::new();
        let mut t = tailer(client, pause.clone());

        assert_eq!(t.next().unwrap().unwrap(), entry(1));
        assert_eq!(handle.fetch_count(), 1);
        assert_eq!(t.state(), TailState::Emitting);

        assert_eq!(t.next().unwrap().unwrap(), entry(2));
        assert_eq!(handle.fetch_count(), 1);
        assert_eq!(t.state(), TailState::Sleeping);
        assert!(pause.waits().is_empty());

        assert_eq!(t.next().unwrap().unwrap(), entry(3));
        assert_eq!(handle.fetch_count(), 2);
        assert_eq!(pause.waits(), vec![POLL_INTERVAL]);
    }

    #[test]
    fn test_client_released_on_stop() {
        let (client, handle) = MockQueryClient::with_pages([
            Page::new(vec![entry(1)], None),
            Page::new(vec![entry(2)], None),
        ]);
        let mut t = tailer(client, RecordingPause::new());

        let all: Vec<_> = t.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(all, vec![entry(1), entry(2)]);
        assert!(t.is_stopped());
        assert_eq!(t.stop_reason(), Some(StopReason::Predicate));
        assert!(!t.holds_client());
        assert!(handle.is_released());
    }

    #[test]
    fn test_resume_cursor_drops_token() {
        let (client, _handle) =
            MockQueryClient::with_pages([Page::new(vec![entry(1)], Some("A".into()))]);
        let mut t = tailer(client, RecordingPause::new());
        t.next();

        assert_eq!(t.cursor().continuation_token(), Some("A"));
        let resume = t.resume_cursor();
        assert_eq!(resume.continuation_token(), None);
        assert_eq!(resume.from(), t.cursor().from());
    }

    #[test]
    fn test_tailer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Tailer<MockQueryClient, fn(&[LogEntry]) -> bool>>();
    }

    #[test]
    fn test_page_size_and_interval_fixed() {
        let (client, handle) = MockQueryClient::with_pages([
            Page::new(vec![entry(1)], Some("A".into())),
            Page::new(vec![entry(2)], None),
        ]);
        let pause = RecordingPause::new();
        let _: Vec<_> = tailer(client, pause.clone()).collect();

        let sizes: Vec<_> = handle.requests().iter().map(|r| r.page_size).collect();
        assert_eq!(sizes, vec![Some(50), Some(50)]);
        assert_eq!(pause.waits(), vec![Duration::from_secs(1)]);
    }
}
