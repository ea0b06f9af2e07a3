//! Tail cursor: the time lower bound plus an in-progress page token.

use chrono::{DateTime, Utc};
use tail_protocol::format_instant;

use crate::query::Page;

/// Resumable position of a tail session.
///
/// `from` never moves backwards. While a continuation token is held, `from`
/// is frozen because the session is still paging through one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    from: DateTime<Utc>,
    continuation_token: Option<String>,
}

impl Cursor {
    /// Start a window just after `from`
    pub fn starting_at(from: DateTime<Utc>) -> Self {
        Self {
            from,
            continuation_token: None,
        }
    }

    /// Start a window at the current time
    pub fn now() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Exclusive lower bound of the current window
    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    /// Token for the next page of the current window, if mid-window
    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    /// The `timestamp > "<from>"` clause for this cursor
    pub fn timestamp_clause(&self) -> String {
        format!("timestamp > \"{}\"", format_instant(&self.from))
    }

    /// Combine the caller's filter with this cursor's timestamp clause.
    ///
    /// The caller's filter is appended verbatim with no escaping.
    pub fn effective_filter(&self, filter: Option<&str>) -> String {
        match filter {
            Some(f) if !f.trim().is_empty() => format!("{} AND {}", self.timestamp_clause(), f),
            _ => self.timestamp_clause(),
        }
    }

    /// Move past `page`.
    ///
    /// With a continuation token the window stays put and the token is kept.
    /// Without one, the window restarts after the newest entry of the page,
    /// or stays where it was if the page was empty.
    pub fn advance(&mut self, page: &Page) {
        match &page.continuation_token {
            Some(token) => {
                self.continuation_token = Some(token.clone());
            }
            None => {
                self.continuation_token = None;
                if let Some(newest) = page.entries.iter().map(|e| e.timestamp).max() {
                    self.from = self.from.max(newest);
                }
            }
        }
    }
}
