//! Log Query Protocol Types
//!
//! Defines the JSON request/response bodies exchanged with the log query
//! endpoint (`entries:list` and `entries:write`).

pub mod entry;
pub mod request;
pub mod response;
pub mod time;

use std::time::Duration;

pub use entry::{JsonPayload, LogEntry, MonitoredResource};
pub use request::{ListEntriesRequest, WriteEntriesRequest};
pub use response::ListEntriesResponse;
pub use time::format_instant;

/// Page size used for every fetch while tailing.
pub const TAIL_PAGE_SIZE: u32 = 50;

/// Wait between consecutive tail fetches.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ordering hint used by one-shot (historical) retrieval.
pub const ORDER_TIMESTAMP_DESC: &str = "timestamp desc";

/// Base URL of the public logging API.
pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com";

/// Path of the list operation, relative to the endpoint.
pub const LIST_PATH: &str = "/v2/entries:list";

/// Path of the write operation, relative to the endpoint.
pub const WRITE_PATH: &str = "/v2/entries:write";
