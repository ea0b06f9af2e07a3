//! instance-tail - follow the logs of a run-once compute instance
//!
//! Tails the logging API for a container running on a disposable instance
//! until a caller-supplied condition (usually "the instance stopped") says
//! to stop. Provisioning the instance is left to external tooling.

pub mod config;
pub mod logging;
pub mod query;
pub mod signal;
pub mod tail;

pub use config::{ConfigError, Settings};
pub use query::{read_recent, AccessToken, HttpQueryClient, Page, QueryClient, QueryError};
pub use tail::{Cursor, TailState, Tailer, TailerBuilder};
pub use tail_protocol::{JsonPayload, LogEntry, MonitoredResource};
