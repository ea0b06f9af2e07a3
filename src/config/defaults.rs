//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};
use tail_protocol::DEFAULT_ENDPOINT;

/// Built-in default configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Logging API base URL
    pub endpoint: String,

    /// Whole-request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_seconds: u64,

    /// Log filter directive (default: "info")
    pub log_level: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_seconds: 30,
            connect_timeout_seconds: 10,
            log_level: "info".to_string(),
        }
    }
}
