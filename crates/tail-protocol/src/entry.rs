//! Log entry types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single log entry as returned by `entries:list`.
///
/// Fields the tailer does not need are dropped on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Full log name, e.g. `projects/p/logs/cos_containers`.
    pub log_name: String,
    /// The monitored resource that produced the entry.
    pub resource: MonitoredResource,
    /// Structured payload (absent for text or proto payloads).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<JsonPayload>,
    /// Time the entry was recorded.
    #[serde(with = "crate::time::rfc3339")]
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create an entry with a JSON message payload.
    pub fn with_message(
        log_name: impl Into<String>,
        resource: MonitoredResource,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            log_name: log_name.into(),
            resource,
            json_payload: Some(JsonPayload {
                message: Some(message.into()),
            }),
            timestamp,
        }
    }

    /// The payload message, if any.
    pub fn message(&self) -> Option<&str> {
        self.json_payload.as_ref()?.message.as_deref()
    }
}

/// Monitored resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredResource {
    /// Resource type, e.g. `gce_instance` or `global`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource labels, e.g. `instance_id`.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl MonitoredResource {
    /// A resource with no labels.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            labels: BTreeMap::new(),
        }
    }

    /// The `global` resource used for ad-hoc writes.
    pub fn global() -> Self {
        Self::new("global")
    }

    /// Add a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Structured JSON payload. Only `message` is retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
