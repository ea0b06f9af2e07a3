//! Request bodies.

use serde::{Deserialize, Serialize};

use crate::entry::LogEntry;

/// Body of an `entries:list` call.
///
/// Absent optional fields are omitted from the encoded JSON, which the
/// remote API treats the same as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesRequest {
    /// Resource scopes to search, e.g. `projects/my-project`.
    pub resource_names: Vec<String>,
    /// Filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Ordering hint, e.g. `timestamp desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Maximum number of entries per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Continuation token from a previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ListEntriesRequest {
    /// A request over the given scopes with every option unset.
    pub fn new(resource_names: Vec<String>) -> Self {
        Self {
            resource_names,
            filter: None,
            order_by: None,
            page_size: None,
            page_token: None,
        }
    }
}

/// Body of an `entries:write` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteEntriesRequest {
    pub entries: Vec<LogEntry>,
}
