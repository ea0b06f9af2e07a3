//! Response bodies.

use serde::{Deserialize, Serialize};

use crate::entry::LogEntry;

/// Body returned by `entries:list`.
///
/// The API omits `entries` entirely for an empty page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesResponse {
    #[serde(default)]
    pub entries: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_empty_page() {
        let res: ListEntriesResponse = serde_json::from_str("{}").unwrap();
        assert!(res.entries.is_empty());
        assert!(res.next_page_token.is_none());
    }

    #[test]
    fn test_token_only_page() {
        let res: ListEntriesResponse =
            serde_json::from_str(r#"{ "nextPageToken": "abc" }"#).unwrap();
        assert!(res.entries.is_empty());
        assert_eq!(res.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_entries_must_be_array() {
        let res = serde_json::from_str::<ListEntriesResponse>(r#"{ "entries": 3 }"#);
        assert!(res.is_err());
    }
}
