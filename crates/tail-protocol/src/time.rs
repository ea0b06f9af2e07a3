//! Instant formatting shared by the wire encoding and filter composition.

use chrono::{DateTime, SecondsFormat, Utc};

/// Render an instant as ISO-8601 UTC with a trailing `Z`.
///
/// Fractional seconds are printed only when non-zero, using 3, 6 or 9
/// digits, e.g. `2024-03-01T12:00:00Z` or `2024-03-01T12:00:00.250Z`.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Serde adapter for `DateTime<Utc>` fields using [`format_instant`].
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_instant(instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
