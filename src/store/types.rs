//! Data types for the capture store.
//!
//! Wire field names are camelCase to match the JSON contract spoken by the
//! capture agent; internal names follow Rust conventions via serde renames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sanitize::SanitizeError;

/// A raw record as submitted by a producer, before sanitization.
///
/// Every field is optional so that an incomplete submission deserializes
/// cleanly and is rejected by the sanitizer with a precise reason instead of
/// failing as an opaque envelope parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRecord {
    /// Producer-assigned opaque identifier.
    pub id: Option<String>,
    /// Capture time in epoch milliseconds.
    pub captured_at: Option<i64>,
    /// Where the capture came from (origin URL).
    pub source_ref: Option<String>,
    /// Short human-meaningful tag, the primary search key.
    pub label: Option<String>,
    /// Large opaque HTML-like payload.
    pub body: Option<String>,
    /// Secondary text payload.
    pub excerpt: Option<String>,
    /// Free-form string attributes.
    pub attributes: Option<BTreeMap<String, String>>,
    /// Nested metadata (styles, geometry, counts), passed through untouched.
    pub auxiliary: Option<serde_json::Value>,
    /// Optional large binary-as-text payload (image data).
    pub media: Option<String>,
}

/// A sanitized captured-element record, the unit of storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Producer-assigned opaque identifier.
    pub id: String,
    /// Capture time in epoch milliseconds. Orders listings; never drives
    /// expiry or eviction.
    pub captured_at: i64,
    /// Where the capture came from (origin URL).
    pub source_ref: String,
    /// Short human-meaningful tag, the primary search key.
    pub label: String,
    /// Body payload, capped and scrubbed.
    pub body: String,
    /// Excerpt payload, capped.
    pub excerpt: String,
    /// String attributes with sensitive values redacted.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Nested metadata, passed through unsanitized.
    #[serde(default)]
    pub auxiliary: serde_json::Value,
    /// Media payload, present only when under its ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// True when an oversized media payload was dropped at admission.
    #[serde(default)]
    pub media_truncated: bool,
}

impl Record {
    /// Whether a media payload is attached.
    pub const fn has_media(&self) -> bool {
        self.media.is_some()
    }
}

/// A stored record plus its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The sanitized record.
    pub record: Record,
    /// Admission time + TTL, epoch milliseconds.
    pub expires_at: i64,
    /// Monotonic admission sequence; breaks `capturedAt` ties in listings.
    pub seq: u64,
}

impl StoreEntry {
    /// An entry is visible iff `now < expires_at`.
    pub const fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Record stored. `record` is the sanitized copy as admitted, so callers
    /// can acknowledge without a second lookup. `evicted` names the
    /// oldest-admitted record that was removed to stay under capacity, if
    /// any.
    Admitted {
        record: Record,
        evicted: Option<String>,
    },
    /// Sanitization failed; the store was not touched.
    Rejected(SanitizeError),
}

/// Store statistics over the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Live record count.
    pub count: usize,
    /// Configured capacity ceiling.
    pub capacity: usize,
    /// Configured TTL in milliseconds.
    pub ttl_ms: i64,
    /// Earliest `capturedAt` among live records; null when empty.
    pub oldest_captured_at: Option<i64>,
    /// Latest `capturedAt` among live records; null when empty.
    pub newest_captured_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_tolerates_missing_fields() {
        let raw: RawRecord = serde_json::from_str(r#"{"id": "cap-1"}"#).unwrap();
        assert_eq!(raw.id.as_deref(), Some("cap-1"));
        assert!(raw.captured_at.is_none());
        assert!(raw.body.is_none());
    }

    #[test]
    fn test_record_wire_names_are_camel_case() {
        let record = Record {
            id: "cap-1".to_string(),
            captured_at: 1_700_000_000_000,
            source_ref: "https://example.com/page".to_string(),
            label: "div.hero".to_string(),
            body: "<div/>".to_string(),
            excerpt: "hero".to_string(),
            attributes: BTreeMap::new(),
            auxiliary: serde_json::Value::Null,
            media: None,
            media_truncated: false,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["capturedAt"], 1_700_000_000_000_i64);
        assert_eq!(json["sourceRef"], "https://example.com/page");
        assert_eq!(json["mediaTruncated"], false);
        // Absent media is omitted entirely, not serialized as null
        assert!(json.get("media").is_none());
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = StoreEntry {
            record: Record {
                id: "cap-1".to_string(),
                captured_at: 1,
                source_ref: "https://example.com".to_string(),
                label: "a".to_string(),
                body: String::new(),
                excerpt: String::new(),
                attributes: BTreeMap::new(),
                auxiliary: serde_json::Value::Null,
                media: None,
                media_truncated: false,
            },
            expires_at: 1_000,
            seq: 0,
        };

        assert!(!entry.is_expired(999));
        // Visibility requires now strictly before expiry
        assert!(entry.is_expired(1_000));
        assert!(entry.is_expired(1_001));
    }

    #[test]
    fn test_stats_serializes_null_bounds_when_empty() {
        let stats = StoreStats {
            count: 0,
            capacity: 50,
            ttl_ms: 3_600_000,
            oldest_captured_at: None,
            newest_captured_at: None,
        };

        let json = serde_json::to_value(stats).unwrap();
        assert!(json["oldestCapturedAt"].is_null());
        assert!(json["newestCapturedAt"].is_null());
        assert_eq!(json["ttlMs"], 3_600_000);
    }
}
