//! Read/mutate facade over the store for consumer surfaces.
//!
//! Both consumer adapters (tool calls and resource reads) answer queries
//! with the same shapes; this module owns those shapes and the logic that
//! builds them, so the adapters stay thin translation layers.

use std::net::SocketAddr;

use serde::Serialize;

use crate::constants::{RESOURCE_SCHEME, SUMMARY_EXCERPT_LEN};
use crate::error::{Error, Result};
use crate::sessions::SessionRegistry;
use crate::store::CaptureStore;
use crate::store::types::{Record, StoreStats};

/// Compact listing row. Bodies and media stay behind the detail and media
/// lookups; summaries are safe to return in bulk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSummary {
    pub id: String,
    pub captured_at: i64,
    pub source_ref: String,
    pub label: String,
    /// Clipped to a short preview, never the full excerpt.
    pub excerpt: String,
    pub body_len: usize,
    pub excerpt_len: usize,
    pub has_media: bool,
}

/// Full record view. Media is inlined only on request; otherwise a
/// `mediaUri` handle points at the media resource.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDetail {
    #[serde(flatten)]
    pub record: Record,
    pub has_media: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_uri: Option<String>,
}

/// Media blob for one record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub id: String,
    pub media: String,
}

/// Service liveness snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessReport {
    pub status: &'static str,
    pub version: &'static str,
    pub bound: String,
    pub active_sessions: usize,
    pub records: usize,
    pub capacity: usize,
}

impl From<&Record> for CaptureSummary {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            captured_at: record.captured_at,
            source_ref: record.source_ref.clone(),
            label: record.label.clone(),
            excerpt: clip_chars(&record.excerpt, SUMMARY_EXCERPT_LEN),
            body_len: record.body.chars().count(),
            excerpt_len: record.excerpt.chars().count(),
            has_media: record.has_media(),
        }
    }
}

/// First `max_chars` characters of `text`, without any marker. Views only;
/// stored data is never clipped here.
fn clip_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Query surface shared by the consumer adapters. Cheap to clone.
#[derive(Clone)]
pub struct QueryFacade {
    store: CaptureStore,
    sessions: SessionRegistry,
    bound_addr: SocketAddr,
}

impl QueryFacade {
    pub fn new(store: CaptureStore, sessions: SessionRegistry, bound_addr: SocketAddr) -> Self {
        Self {
            store,
            sessions,
            bound_addr,
        }
    }

    /// Every live record as a summary row, newest capture first.
    pub fn summaries(&self) -> Vec<CaptureSummary> {
        self.store
            .list()
            .iter()
            .map(CaptureSummary::from)
            .collect()
    }

    /// One record in full. With `include_media` the blob is inlined;
    /// otherwise records that carry media expose a `mediaUri` handle.
    pub fn detail(&self, id: &str, include_media: bool) -> Result<CaptureDetail> {
        let mut record = self
            .store
            .get(id)
            .ok_or_else(|| Error::record_not_found(id))?;

        let has_media = record.has_media();
        let media_uri = if has_media && !include_media {
            Some(format!("{RESOURCE_SCHEME}{id}/media"))
        } else {
            None
        };
        if !include_media {
            record.media = None;
        }

        Ok(CaptureDetail {
            record,
            has_media,
            media_uri,
        })
    }

    /// The media blob for one record. Absent records and records without
    /// media are distinct errors.
    pub fn media(&self, id: &str) -> Result<MediaPayload> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| Error::record_not_found(id))?;
        let media = record.media.ok_or_else(|| Error::no_media(id))?;
        Ok(MediaPayload {
            id: record.id,
            media,
        })
    }

    /// Substring search as summary rows, same ordering as [`summaries`](Self::summaries).
    pub fn search(&self, query: &str) -> Vec<CaptureSummary> {
        self.store
            .search(query)
            .iter()
            .map(CaptureSummary::from)
            .collect()
    }

    /// Removes one record. `false` means the id was absent or expired;
    /// that is an outcome, not an error.
    pub fn remove(&self, id: &str) -> bool {
        self.store.remove(id)
    }

    /// Drops every record, returning how many live ones went.
    pub fn clear(&self) -> usize {
        self.store.clear()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn liveness(&self) -> LivenessReport {
        let stats = self.store.stats();
        LivenessReport {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            bound: self.bound_addr.to_string(),
            active_sessions: self.sessions.active_count(),
            records: stats.count,
            capacity: stats.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitSettings, StoreSettings};
    use crate::store::types::RawRecord;

    fn facade_with_store() -> (QueryFacade, CaptureStore) {
        let store = CaptureStore::new(
            StoreSettings {
                capacity: 10,
                ttl_ms: 60_000,
                sweep_interval_ms: 60_000,
            },
            LimitSettings::default(),
        );
        let facade = QueryFacade::new(
            store.clone(),
            SessionRegistry::new(),
            "127.0.0.1:9219".parse().unwrap(),
        );
        (facade, store)
    }

    fn admit(store: &CaptureStore, id: &str, excerpt: &str, media: Option<&str>) {
        store.admit(&RawRecord {
            id: Some(id.to_string()),
            captured_at: Some(1_700_000_000_000),
            source_ref: Some("https://example.com".to_string()),
            label: Some(format!("label-{id}")),
            body: Some("<p>body</p>".to_string()),
            excerpt: Some(excerpt.to_string()),
            attributes: None,
            auxiliary: None,
            media: media.map(str::to_string),
        });
    }

    #[test]
    fn test_summary_clips_excerpt() {
        let (facade, store) = facade_with_store();
        admit(&store, "long", &"e".repeat(150), None);
        admit(&store, "short", "tiny", Some("data:image/png;base64,AAAA"));

        let summaries = facade.summaries();
        assert_eq!(summaries.len(), 2);

        let long = summaries.iter().find(|s| s.id == "long").unwrap();
        assert_eq!(long.excerpt.chars().count(), SUMMARY_EXCERPT_LEN);
        assert_eq!(long.excerpt_len, 150);
        assert!(!long.has_media);

        let short = summaries.iter().find(|s| s.id == "short").unwrap();
        assert_eq!(short.excerpt, "tiny");
        assert!(short.has_media);
    }

    #[test]
    fn test_detail_media_handling() {
        let (facade, store) = facade_with_store();
        admit(&store, "with-media", "x", Some("data:image/png;base64,AAAA"));
        admit(&store, "plain", "x", None);

        let detail = facade.detail("with-media", false).unwrap();
        assert!(detail.has_media);
        assert!(detail.record.media.is_none());
        assert_eq!(
            detail.media_uri.as_deref(),
            Some("capture://with-media/media")
        );

        let detail = facade.detail("with-media", true).unwrap();
        assert_eq!(
            detail.record.media.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert!(detail.media_uri.is_none());

        let detail = facade.detail("plain", false).unwrap();
        assert!(!detail.has_media);
        assert!(detail.media_uri.is_none());

        assert!(matches!(
            facade.detail("ghost", false),
            Err(Error::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_media_lookup_errors() {
        let (facade, store) = facade_with_store();
        admit(&store, "with-media", "x", Some("blob"));
        admit(&store, "plain", "x", None);

        let payload = facade.media("with-media").unwrap();
        assert_eq!(payload.media, "blob");

        assert!(matches!(
            facade.media("plain"),
            Err(Error::NoMedia { .. })
        ));
        assert!(matches!(
            facade.media("ghost"),
            Err(Error::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_and_clear_outcomes() {
        let (facade, store) = facade_with_store();
        admit(&store, "a", "x", None);
        admit(&store, "b", "x", None);

        assert!(facade.remove("a"));
        assert!(!facade.remove("a"));
        assert_eq!(facade.clear(), 1);
    }

    #[test]
    fn test_liveness_snapshot() {
        let (facade, store) = facade_with_store();
        admit(&store, "a", "x", None);

        let liveness = facade.liveness();
        assert_eq!(liveness.status, "ok");
        assert_eq!(liveness.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(liveness.bound, "127.0.0.1:9219");
        assert_eq!(liveness.active_sessions, 0);
        assert_eq!(liveness.records, 1);
        assert_eq!(liveness.capacity, 10);
    }

    #[test]
    fn test_detail_serializes_flat() {
        let (facade, store) = facade_with_store();
        admit(&store, "a", "x", Some("blob"));

        let value = serde_json::to_value(facade.detail("a", false).unwrap()).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["hasMedia"], true);
        assert_eq!(value["mediaUri"], "capture://a/media");
        // media itself stays out of the payload unless asked for
        assert!(value.get("media").is_none());
    }
}
