//! WebSocket wire protocol.
//!
//! Every frame is a JSON object tagged by a kebab-case `kind` field.
//! Producer-bound and server-bound vocabularies are separate enums so an
//! unrecognized inbound kind fails deserialization instead of silently
//! mapping onto something else; the session layer turns that failure into
//! an `error` reply.

use serde::{Deserialize, Serialize};

use crate::store::types::{Record, StoreStats};

/// Frames sent by producers (browser-side capture clients). Unknown fields
/// inside a known kind are ignored so clients can grow their payloads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Submit one captured record for admission. The payload is kept as raw
    /// JSON here; field-level validation is the sanitizer's job, and a
    /// malformed record should produce a validation error, not a protocol
    /// error.
    SubmitRecord { record: serde_json::Value },

    /// Liveness probe.
    Heartbeat,

    /// Ask for store statistics.
    FetchStats,

    /// Ask for every live record.
    FetchAll,

    /// Remove one record by id.
    RemoveById { id: String },

    /// Drop every record.
    ClearAll,
}

/// Frames sent by the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Announced once per session, immediately after the socket opens.
    /// Tells the producer what the store will accept.
    #[serde(rename_all = "camelCase")]
    Capabilities {
        capacity: usize,
        ttl_ms: i64,
        max_body_len: usize,
        max_excerpt_len: usize,
        max_media_len: usize,
    },

    /// Reply to a successful `submit-record`.
    #[serde(rename_all = "camelCase")]
    AdmittedAck {
        id: String,
        label: String,
        captured_at: i64,
    },

    /// Reply to `heartbeat`.
    #[serde(rename_all = "camelCase")]
    HeartbeatAck { timestamp: i64 },

    /// Reply to `fetch-stats`.
    Stats(StoreStats),

    /// Reply to `fetch-all`.
    RecordList { records: Vec<Record> },

    /// Reply to `remove-by-id`. `removed` is `false` when the id was
    /// absent or already expired.
    #[serde(rename_all = "camelCase")]
    RemovedAck { id: String, removed: bool },

    /// Reply to `clear-all` with the number of live records dropped.
    ClearedAck { cleared: usize },

    /// Broadcast to every *other* session after an admission, so idle
    /// clients can refresh without polling.
    #[serde(rename_all = "camelCase")]
    RecordAdded {
        id: String,
        label: String,
        source_ref: String,
    },

    /// Reply to any frame that could not be handled.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
