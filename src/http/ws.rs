//! Producer WebSocket sessions.
//!
//! Each socket gets a registry entry and an unbounded outbound queue. One
//! task per session drives both directions: it drains the queue to the
//! wire and dispatches inbound frames against the store. Every inbound
//! frame produces exactly one reply to the submitting session; admissions
//! additionally fan out a `record-added` notification to everyone else.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info_span};
use uuid::Uuid;

use crate::http::AppState;
use crate::metrics;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::types::{Admission, RawRecord};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| producer_session(socket, state))
}

async fn producer_session(socket: WebSocket, state: AppState) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let session_id = state.sessions.register(outbound_tx);

    let session = async {
        // The capabilities greeting goes through the same outbound queue as
        // everything else, so it is always the first frame on the wire.
        let store_config = state.store.config();
        let limits = state.store.limits();
        state.sessions.send_to(
            session_id,
            ServerMessage::Capabilities {
                capacity: store_config.capacity,
                ttl_ms: store_config.ttl_ms,
                max_body_len: limits.max_body_len,
                max_excerpt_len: limits.max_excerpt_len,
                max_media_len: limits.max_media_len,
            },
        );

        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                biased;

                frame = outbound_rx.recv() => {
                    // None means the registry dropped this session
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(err) => {
                            error!(error = %err, "failed to encode outbound frame");
                            continue;
                        },
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }

                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let reply = dispatch(&state, session_id, text.as_str());
                            state.sessions.send_to(session_id, reply);
                        },
                        Some(Ok(Message::Binary(_))) => {
                            state.sessions.send_to(
                                session_id,
                                ServerMessage::error("binary frames are not supported"),
                            );
                        },
                        // axum replies to pings on its own
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {},
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(err)) => {
                            debug!(error = %err, "socket error, closing session");
                            break;
                        },
                    }
                }
            }
        }

        state.sessions.deregister(session_id);
    };

    session.instrument(info_span!("session", id = %session_id)).await;
}

/// Turns one inbound frame into its reply. Store calls are synchronous and
/// short, so dispatch never blocks the session loop noticeably.
fn dispatch(state: &AppState, session_id: Uuid, text: &str) -> ServerMessage {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(error = %err, "unrecognized frame");
            metrics::record_session_message("unrecognized");
            return ServerMessage::error(format!("unrecognized message: {err}"));
        },
    };

    metrics::record_session_message(kind_name(&message));

    match message {
        ClientMessage::SubmitRecord { record } => handle_submit(state, session_id, record),
        ClientMessage::Heartbeat => ServerMessage::HeartbeatAck {
            timestamp: chrono::Utc::now().timestamp_millis(),
        },
        ClientMessage::FetchStats => ServerMessage::Stats(state.store.stats()),
        ClientMessage::FetchAll => ServerMessage::RecordList {
            records: state.store.list(),
        },
        ClientMessage::RemoveById { id } => {
            let removed = state.store.remove(&id);
            ServerMessage::RemovedAck { id, removed }
        },
        ClientMessage::ClearAll => ServerMessage::ClearedAck {
            cleared: state.store.clear(),
        },
    }
}

fn handle_submit(state: &AppState, session_id: Uuid, record: serde_json::Value) -> ServerMessage {
    // A non-object or wrongly-typed payload is a validation problem with
    // this record, not a protocol violation by the session.
    let raw: RawRecord = match serde_json::from_value(record) {
        Ok(raw) => raw,
        Err(err) => return ServerMessage::error(format!("invalid record payload: {err}")),
    };

    match state.store.admit(&raw) {
        Admission::Admitted { record, evicted } => {
            if let Some(evicted_id) = evicted {
                debug!(evicted = %evicted_id, "admission evicted oldest record");
            }

            let delivered = state.sessions.broadcast_except(
                session_id,
                &ServerMessage::RecordAdded {
                    id: record.id.clone(),
                    label: record.label.clone(),
                    source_ref: record.source_ref.clone(),
                },
            );
            debug!(id = %record.id, delivered, "record admitted");

            ServerMessage::AdmittedAck {
                id: record.id,
                label: record.label,
                captured_at: record.captured_at,
            }
        },
        Admission::Rejected(err) => ServerMessage::error(err.to_string()),
    }
}

fn kind_name(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::SubmitRecord { .. } => "submit-record",
        ClientMessage::Heartbeat => "heartbeat",
        ClientMessage::FetchStats => "fetch-stats",
        ClientMessage::FetchAll => "fetch-all",
        ClientMessage::RemoveById { .. } => "remove-by-id",
        ClientMessage::ClearAll => "clear-all",
    }
}
