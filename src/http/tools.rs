//! Tool-call adapter.
//!
//! Exposes the query facade as named operations: `GET /api/tools` lists
//! the vocabulary, `POST /api/tools/call` invokes one by name with a JSON
//! argument object. Unknown names and missing arguments are client errors;
//! everything else is a thin translation onto [`QueryFacade`].
//!
//! [`QueryFacade`]: crate::facade::QueryFacade

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::http::{AppError, AppState};

/// Describes one callable operation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Argument names; a trailing `?` marks an optional argument.
    pub arguments: &'static [&'static str],
}

const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "list_captures",
        description: "List every live capture as a summary row, newest first",
        arguments: &[],
    },
    ToolDescriptor {
        name: "search_captures",
        description: "Case-insensitive substring search over label, excerpt, body, and source",
        arguments: &["query"],
    },
    ToolDescriptor {
        name: "get_capture",
        description: "Fetch one capture in full; media is inlined only when includeMedia is true",
        arguments: &["id", "includeMedia?"],
    },
    ToolDescriptor {
        name: "get_capture_media",
        description: "Fetch the media blob of one capture",
        arguments: &["id"],
    },
    ToolDescriptor {
        name: "remove_capture",
        description: "Remove one capture by id",
        arguments: &["id"],
    },
    ToolDescriptor {
        name: "clear_captures",
        description: "Drop every capture",
        arguments: &[],
    },
    ToolDescriptor {
        name: "capture_stats",
        description: "Store statistics: count, capacity, TTL, capture-time range",
        arguments: &[],
    },
    ToolDescriptor {
        name: "connection_status",
        description: "Relay liveness: bound address, active producer sessions, record count",
        arguments: &[],
    },
];

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

pub async fn list_tools_handler() -> Json<&'static [ToolDescriptor]> {
    Json(TOOLS)
}

pub async fn call_tool_handler(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(tool = %request.name, "tool call");
    let args = &request.arguments;

    let result = match request.name.as_str() {
        "list_captures" => serde_json::to_value(state.facade.summaries()),
        "search_captures" => {
            let query = required_str(args, "query")?;
            serde_json::to_value(state.facade.search(query))
        },
        "get_capture" => {
            let id = required_str(args, "id")?;
            let include_media = args
                .get("includeMedia")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            serde_json::to_value(state.facade.detail(id, include_media)?)
        },
        "get_capture_media" => {
            let id = required_str(args, "id")?;
            serde_json::to_value(state.facade.media(id)?)
        },
        "remove_capture" => {
            let id = required_str(args, "id")?;
            let removed = state.facade.remove(id);
            Ok(serde_json::json!({ "id": id, "removed": removed }))
        },
        "clear_captures" => {
            let cleared = state.facade.clear();
            Ok(serde_json::json!({ "cleared": cleared }))
        },
        "capture_stats" => serde_json::to_value(state.facade.stats()),
        "connection_status" => serde_json::to_value(state.facade.liveness()),
        other => return Err(AppError::BadRequest(format!("unknown tool: {other}"))),
    };

    result
        .map(Json)
        .map_err(|err| AppError::Internal(format!("failed to encode tool result: {err}")))
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, AppError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest(format!("missing required argument: {field}")))
}
