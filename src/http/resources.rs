//! Resource-read adapter.
//!
//! The same facade as the tool surface, addressed by `capture://` URI
//! instead of by operation name. `GET /api/resources` lists what can be
//! read, `GET /api/resources/read?uri=...` reads one resource.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{RESOURCE_LIST, RESOURCE_SCHEME, RESOURCE_STATS, RESOURCE_STATUS};
use crate::http::{AppError, AppState};

/// Describes one readable resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

/// Three well-known URIs, then one `capture://{id}` per live record and a
/// `/media` companion for records that carry a blob.
pub async fn list_resources_handler(
    State(state): State<AppState>,
) -> Json<Vec<ResourceDescriptor>> {
    let mut resources = vec![
        ResourceDescriptor {
            uri: RESOURCE_LIST.to_string(),
            description: "Every live capture as a summary row, newest first".to_string(),
        },
        ResourceDescriptor {
            uri: RESOURCE_STATS.to_string(),
            description: "Store statistics".to_string(),
        },
        ResourceDescriptor {
            uri: RESOURCE_STATUS.to_string(),
            description: "Relay liveness".to_string(),
        },
    ];

    for summary in state.facade.summaries() {
        resources.push(ResourceDescriptor {
            uri: format!("{RESOURCE_SCHEME}{}", summary.id),
            description: format!("Capture {} from {}", summary.label, summary.source_ref),
        });
        if summary.has_media {
            resources.push(ResourceDescriptor {
                uri: format!("{RESOURCE_SCHEME}{}/media", summary.id),
                description: format!("Media blob of capture {}", summary.id),
            });
        }
    }

    Json(resources)
}

pub async fn read_resource_handler(
    State(state): State<AppState>,
    Query(params): Query<ReadResourceParams>,
) -> Result<Json<Value>, AppError> {
    let result = match params.uri.as_str() {
        RESOURCE_LIST => serde_json::to_value(state.facade.summaries()),
        RESOURCE_STATS => serde_json::to_value(state.facade.stats()),
        RESOURCE_STATUS => serde_json::to_value(state.facade.liveness()),
        uri => {
            let target = uri
                .strip_prefix(RESOURCE_SCHEME)
                .filter(|rest| !rest.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(format!("unsupported resource uri: {uri}"))
                })?;

            if let Some(id) = target.strip_suffix("/media") {
                serde_json::to_value(state.facade.media(id)?)
            } else if target.contains('/') {
                return Err(AppError::BadRequest(format!(
                    "unsupported resource uri: {uri}"
                )));
            } else {
                serde_json::to_value(state.facade.detail(target, false)?)
            }
        },
    };

    result
        .map(Json)
        .map_err(|err| AppError::Internal(format!("failed to encode resource: {err}")))
}
