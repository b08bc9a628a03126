//! Offline Batch Routes
//!
//! - POST /api/v1/offline-batch - Receive a client's queued actions
//! - GET /api/v1/offline-batch - List everything received so far
//!
//! Resubmitted items (same id) are acknowledged again but stored once, so a
//! client that lost the first response can safely retry.

use axum::{extract::State, Json};
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::dto::ReceivedResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::sync::{BatchReceipt, BatchRequest};

/// POST /api/v1/offline-batch
pub async fn receive_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> ApiResult<Json<BatchReceipt>> {
    if req.items.len() > state.config.max_batch_items {
        return Err(ApiError::Validation(format!(
            "Batch size exceeds maximum of {} items",
            state.config.max_batch_items
        )));
    }

    let mut seen = HashSet::new();
    for item in &req.items {
        if item.id.is_empty() {
            return Err(ApiError::Validation("Item id must not be empty".to_string()));
        }
        if item.kind.is_empty() {
            return Err(ApiError::Validation(format!("Item {} has no type", item.id)));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(ApiError::Validation(format!("Duplicate item id {}", item.id)));
        }
    }

    let accepted = req.items.len();
    let added = state.received.write().await.extend(req.items);
    tracing::info!(accepted, added, "Offline batch received");

    Ok(Json(BatchReceipt { accepted }))
}

/// GET /api/v1/offline-batch
pub async fn list_received(State(state): State<Arc<AppState>>) -> Json<ReceivedResponse> {
    let received = state.received.read().await;
    Json(ReceivedResponse {
        count: received.len(),
        items: received.items().to_vec(),
    })
}
