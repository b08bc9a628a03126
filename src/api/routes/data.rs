//! Snapshot Route
//!
//! - GET /data.json - The dashboard snapshot clients bootstrap from

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::model::AppData;

/// GET /data.json
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<AppData> {
    Json(state.snapshot.as_ref().clone())
}
