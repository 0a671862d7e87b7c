//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::ui::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": if state.drain.is_draining() { "draining" } else { "ok" },
        "rooms": state.registry.room_count().await,
        "connections": state.drain.active(),
    }))
}
