use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{store::RecordStore, AppState};

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": "connected" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "store": e.to_string() })),
        ),
    }
}
