use axum::{Json, extract::State, response::IntoResponse};

use crate::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "trackedKeys": state.gate.len(),
    }))
}
