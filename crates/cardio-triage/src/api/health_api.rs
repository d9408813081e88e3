use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::metrics;
use crate::shared_state::UnifiedAppState;

/// `GET /health`: where generation requests go, and with which model.
pub async fn health(State(state): State<UnifiedAppState>) -> Json<Value> {
    metrics::inc_request("/health", "200");
    Json(json!({
        "status": "ok",
        "ollama": state.triage.backend_endpoint(),
        "model": state.triage.model(),
    }))
}
