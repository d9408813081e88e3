//! Session controls.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::metrics;
use crate::shared_state::UnifiedAppState;

/// `DELETE /session/:id/consent`: withdraws consent and drops the session's
/// question history. Redacted audit entries are kept.
pub async fn revoke_consent(
    State(state): State<UnifiedAppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.triage.revoke_consent(&session_id) {
        Ok(forgotten) => {
            metrics::inc_request("/session/consent", "200");
            Json(json!({
                "session_id": session_id,
                "consent": false,
                "forgotten_questions": forgotten,
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to revoke consent for session {}: {}", session_id, e);
            metrics::inc_request("/session/consent", "500");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to revoke consent" })),
            )
                .into_response()
        }
    }
}
