//! `POST /chat`: the `ask` operation over HTTP.
//!
//! Streamed answers go out as `text/plain`, one `{"reply": <piece>}` JSON
//! object per line, in backend order.

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::llm::{DeliveryMode, GenerationOutput};
use crate::metrics;
use crate::session::DEFAULT_SESSION_ID;
use crate::shared_state::UnifiedAppState;
use crate::triage_service::AskOutcome;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

fn ndjson_line(piece: &str) -> String {
    format!("{}\n", json!({ "reply": piece }))
}

/// The body is read as JSON whatever the declared content type.
pub async fn chat(State(state): State<UnifiedAppState>, body: Bytes) -> Response {
    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!("Rejecting chat request with unreadable body: {}", e);
            metrics::inc_request("/chat", StatusCode::BAD_REQUEST.as_str());
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Request body must be a JSON object" })))
                .into_response();
        }
    };

    let request_num = state.counters.inc_total_requests();
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    let mode = if req.stream { DeliveryMode::Incremental } else { DeliveryMode::Complete };
    debug!("Chat request #{} for session {} ({} chars)", request_num, session_id, req.message.len());

    let response = match state.triage.ask(&session_id, &req.message, mode).await {
        AskOutcome::EmptyMessage(text) => Json(json!({ "reply": text })).into_response(),
        AskOutcome::ConsentRequired(text) => {
            state.counters.inc_consent_prompts();
            Json(json!({ "answer": text, "requires_consent": true })).into_response()
        }
        AskOutcome::ConsentGranted(text) => Json(json!({ "answer": text })).into_response(),
        AskOutcome::Answer(output) => {
            let answered = state.counters.inc_answered_messages();
            info!("Answering message #{} for session {}", answered, session_id);
            match output {
                GenerationOutput::Complete(text) => Json(json!({ "reply": text })).into_response(),
                GenerationOutput::Incremental(pieces) => {
                    let lines = pieces.map(|piece| Ok::<_, Infallible>(ndjson_line(&piece)));
                    (
                        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                        Body::from_stream(lines),
                    )
                        .into_response()
                }
            }
        }
    };

    metrics::inc_request("/chat", response.status().as_str());
    response
}
