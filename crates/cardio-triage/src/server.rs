//! HTTP server startup and routing

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::Method,
    routing::{delete, get, post},
    Router,
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::shared_state::UnifiedAppState;
use crate::triage_service::TriageService;

/// Run the triage HTTP server until Ctrl-C.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    crate::metrics::init_metrics();
    cfg.print_config();

    let triage = Arc::new(TriageService::from_config(&cfg)?);
    // Load the reference data now so the first request does not pay for it.
    triage.knowledge().snapshot();
    match triage.stats() {
        Ok(stats) => info!(
            "State database: {} sessions, {} remembered questions, {} audit entries, {} cached replies",
            stats.sessions, stats.remembered_questions, stats.audit_entries, stats.cached_responses
        ),
        Err(e) => warn!("Could not read state database stats: {}", e),
    }

    let addr = cfg.api_addr()?;
    let state = UnifiedAppState::new(triage, cfg);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

pub fn build_router(state: UnifiedAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    // Covers enrichment plus the wait for the first generated byte.
    let request_timeout = Duration::from_secs(
        state.config.classify_timeout_seconds + state.config.generate_timeout_seconds + 30,
    );
    let max_concurrent = state.config.max_concurrent_requests.max(1);

    Router::new()
        .route("/chat", post(crate::api::chat))
        .route("/session/:id/consent", delete(crate::api::revoke_consent))
        .route("/health", get(crate::api::health))
        .route("/metrics", get(crate::metrics::get_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_support::ScriptedBackend;
    use crate::llm::ETHICS_DISCLAIMER;
    use crate::triage_service::test_support::{service, TestService};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(t: &TestService) -> Router {
        build_router(UnifiedAppState::new(Arc::clone(&t.service), Config::default()))
    }

    async fn post_chat(app: Router, body: Value) -> (StatusCode, Option<String>, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let t = service();
        let response = app(&t)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok", "ollama": "scripted://backend", "model": "scripted"}));
    }

    #[tokio::test]
    async fn empty_message_gets_reply_field() {
        let t = service();
        let (status, _, body) = post_chat(app(&t), json!({"message": "  "})).await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["reply"], format!("Please enter a message.\n\n{}", ETHICS_DISCLAIMER));
    }

    #[tokio::test]
    async fn consent_prompt_is_flagged() {
        let t = service();
        let (_, _, body) = post_chat(app(&t), json!({"message": "hello", "session_id": "web-1"})).await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["requires_consent"], true);
        assert!(body["answer"].as_str().unwrap().starts_with("Welcome!"));

        let (_, _, body) = post_chat(app(&t), json!({"message": "yes", "session_id": "web-1"})).await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert!(body.get("requires_consent").is_none());
        assert!(body["answer"].as_str().unwrap().starts_with("Consent noted."));
    }

    async fn post_raw(app: Router, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri("/chat");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let response = app.oneshot(builder.body(Body::from(body.to_string())).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn chat_body_is_read_without_json_content_type() {
        let t = service();

        let (status, body) = post_raw(app(&t), None, r#"{"message": "hello"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requires_consent"], true);

        let (status, body) = post_raw(app(&t), Some("text/plain"), r#"{"message": "yes"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().starts_with("Consent noted."));
    }

    #[tokio::test]
    async fn unreadable_chat_body_is_a_bad_request() {
        let t = service();
        let (status, body) = post_raw(app(&t), None, "message=hello").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(t.backend.calls(), 0);
    }

    #[tokio::test]
    async fn streamed_answer_is_ndjson_text() {
        let t = service();
        post_chat(app(&t), json!({"message": "yes"})).await;
        t.backend.push_stream(Ok(ScriptedBackend::text_events(&["Drink ", "water."])));

        let (status, content_type, body) = post_chat(app(&t), json!({"message": "I feel tired"})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));

        let pieces: Vec<String> = body
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["reply"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(pieces[0], "Drink ");
        assert_eq!(pieces[1], "water.");
        assert_eq!(pieces.concat(), format!("Drink water.\n\n{}", ETHICS_DISCLAIMER));
    }

    #[tokio::test]
    async fn non_streamed_answer_is_single_reply() {
        let t = service();
        post_chat(app(&t), json!({"message": "yes"})).await;
        t.backend.push_completion(Ok("Sleep well.".into()));

        let (_, _, body) = post_chat(app(&t), json!({"message": "I feel tired", "stream": false})).await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["reply"], format!("Sleep well.\n\n{}", ETHICS_DISCLAIMER));
    }

    #[tokio::test]
    async fn consent_can_be_revoked() {
        let t = service();
        post_chat(app(&t), json!({"message": "yes", "session_id": "s9"})).await;

        let response = app(&t)
            .oneshot(
                Request::delete("/session/s9/consent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, _, body) = post_chat(app(&t), json!({"message": "hi", "session_id": "s9"})).await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["requires_consent"], true);
    }
}
