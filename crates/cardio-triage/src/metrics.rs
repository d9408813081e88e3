use prometheus::{Encoder, IntCounterVec, Registry, TextEncoder};
use lazy_static::lazy_static;
use std::sync::OnceLock;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use tracing::warn;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static CACHE_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static URGENCY_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static BACKEND_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

fn register(slot: &OnceLock<IntCounterVec>, name: &str, help: &str, labels: &[&str]) {
    match IntCounterVec::new(prometheus::opts!(name, help), labels) {
        Ok(counter) => {
            if slot.set(counter.clone()).is_ok() {
                REGISTRY.register(Box::new(counter)).ok();
            }
        }
        Err(e) => warn!("Failed to create metric {}: {}", name, e),
    }
}

/// Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    register(&REQ_COUNTER, "requests_total", "Total requests per route", &["route", "status"]);
    register(
        &CACHE_COUNTER,
        "response_cache_total",
        "Response cache lookups by outcome",
        &["outcome"],
    );
    register(
        &URGENCY_COUNTER,
        "urgency_classifications_total",
        "Urgency classifications by level",
        &["level"],
    );
    register(
        &BACKEND_FAILURES,
        "backend_failures_total",
        "Generation backend failures by kind",
        &["kind"],
    );
}

fn inc(slot: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(counter) = slot.get() {
        counter.with_label_values(labels).inc();
    }
}

pub fn inc_request(route: &str, status: &str) {
    inc(&REQ_COUNTER, &[route, status]);
}

pub fn inc_cache(hit: bool) {
    inc(&CACHE_COUNTER, &[if hit { "hit" } else { "miss" }]);
}

pub fn inc_urgency(level: u8) {
    let label = level.to_string();
    inc(&URGENCY_COUNTER, &[label.as_str()]);
}

pub fn inc_backend_failure(kind: &str) {
    inc(&BACKEND_FAILURES, &[kind]);
}

pub async fn get_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, [("content-type", "text/plain")], Vec::new());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_registered_once() {
        init_metrics();
        init_metrics();
        inc_cache(true);
        inc_urgency(1);

        let names: Vec<String> = REGISTRY.gather().iter().map(|f| f.get_name().to_string()).collect();
        assert_eq!(names.iter().filter(|n| n.as_str() == "response_cache_total").count(), 1);
        assert!(names.iter().any(|n| n == "urgency_classifications_total"));
    }
}
