//! Failure kinds that the pipeline recovers from locally.
//!
//! None of these ever reach the caller of `ask` as an error: every component
//! that can fail hands back one of these and the caller picks the default.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("backend returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout_secs)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Connection(err.to_string())
        }
    }

    /// Label used for the `backend_failures_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Connection(_) => "connection",
            BackendError::Timeout(_) => "timeout",
            BackendError::Status { .. } => "status",
            BackendError::Decode(_) => "decode",
        }
    }

    /// Text shown to the user in place of an answer. The disclaimer is added by the caller.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status { status, .. } => {
                format!("Generation backend error: HTTP {}", status)
            }
            other => format!("Error connecting to the generation backend: {}", other),
        }
    }

    /// Clean HTTP-level failures, the only kind that may ever be cached.
    pub fn is_http_status(&self) -> bool {
        matches!(self, BackendError::Status { .. })
    }
}

/// A reference document that could not be used. Callers treat it as empty.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("document not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_renders_http_code() {
        let err = BackendError::Status { status: 503, body: "overloaded".into() };
        assert_eq!(err.user_message(), "Generation backend error: HTTP 503");
        assert_eq!(err.kind(), "status");
        assert!(err.is_http_status());
    }

    #[test]
    fn transport_errors_are_not_http_status() {
        let err = BackendError::Timeout(10);
        assert!(!err.is_http_status());
        assert!(err.user_message().contains("timed out after 10s"));
    }
}
