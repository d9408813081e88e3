//! Generation backend access
//!
//! `GenerationBackend` is the seam between the triage pipeline and the network.
//! `LLMWorker` implements it against an Ollama-style `/api/generate` endpoint;
//! `GenerationClient` adds the prompt cache, the disclaimer and the
//! degrade-to-text failure policy on top.

pub mod worker;
pub mod generation;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::error::BackendError;

pub use generation::{DeliveryMode, GenerationClient, GenerationOutput, ETHICS_DISCLAIMER};
pub use worker::LLMWorker;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingOptions {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// One prompt for the backend, with its sampling options and deadline.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub prompt: String,
    pub options: SamplingOptions,
    pub timeout: Duration,
}

/// One decoded line of a streaming reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub text: String,
    pub done: bool,
}

pub type EventStream = BoxStream<'static, Result<StreamEvent, BackendError>>;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Single-shot generation; returns the full reply text.
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError>;

    /// Incremental generation. Errors before the first byte come back directly;
    /// later failures arrive as an `Err` item in the stream.
    async fn stream(&self, request: &BackendRequest) -> Result<EventStream, BackendError>;

    /// Where requests go, for health reporting.
    fn endpoint(&self) -> &str;

    fn model(&self) -> &str;
}
