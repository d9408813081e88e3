//! Prompt-to-reply generation with the response cache in front of the backend.
//!
//! Every reply that leaves this module ends with `ETHICS_DISCLAIMER`, including
//! failures, which are turned into ordinary text.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use super::{BackendRequest, GenerationBackend, SamplingOptions};
use crate::cache_management::{ResponseCache, REPLAY_CHUNK_CHARS};
use crate::config::Config;
use crate::context_engine::{PromptBuilder, PromptRequest};
use crate::error::BackendError;
use crate::metrics;
use crate::utils::TextUtils;

pub const ETHICS_DISCLAIMER: &str = concat!(
    "\n",
    "⚠️ IMPORTANT ETHICS NOTICE: \n",
    "I am DoctorAI, an AI tool for educational guidance based on AHA/WHO data. \n",
    "I am NOT a doctor and cannot diagnose, treat, or provide medical advice. \n",
    "Always consult a certified cardiologist for your health. \n",
    "Your data is anonymous and not stored without consent. \n",
    "If in doubt, seek immediate professional help.\n",
);

pub fn inject_ethics(text: &str) -> String {
    format!("{}\n\n{}", text, ETHICS_DISCLAIMER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One reply once the backend is done.
    Complete,
    /// Text pieces forwarded as the backend produces them.
    Incremental,
}

pub enum GenerationOutput {
    Complete(String),
    Incremental(BoxStream<'static, String>),
}

impl GenerationOutput {
    /// Drains the output into one string.
    pub async fn into_text(self) -> String {
        match self {
            GenerationOutput::Complete(text) => text,
            GenerationOutput::Incremental(chunks) => chunks.collect::<Vec<_>>().await.concat(),
        }
    }
}

impl std::fmt::Debug for GenerationOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationOutput::Complete(text) => f.debug_tuple("Complete").field(&text.len()).finish(),
            GenerationOutput::Incremental(_) => f.write_str("Incremental(..)"),
        }
    }
}

fn record_failure(err: &BackendError) {
    warn!("Generation failed: {}", err);
    metrics::inc_backend_failure(err.kind());
}

pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<ResponseCache>,
    prompt_builder: PromptBuilder,
    options: SamplingOptions,
    timeout: Duration,
    cache_error_responses: bool,
}

impl GenerationClient {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<ResponseCache>,
        options: SamplingOptions,
        timeout: Duration,
        cache_error_responses: bool,
    ) -> Self {
        Self {
            backend,
            cache,
            prompt_builder: PromptBuilder,
            options,
            timeout,
            cache_error_responses,
        }
    }

    pub fn from_config(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<ResponseCache>,
        cfg: &Config,
    ) -> Self {
        Self::new(
            backend,
            cache,
            SamplingOptions {
                temperature: cfg.generation_temperature,
                top_p: Some(cfg.generation_top_p),
            },
            Duration::from_secs(cfg.generate_timeout_seconds),
            cfg.cache_error_responses,
        )
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub async fn generate(&self, request: &PromptRequest, mode: DeliveryMode) -> GenerationOutput {
        let prompt = self.prompt_builder.build(request);

        if let Some(cached) = self.cache.get(&prompt) {
            metrics::inc_cache(true);
            debug!("Serving cached reply ({} chars)", cached.len());
            return match mode {
                DeliveryMode::Complete => GenerationOutput::Complete(cached),
                DeliveryMode::Incremental => GenerationOutput::Incremental(
                    stream::iter(TextUtils::chunk_chars(&cached, REPLAY_CHUNK_CHARS)).boxed(),
                ),
            };
        }
        metrics::inc_cache(false);

        match mode {
            DeliveryMode::Complete => GenerationOutput::Complete(self.generate_complete(prompt).await),
            DeliveryMode::Incremental => GenerationOutput::Incremental(self.generate_incremental(prompt).await),
        }
    }

    fn backend_request(&self, prompt: String) -> BackendRequest {
        BackendRequest { prompt, options: self.options, timeout: self.timeout }
    }

    /// Cache-miss path for single-shot replies.
    async fn generate_complete(&self, prompt: String) -> String {
        let request = self.backend_request(prompt);
        match self.backend.complete(&request).await {
            Ok(reply) => {
                let text = inject_ethics(&reply);
                self.cache.put(&request.prompt, &text);
                info!("Generated reply ({} chars)", text.len());
                text
            }
            Err(e) => {
                record_failure(&e);
                let text = inject_ethics(&e.user_message());
                if e.is_http_status() && self.cache_error_responses {
                    self.cache.put(&request.prompt, &text);
                }
                text
            }
        }
    }

    /// Cache-miss path for incremental replies. The disclaimer goes out as the
    /// last piece; the concatenation of all pieces is what gets cached.
    async fn generate_incremental(&self, prompt: String) -> BoxStream<'static, String> {
        let request = self.backend_request(prompt);
        let mut events = match self.backend.stream(&request).await {
            Ok(events) => events,
            Err(e) => {
                record_failure(&e);
                let text = inject_ethics(&e.user_message());
                if e.is_http_status() && self.cache_error_responses {
                    self.cache.put(&request.prompt, &text);
                }
                return stream::iter(vec![text]).boxed();
            }
        };

        let cache = Arc::clone(&self.cache);
        let prompt = request.prompt;

        let chunks = async_stream::stream! {
            let mut forwarded = String::new();

            while let Some(event) = events.next().await {
                match event {
                    // Nothing on the completion line is forwarded.
                    Ok(event) if event.done => break,
                    Ok(event) => {
                        if !event.text.is_empty() {
                            forwarded.push_str(&event.text);
                            yield event.text;
                        }
                    }
                    Err(e) => {
                        record_failure(&e);
                        yield inject_ethics(&e.user_message());
                        return;
                    }
                }
            }

            let tail = format!("\n\n{}", ETHICS_DISCLAIMER);
            if forwarded.is_empty() {
                warn!("Generation stream ended without any text; not caching");
            } else {
                forwarded.push_str(&tail);
                cache.put(&prompt, &forwarded);
                info!("Streamed reply ({} chars)", forwarded.len());
            }
            yield tail;
        };

        chunks.boxed()
    }
}
