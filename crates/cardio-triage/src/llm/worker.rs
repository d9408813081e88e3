//! Talks to the generation backend over HTTP (`POST <backend-url>`), Ollama
//! `/api/generate` wire format: one JSON object for single-shot replies,
//! newline-delimited JSON objects when streaming.
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BackendRequest, EventStream, GenerationBackend, SamplingOptions, StreamEvent};
use crate::config::Config;
use crate::error::BackendError;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// A streamed line. Backends disagree on the name of the text field.
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    done: bool,
}

impl StreamLine {
    fn increment(self) -> String {
        [self.response, self.output, self.text]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .unwrap_or_default()
    }
}

/// Decodes one line of a streaming reply. Blank lines yield nothing; a line
/// that is not a JSON object is passed through as literal text.
pub(crate) fn decode_line(raw: &[u8]) -> Option<StreamEvent> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamLine>(line) {
        Ok(parsed) => {
            let done = parsed.done;
            Some(StreamEvent { text: parsed.increment(), done })
        }
        Err(e) => {
            debug!("Undecodable stream line ({}), forwarding as text", e);
            Some(StreamEvent { text: line.to_string(), done: false })
        }
    }
}

pub struct LLMWorker {
    backend_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl LLMWorker {
    pub fn new(backend_url: impl Into<String>, model: impl Into<String>) -> Self {
        let backend_url = backend_url.into();
        let model = model.into();
        info!("LLM worker initialized with backend: {} (model {})", backend_url, model);
        Self {
            backend_url,
            model,
            http_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.backend_url.clone(), cfg.model.clone())
    }

    async fn send(
        &self,
        request: &BackendRequest,
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let secs = request.timeout.as_secs();
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream,
            options: request.options,
        };

        // One deadline for the headers and, on failure, the error body.
        let deadline = tokio::time::Instant::now() + request.timeout;
        let pending = self.http_client.post(&self.backend_url).json(&body).send();
        let response = tokio::time::timeout_at(deadline, pending)
            .await
            .map_err(|_| BackendError::Timeout(secs))?
            .map_err(|e| BackendError::from_reqwest(e, secs))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = match tokio::time::timeout_at(deadline, response.text()).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    debug!("Could not read error body: {}", e);
                    String::new()
                }
                Err(_) => {
                    debug!("Error body not received before the deadline");
                    String::new()
                }
            };
            warn!("Generation backend returned HTTP {}", status);
            return Err(BackendError::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for LLMWorker {
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError> {
        debug!("LLM worker generating response (non-streaming, {} chars)", request.prompt.len());
        let secs = request.timeout.as_secs();
        let response = self.send(request, false).await?;

        let parsed: GenerateResponse = tokio::time::timeout(request.timeout, response.json())
            .await
            .map_err(|_| BackendError::Timeout(secs))?
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(parsed.response)
    }

    async fn stream(&self, request: &BackendRequest) -> Result<EventStream, BackendError> {
        debug!("LLM worker starting streaming response ({} chars)", request.prompt.len());
        let idle_timeout = request.timeout;
        let secs = idle_timeout.as_secs();
        let response = self.send(request, true).await?;
        let byte_stream = response.bytes_stream();

        let events = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            futures_util::pin_mut!(byte_stream);

            loop {
                // The deadline applies between reads, not to the whole reply.
                let next = match tokio::time::timeout(idle_timeout, byte_stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(BackendError::Timeout(secs));
                        return;
                    }
                };

                match next {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = buffer.drain(..=pos).collect();
                            if let Some(event) = decode_line(&line) {
                                let done = event.done;
                                yield Ok(event);
                                if done {
                                    return;
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield Err(BackendError::from_reqwest(e, secs));
                        return;
                    }
                    None => break,
                }
            }

            if let Some(event) = decode_line(&buffer) {
                yield Ok(event);
            }
        };

        Ok(Box::pin(events))
    }

    fn endpoint(&self) -> &str {
        &self.backend_url
    }

    fn model(&self) -> &str {
        &self.model
    }
}
