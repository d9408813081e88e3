//! In-process backend that replays scripted replies.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendRequest, EventStream, GenerationBackend, StreamEvent};
use crate::error::BackendError;

type ScriptedStream = Result<Vec<Result<StreamEvent, BackendError>>, BackendError>;

#[derive(Default)]
pub struct ScriptedBackend {
    completions: Mutex<VecDeque<Result<String, BackendError>>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn push_completion(&self, reply: Result<String, BackendError>) {
        self.completions.lock().unwrap().push_back(reply);
    }

    pub fn push_stream(&self, events: ScriptedStream) {
        self.streams.lock().unwrap().push_back(events);
    }

    /// One event per piece, then a final empty `done` event.
    pub fn text_events(pieces: &[&str]) -> Vec<Result<StreamEvent, BackendError>> {
        pieces
            .iter()
            .map(|p| Ok(StreamEvent { text: p.to_string(), done: false }))
            .chain(std::iter::once(Ok(StreamEvent { text: String::new(), done: true })))
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, request: &BackendRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Connection("no scripted reply".into())))
    }

    async fn stream(&self, request: &BackendRequest) -> Result<EventStream, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let events = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Connection("no scripted stream".into())))?;
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn endpoint(&self) -> &str {
        "scripted://backend"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
