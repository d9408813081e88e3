//! Prompt-keyed response cache

pub mod response_cache;

pub use response_cache::{ResponseCache, REPLAY_CHUNK_CHARS};
