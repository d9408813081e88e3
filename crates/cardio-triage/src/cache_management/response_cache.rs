//! Generated replies keyed by the SHA-256 of the fully built prompt.
//!
//! Entries expire lazily: a read older than the TTL is a miss, but the row stays
//! until the same prompt is written again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::state_db::StateDatabase;

/// Size of the pieces a cached reply is re-chunked into for incremental replay.
pub const REPLAY_CHUNK_CHARS: usize = 200;

pub struct ResponseCache {
    db: Arc<StateDatabase>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(db: Arc<StateDatabase>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn key_for(prompt: &str) -> String {
        format!("{:x}", Sha256::digest(prompt.as_bytes()))
    }

    pub fn now_secs() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        self.get_at(prompt, Self::now_secs())
    }

    /// Lookup as of `now` (seconds since the epoch).
    pub fn get_at(&self, prompt: &str, now: f64) -> Option<String> {
        let key = Self::key_for(prompt);
        match self.db.cache.get(&key) {
            Ok(Some(entry)) if now - entry.stored_at < self.ttl.as_secs_f64() => {
                debug!("Response cache hit for {}", &key[..12]);
                Some(entry.response)
            }
            Ok(Some(_)) => {
                debug!("Response cache entry {} expired", &key[..12]);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Response cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    pub fn put(&self, prompt: &str, response: &str) {
        self.put_at(prompt, response, Self::now_secs());
    }

    pub fn put_at(&self, prompt: &str, response: &str, stored_at: f64) {
        let key = Self::key_for(prompt);
        if let Err(e) = self.db.cache.put(&key, response, stored_at) {
            warn!("Failed to store response in cache: {}", e);
        }
    }
}
