//! Consent-gated session memory
//!
//! Nothing about a session is retained until its user has said yes. Store
//! failures are logged and read as the conservative default: no consent, no
//! context.

pub mod audit;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::state_db::{RememberedQuestion, StateDatabase};

pub use audit::{AuditLogger, AUDIT_LIMIT};

/// Questions kept per session.
pub const HISTORY_LIMIT: usize = 5;

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

const AFFIRMATIVE_TOKENS: [&str; 4] = ["yes", "y", "consent", "consent granted"];

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<StateDatabase>,
}

impl SessionManager {
    pub fn new(db: Arc<StateDatabase>) -> Self {
        Self { db }
    }

    pub fn is_affirmative(message: &str) -> bool {
        let normalized = message.trim().to_lowercase();
        AFFIRMATIVE_TOKENS.contains(&normalized.as_str())
    }

    pub fn has_consent(&self, session_id: &str) -> bool {
        self.db.sessions.consent(session_id).unwrap_or_else(|e| {
            warn!("Failed to read consent for session {}: {}", session_id, e);
            false
        })
    }

    pub fn grant_consent(&self, session_id: &str) {
        match self.db.sessions.set_consent(session_id, true) {
            Ok(()) => info!("Consent granted for session {}", session_id),
            Err(e) => warn!("Failed to record consent for session {}: {}", session_id, e),
        }
    }

    /// Records a non-affirmative reply to the consent prompt.
    pub fn deny_consent(&self, session_id: &str) {
        if let Err(e) = self.db.sessions.set_consent(session_id, false) {
            warn!("Failed to record consent refusal for session {}: {}", session_id, e);
        }
    }

    /// Withdraws consent and forgets the question history. Returns how many
    /// questions were dropped.
    pub fn revoke_consent(&self, session_id: &str) -> anyhow::Result<usize> {
        self.db.sessions.set_consent(session_id, false)?;
        let removed = self.db.sessions.clear_questions(session_id)?;
        info!("Consent revoked for session {} ({} questions forgotten)", session_id, removed);
        Ok(removed)
    }

    /// Keeps `question` in history if, and only if, the session has consented.
    pub fn remember(&self, session_id: &str, question: &str) {
        match self
            .db
            .sessions
            .append_question_if_consented(session_id, question, Utc::now(), HISTORY_LIMIT)
        {
            Ok(true) => debug!("Remembered question for session {}", session_id),
            Ok(false) => debug!("Session {} has not consented; question not kept", session_id),
            Err(e) => warn!("Failed to remember question for session {}: {}", session_id, e),
        }
    }

    pub fn history(&self, session_id: &str) -> Vec<RememberedQuestion> {
        self.db
            .sessions
            .recent_questions(session_id, HISTORY_LIMIT)
            .unwrap_or_else(|e| {
                warn!("Failed to read history for session {}: {}", session_id, e);
                Vec::new()
            })
    }

    /// Names the most recent remembered question, or nothing.
    pub fn recall_context(&self, session_id: &str) -> String {
        if !self.has_consent(session_id) {
            return String::new();
        }
        match self.db.sessions.recent_questions(session_id, 1) {
            Ok(mut latest) => latest
                .pop()
                .map(|q| format!("Earlier you asked: '{}'", q.question))
                .unwrap_or_default(),
            Err(e) => {
                warn!("Failed to recall context for session {}: {}", session_id, e);
                String::new()
            }
        }
    }
}
