//! Redacted per-session interaction log.
//!
//! Redaction masks every word of five or more word characters. It is a coarse
//! filter: short names, initials and numbers under five digits pass through,
//! so the log is not a guarantee of anonymity.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::state_db::{AuditEntry, StateDatabase};
use crate::urgency::UrgencyLevel;
use crate::utils::TextUtils;

/// Audit entries kept per session.
pub const AUDIT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AuditLogger {
    db: Arc<StateDatabase>,
}

impl AuditLogger {
    pub fn new(db: Arc<StateDatabase>) -> Self {
        Self { db }
    }

    pub fn log(&self, session_id: &str, message: &str, level: UrgencyLevel) {
        let entry = AuditEntry {
            logged_at: Utc::now(),
            anon_query: TextUtils::redact_long_words(message).into_owned(),
            urgency_level: level.as_u8(),
        };
        match self.db.sessions.append_audit(session_id, &entry, AUDIT_LIMIT) {
            Ok(()) => debug!(
                "Audit [{}] level {}: {}",
                session_id,
                entry.urgency_level,
                TextUtils::truncate_with_ellipsis(&entry.anon_query, 80)
            ),
            Err(e) => warn!("Failed to write audit entry for session {}: {}", session_id, e),
        }
    }

    pub fn entries(&self, session_id: &str) -> Vec<AuditEntry> {
        self.db.sessions.audit_entries(session_id).unwrap_or_else(|e| {
            warn!("Failed to read audit log for session {}: {}", session_id, e);
            Vec::new()
        })
    }
}
