//! Row types and schema for session memory and the response cache
use chrono::{DateTime, Utc};

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    consent INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    asked_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_session_questions_session
    ON session_questions(session_id, id);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    logged_at TEXT NOT NULL,
    anon_query TEXT NOT NULL,
    urgency_level INTEGER NOT NULL CHECK (urgency_level BETWEEN 1 AND 3)
);

CREATE INDEX IF NOT EXISTS idx_audit_log_session
    ON audit_log(session_id, id);

CREATE TABLE IF NOT EXISTS response_cache (
    key TEXT PRIMARY KEY,
    response TEXT NOT NULL,
    stored_at REAL NOT NULL
);
"#;

/// A question kept in session history.
#[derive(Debug, Clone, PartialEq)]
pub struct RememberedQuestion {
    pub question: String,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub logged_at: DateTime<Utc>,
    pub anon_query: String,
    pub urgency_level: u8,
}

/// A cached backend answer; `stored_at` is seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub response: String,
    pub stored_at: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    pub sessions: i64,
    pub remembered_questions: i64,
    pub audit_entries: i64,
    pub cached_responses: i64,
}
