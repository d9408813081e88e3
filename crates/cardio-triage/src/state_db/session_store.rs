use crate::state_db::schema::*;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use chrono::{DateTime, Utc};
use tracing::debug;
use std::sync::Arc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

/// Session memory: consent flag, bounded question history and bounded audit log.
///
/// Every method is one partial update in its own transaction. Writers take an
/// IMMEDIATE lock so concurrent read-modify-write cycles serialize instead of
/// clobbering each other.
pub struct SessionStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SessionStore {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    /// Consent flag; a session never seen before has not consented.
    pub fn consent(&self, session_id: &str) -> anyhow::Result<bool> {
        let conn = self.get_conn()?;
        let consent = conn
            .query_row(
                "SELECT consent FROM sessions WHERE id = ?1",
                [session_id],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(consent.unwrap_or(false))
    }

    pub fn set_consent(&self, session_id: &str, consent: bool) -> anyhow::Result<()> {
        let conn = self.get_conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO sessions (id, consent, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET consent = excluded.consent, updated_at = excluded.updated_at",
            params![session_id, consent, now],
        )?;
        debug!("Session {} consent set to {}", session_id, consent);
        Ok(())
    }

    /// Appends a question only if consent is granted at the moment of the write,
    /// then keeps the newest `keep` entries. Returns whether anything was stored.
    pub fn append_question_if_consented(
        &self,
        session_id: &str,
        question: &str,
        asked_at: DateTime<Utc>,
        keep: usize,
    ) -> anyhow::Result<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let consent = tx
            .query_row(
                "SELECT consent FROM sessions WHERE id = ?1",
                [session_id],
                |row| row.get::<_, bool>(0),
            )
            .optional()?
            .unwrap_or(false);
        if !consent {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO session_questions (session_id, question, asked_at) VALUES (?1, ?2, ?3)",
            params![session_id, question, asked_at],
        )?;
        let dropped = tx.execute(
            "DELETE FROM session_questions
             WHERE session_id = ?1 AND id NOT IN (
                 SELECT id FROM session_questions WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             )",
            params![session_id, keep as i64],
        )?;
        tx.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![asked_at, session_id],
        )?;
        tx.commit()?;

        if dropped > 0 {
            debug!("Dropped {} old question(s) from session {}", dropped, session_id);
        }
        Ok(true)
    }

    /// The newest `limit` questions, oldest first.
    pub fn recent_questions(
        &self,
        session_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<RememberedQuestion>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT question, asked_at FROM (
                 SELECT id, question, asked_at FROM session_questions
                 WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![session_id, limit as i64], |row| {
            Ok(RememberedQuestion {
                question: row.get(0)?,
                asked_at: row.get(1)?,
            })
        })?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }
        Ok(questions)
    }

    pub fn clear_questions(&self, session_id: &str) -> anyhow::Result<usize> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM session_questions WHERE session_id = ?1",
            [session_id],
        )?;
        Ok(removed)
    }

    /// Appends an audit entry and keeps the newest `keep` entries for the session.
    pub fn append_audit(
        &self,
        session_id: &str,
        entry: &AuditEntry,
        keep: usize,
    ) -> anyhow::Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO audit_log (session_id, logged_at, anon_query, urgency_level)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, entry.logged_at, entry.anon_query, entry.urgency_level],
        )?;
        tx.execute(
            "DELETE FROM audit_log
             WHERE session_id = ?1 AND id NOT IN (
                 SELECT id FROM audit_log WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             )",
            params![session_id, keep as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// All retained audit entries, oldest first.
    pub fn audit_entries(&self, session_id: &str) -> anyhow::Result<Vec<AuditEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT logged_at, anon_query, urgency_level FROM audit_log
             WHERE session_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            Ok(AuditEntry {
                logged_at: row.get(0)?,
                anon_query: row.get(1)?,
                urgency_level: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
