//! Raw response cache rows. Expiry is decided by the caller.
use crate::state_db::schema::CachedResponse;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub struct CacheStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl CacheStore {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<CachedResponse>> {
        let conn = self.get_conn()?;
        let entry = conn
            .query_row(
                "SELECT response, stored_at FROM response_cache WHERE key = ?1",
                [key],
                |row| {
                    Ok(CachedResponse {
                        response: row.get(0)?,
                        stored_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Unconditional overwrite; the last writer wins.
    pub fn put(&self, key: &str, response: &str, stored_at: f64) -> anyhow::Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO response_cache (key, response, stored_at) VALUES (?1, ?2, ?3)",
            params![key, response, stored_at],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::state_db::StateDatabase;

    #[test]
    fn put_overwrites_existing_entry() {
        let db = StateDatabase::new_in_memory().unwrap();
        db.cache.put("k", "first", 10.0).unwrap();
        db.cache.put("k", "second", 20.0).unwrap();

        let entry = db.cache.get("k").unwrap().unwrap();
        assert_eq!(entry.response, "second");
        assert_eq!(entry.stored_at, 20.0);
    }

    #[test]
    fn missing_key_is_none() {
        let db = StateDatabase::new_in_memory().unwrap();
        assert!(db.cache.get("absent").unwrap().is_none());
    }
}
