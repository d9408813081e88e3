//! State database module - SQLite-backed session memory and response cache
pub mod schema;
pub mod migration;
pub mod session_store;
pub mod cache_store;
pub use schema::*;
pub use migration::MigrationManager;
pub use session_store::SessionStore;
pub use cache_store::CacheStore;
use std::path::Path;
use std::sync::Arc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

/// Per-connection settings. WAL lets readers proceed while one writer holds the lock.
fn configure_connection(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
}

pub struct StateDatabase {
    pub sessions: SessionStore,
    pub cache: CacheStore,
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl StateDatabase {
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        info!("Opening state database at: {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        {
            let mut conn = pool.get()?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            let mut migrator = MigrationManager::new(&mut conn);
            migrator.initialize_database()?;
        }

        info!("State database initialized successfully");
        Ok(Self::from_pool(Arc::new(pool)))
    }

    /// Single-connection in-memory database; every pooled connection would
    /// otherwise see its own empty database.
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)?;
        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        Ok(Self::from_pool(Arc::new(pool)))
    }

    fn from_pool(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self {
            sessions: SessionStore::new(Arc::clone(&pool)),
            cache: CacheStore::new(Arc::clone(&pool)),
            pool,
        }
    }

    pub fn get_stats(&self) -> anyhow::Result<DatabaseStats> {
        let conn = self.pool.get()?;
        Ok(migration::get_database_stats(&conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        {
            let db = StateDatabase::new(&path).unwrap();
            db.sessions.set_consent("s1", true).unwrap();
        }

        let db = StateDatabase::new(&path).unwrap();
        assert!(db.sessions.consent("s1").unwrap());
        assert_eq!(db.get_stats().unwrap().sessions, 1);
    }
}
