//! Shared SQLite connection
//!
//! One connection behind a mutex. Holding the lock for a whole transaction
//! is what serializes writers, so there is no pool of connections to
//! coordinate.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::{functions, schema};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cloneable handle to the database connection
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: SqliteConfig,
}

impl SqlitePool {
    /// Open the database, apply settings, register functions and migrate
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Opening SQLite database");

        let conn = open(&config)?;
        apply_settings(&conn, &config)?;
        functions::register_functions(&conn)?;
        schema::apply_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Private in-memory database
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run `f` with the connection locked
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        f(&self.conn.lock())
    }

    /// Run `f` with exclusive access, as needed to open a transaction
    pub fn with_connection_mut<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        f(&mut self.conn.lock())
    }
}

fn open(config: &SqliteConfig) -> SqliteResult<Connection> {
    if config.is_memory() {
        return Ok(Connection::open_in_memory()?);
    }

    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            SqliteError::Connection(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    Ok(Connection::open(&config.path)?)
}

fn apply_settings(conn: &Connection, config: &SqliteConfig) -> SqliteResult<()> {
    if config.wal_mode {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!(%mode, "WAL journal mode not available");
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }

    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    conn.busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms)))?;
    conn.pragma_update(None, "cache_size", config.cache_size)?;
    if config.mmap_size > 0 {
        let _: i64 =
            conn.pragma_update_and_check(None, "mmap_size", config.mmap_size, |row| row.get(0))?;
    }
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    debug!(
        wal = config.wal_mode,
        foreign_keys = config.foreign_keys,
        busy_timeout_ms = config.busy_timeout_ms,
        "SQLite settings applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pragma_i64(pool: &SqlitePool, name: &str) -> i64 {
        pool.with_connection(|conn| Ok(conn.pragma_query_value(None, name, |row| row.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_file_database_in_nested_dir_uses_wal() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("tagbox.db");

        let pool = SqlitePool::new(SqliteConfig::new(&db_path)).unwrap();
        assert!(db_path.exists());

        let mode: String = pool
            .with_connection(|conn| {
                Ok(conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_settings_follow_config() {
        let pool = SqlitePool::new(SqliteConfig {
            busy_timeout_ms: 1_234,
            ..SqliteConfig::memory()
        })
        .unwrap();
        assert_eq!(pragma_i64(&pool, "foreign_keys"), 1);
        assert_eq!(pragma_i64(&pool, "busy_timeout"), 1_234);

        let off = SqlitePool::new(SqliteConfig {
            foreign_keys: false,
            ..SqliteConfig::memory()
        })
        .unwrap();
        assert_eq!(pragma_i64(&off, "foreign_keys"), 0);
    }

    #[test]
    fn test_open_migrates_and_registers_search() {
        let pool = SqlitePool::memory().unwrap();

        pool.with_connection(|conn| {
            let tables: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'auth_tokens', 'tags', 'elements', 'taggings')",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(tables, 5);

            let hit: bool = conn.query_row(
                &format!("SELECT {}('Ä', 'bär', NULL)", functions::SEARCH_FUNCTION),
                [],
                |row| row.get(0),
            )?;
            assert!(hit);
            Ok(())
        })
        .unwrap();
    }
}
