//! SQLite connection settings

use std::path::PathBuf;

const MEMORY_PATH: &str = ":memory:";

/// Settings applied when opening the database
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    pub wal_mode: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u32,
    /// Negative values are KiB, positive values are pages
    pub cache_size: i64,
    /// 0 disables memory mapping
    pub mmap_size: i64,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Private in-memory database, mostly for tests
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(MEMORY_PATH),
            wal_mode: false,
            ..Self::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(MEMORY_PATH)
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tagbox.db"),
            wal_mode: true,
            // Taggings cascade through foreign keys
            foreign_keys: true,
            busy_timeout_ms: 5_000,
            cache_size: -16_000,
            mmap_size: 0,
        }
    }
}
