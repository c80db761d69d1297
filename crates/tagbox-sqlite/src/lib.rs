//! SQLite storage backend for tagbox
//!
//! Implements the core storage traits on top of a single SQLite database.
//!
//! ## Features
//!
//! - **Transactions**: every [`SqliteStore::transact`](tagbox_core::Store::transact)
//!   call is one SQLite transaction, rolled back on error
//! - **WAL Mode**: optimized for concurrent read access with write-ahead logging
//! - **Cascades**: foreign keys remove taggings together with their element
//! - **Search**: a registered SQL function gives Unicode case folding
//! - **Thread Safety**: Arc<Mutex<Connection>> pattern, work runs on the
//!   blocking pool
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tagbox_sqlite::{SqliteConfig, SqlitePool, SqliteStore};
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./tagbox.db"))?;
//! let store = SqliteStore::new(pool);
//! let tags = store.transact(|uow| uow.list_tags()).await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod functions;
pub mod repo;
pub mod schema;
pub mod store;

// Re-exports
pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use store::{SqliteStore, SqliteUnitOfWork};
