use crate::{Result, WebError};
use std::sync::Arc;
use tagbox_config::{AppConfig, DatabaseConfig, PasswordConfig, PolicyConfig};
use tagbox_core::{AccessPolicy, Argon2Hasher, Argon2Params, TagboxService};
use tagbox_sqlite::{SqliteConfig, SqliteStore};
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: TagboxService<SqliteStore>,
}

impl AppState {
    pub fn new(service: TagboxService<SqliteStore>) -> Self {
        Self { service }
    }

    /// Open the database and build the service described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = SqliteStore::open(sqlite_config(&config.database))
            .map_err(|e| WebError::Config(format!("Failed to open database: {e}")))?;
        let hasher = Argon2Hasher::new(argon2_params(&config.password))?;

        info!(
            database = %config.database.path.display(),
            anonymous_create = config.policy.allow_anonymous_create,
            "service ready"
        );
        Ok(Self::new(TagboxService::new(
            store,
            access_policy(&config.policy),
            Arc::new(hasher),
        )))
    }
}

pub fn sqlite_config(database: &DatabaseConfig) -> SqliteConfig {
    SqliteConfig {
        path: database.path.clone(),
        wal_mode: database.wal_mode,
        foreign_keys: database.foreign_keys,
        busy_timeout_ms: database.busy_timeout_ms,
        cache_size: database.cache_size,
        mmap_size: database.mmap_size,
    }
}

pub fn argon2_params(password: &PasswordConfig) -> Argon2Params {
    Argon2Params {
        memory_kib: password.memory_kib,
        iterations: password.iterations,
        parallelism: password.parallelism,
    }
}

pub fn access_policy(policy: &PolicyConfig) -> AccessPolicy {
    AccessPolicy {
        allow_anonymous_create: policy.allow_anonymous_create,
    }
}
