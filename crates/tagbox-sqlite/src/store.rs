//! Transactional store over a [`SqlitePool`]

use crate::config::SqliteConfig;
use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use crate::repo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use tagbox_core::model::{
    ElementId, ElementRecord, NewElement, NewUser, Tag, TagName, User, UserId,
};
use tagbox_core::storage::{
    AssociationStore, ElementQuery, ElementRepository, Store, TagRegistry, TokenRepository,
    UnitOfWork, UserRepository,
};
use tagbox_core::{CoreError, CoreResult};
use tracing::debug;

/// SQLite-backed [`Store`]
///
/// Each `transact` call holds the connection for its whole duration and runs
/// inside an immediate transaction, so writers never interleave.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database described by `config`
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::new(config)?))
    }

    /// Fresh in-memory database
    pub fn memory() -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::memory()?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn transact<T, F>(&self, work: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn UnitOfWork) -> CoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            pool.with_connection_mut(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let outcome = {
                    let mut uow = SqliteUnitOfWork::new(&tx);
                    work(&mut uow)
                };
                match &outcome {
                    Ok(_) => tx.commit()?,
                    Err(e) => {
                        debug!(error = %e, "rolling back transaction");
                        tx.rollback()?;
                    }
                }
                Ok(outcome)
            })
        })
        .await
        .map_err(|e| SqliteError::Task(e.to_string()))?
        .map_err(CoreError::from)?
    }
}

/// One open transaction seen through the storage traits
pub struct SqliteUnitOfWork<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteUnitOfWork<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl TagRegistry for SqliteUnitOfWork<'_> {
    fn get_or_create_tag(&mut self, name: &TagName, now: DateTime<Utc>) -> CoreResult<Tag> {
        repo::tag::get_or_create_tx(self.conn, name, now).map_err(Into::into)
    }

    fn find_tags(&mut self, name: &str) -> CoreResult<Vec<Tag>> {
        repo::tag::find_tx(self.conn, name).map_err(Into::into)
    }

    fn list_tags(&mut self) -> CoreResult<Vec<Tag>> {
        repo::tag::list_tx(self.conn).map_err(Into::into)
    }
}

impl AssociationStore for SqliteUnitOfWork<'_> {
    fn attach(&mut self, element: ElementId, tag: &Tag, now: DateTime<Utc>) -> CoreResult<()> {
        repo::tagging::attach_tx(self.conn, element, tag.id, now).map_err(Into::into)
    }

    fn detach(&mut self, element: ElementId, tag: &Tag) -> CoreResult<()> {
        repo::tagging::detach_tx(self.conn, element, tag.id).map_err(Into::into)
    }

    fn tags_of(&mut self, element: ElementId) -> CoreResult<Vec<Tag>> {
        repo::tagging::tags_of_tx(self.conn, element).map_err(Into::into)
    }

    fn elements_with_any_tag(&mut self, names: &[String]) -> CoreResult<BTreeSet<ElementId>> {
        repo::tagging::elements_with_any_tx(self.conn, names).map_err(Into::into)
    }

    fn elements_with_all_tags(&mut self, names: &[String]) -> CoreResult<BTreeSet<ElementId>> {
        repo::tagging::elements_with_all_tx(self.conn, names).map_err(Into::into)
    }
}

impl ElementRepository for SqliteUnitOfWork<'_> {
    fn insert_element(&mut self, new: &NewElement) -> CoreResult<ElementId> {
        repo::element::insert_tx(self.conn, new).map_err(Into::into)
    }

    fn element(&mut self, id: ElementId) -> CoreResult<Option<ElementRecord>> {
        repo::element::get_tx(self.conn, id).map_err(Into::into)
    }

    fn save_element(&mut self, record: &ElementRecord) -> CoreResult<()> {
        repo::element::save_tx(self.conn, record).map_err(Into::into)
    }

    fn delete_element(&mut self, id: ElementId) -> CoreResult<bool> {
        repo::element::delete_tx(self.conn, id).map_err(Into::into)
    }

    fn query_elements(&mut self, query: &ElementQuery<'_>) -> CoreResult<Vec<ElementRecord>> {
        repo::element::query_tx(self.conn, query).map_err(Into::into)
    }
}

impl UserRepository for SqliteUnitOfWork<'_> {
    fn insert_user(&mut self, new: &NewUser) -> CoreResult<UserId> {
        repo::user::insert_tx(self.conn, new).map_err(Into::into)
    }

    fn user(&mut self, id: UserId) -> CoreResult<Option<User>> {
        repo::user::get_tx(self.conn, id).map_err(Into::into)
    }

    fn user_by_username(&mut self, username: &str) -> CoreResult<Option<User>> {
        repo::user::by_username_tx(self.conn, username).map_err(Into::into)
    }

    fn list_users(&mut self) -> CoreResult<Vec<User>> {
        repo::user::list_tx(self.conn).map_err(Into::into)
    }

    fn save_user(&mut self, user: &User) -> CoreResult<()> {
        repo::user::save_tx(self.conn, user).map_err(Into::into)
    }
}

impl TokenRepository for SqliteUnitOfWork<'_> {
    fn token_for_user(&mut self, user: UserId) -> CoreResult<Option<String>> {
        repo::user::token_for_user_tx(self.conn, user).map_err(Into::into)
    }

    fn insert_token(&mut self, key: &str, user: UserId, now: DateTime<Utc>) -> CoreResult<()> {
        repo::user::insert_token_tx(self.conn, key, user, now).map_err(Into::into)
    }

    fn user_for_token(&mut self, key: &str) -> CoreResult<Option<User>> {
        repo::user::user_for_token_tx(self.conn, key).map_err(Into::into)
    }
}
