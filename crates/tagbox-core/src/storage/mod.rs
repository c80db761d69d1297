//! Storage traits
//!
//! The persistent state is split into small, focused traits, one per
//! component:
//!
//! - **TagRegistry**: the global set of uniquely-named tags
//! - **AssociationStore**: element/tag links, unique per pair
//! - **ElementRepository**: element rows
//! - **UserRepository** / **TokenRepository**: accounts and bearer keys
//!
//! All of them are synchronous and operate inside a transaction. A backend
//! bundles them as a [`UnitOfWork`] and exposes [`Store::transact`], which
//! runs a closure against one unit of work and commits only if the closure
//! returns `Ok`. This is what makes an element update atomic: authorization,
//! field writes and every tag directive share one transaction.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use tagbox_core::storage::Store;
//!
//! async fn tag_count<S: Store>(store: &S) -> CoreResult<usize> {
//!     store.transact(|uow| Ok(uow.list_tags()?.len())).await
//! }
//! ```

pub mod memory;

use crate::error::CoreResult;
use crate::filter::Combinator;
use crate::model::{
    ElementId, ElementRecord, NewElement, NewUser, Tag, TagName, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

pub use memory::MemoryStore;

// ============================================================================
// Component traits
// ============================================================================

/// Global set of uniquely-named tags
pub trait TagRegistry {
    /// Return the tag named exactly `name`, creating it if needed
    fn get_or_create_tag(&mut self, name: &TagName, now: DateTime<Utc>) -> CoreResult<Tag>;

    /// Every tag whose name matches `name` exactly
    fn find_tags(&mut self, name: &str) -> CoreResult<Vec<Tag>>;

    /// Look a tag up by exact name. Anything other than a single match is a
    /// miss.
    fn find_tag(&mut self, name: &str) -> CoreResult<Option<Tag>> {
        let mut found = self.find_tags(name)?;
        if found.len() == 1 {
            Ok(found.pop())
        } else {
            Ok(None)
        }
    }

    /// All tags ordered by name
    fn list_tags(&mut self) -> CoreResult<Vec<Tag>>;
}

/// Links between elements and tags
pub trait AssociationStore {
    /// Link `tag` to `element`. Linking an already linked pair is a no-op.
    fn attach(&mut self, element: ElementId, tag: &Tag, now: DateTime<Utc>) -> CoreResult<()>;

    /// Unlink `tag` from `element`. Unlinking a missing pair is a no-op.
    fn detach(&mut self, element: ElementId, tag: &Tag) -> CoreResult<()>;

    /// Tags linked to `element`, ordered by name
    fn tags_of(&mut self, element: ElementId) -> CoreResult<Vec<Tag>>;

    /// Elements linked to at least one of `names`
    fn elements_with_any_tag(&mut self, names: &[String]) -> CoreResult<BTreeSet<ElementId>>;

    /// Elements linked to every one of `names`
    fn elements_with_all_tags(&mut self, names: &[String]) -> CoreResult<BTreeSet<ElementId>>;
}

/// Selection of element rows
///
/// Tag, search and limit are applied by the backend in one pass, so the
/// size of a tag's element set never has to cross the storage boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementQuery<'a> {
    /// Required tag names; empty means no tag restriction
    pub tags: &'a [String],
    pub combinator: Combinator,
    /// Case-insensitive substring over title and description, as decided by
    /// [`crate::filter::search_matches`]
    pub search: Option<&'a str>,
    pub limit: Option<usize>,
}

/// Element rows
pub trait ElementRepository {
    fn insert_element(&mut self, new: &NewElement) -> CoreResult<ElementId>;

    fn element(&mut self, id: ElementId) -> CoreResult<Option<ElementRecord>>;

    /// Overwrite title, description and `updated_at` of an existing row
    fn save_element(&mut self, record: &ElementRecord) -> CoreResult<()>;

    /// Delete a row and its taggings. Returns whether a row existed.
    fn delete_element(&mut self, id: ElementId) -> CoreResult<bool>;

    /// Rows matching `query`, ordered by id
    fn query_elements(&mut self, query: &ElementQuery<'_>) -> CoreResult<Vec<ElementRecord>>;
}

/// User accounts
pub trait UserRepository {
    /// Insert a user. A taken username is a validation error.
    fn insert_user(&mut self, new: &NewUser) -> CoreResult<UserId>;

    fn user(&mut self, id: UserId) -> CoreResult<Option<User>>;

    fn user_by_username(&mut self, username: &str) -> CoreResult<Option<User>>;

    /// All users ordered by id
    fn list_users(&mut self) -> CoreResult<Vec<User>>;

    /// Overwrite username, password hash and admin flag of an existing user
    fn save_user(&mut self, user: &User) -> CoreResult<()>;
}

/// Opaque bearer keys, one per user
pub trait TokenRepository {
    fn token_for_user(&mut self, user: UserId) -> CoreResult<Option<String>>;

    fn insert_token(&mut self, key: &str, user: UserId, now: DateTime<Utc>) -> CoreResult<()>;

    fn user_for_token(&mut self, key: &str) -> CoreResult<Option<User>>;
}

/// Everything a transaction can touch
pub trait UnitOfWork:
    TagRegistry + AssociationStore + ElementRepository + UserRepository + TokenRepository
{
}

impl<T> UnitOfWork for T where
    T: TagRegistry + AssociationStore + ElementRepository + UserRepository + TokenRepository
{
}

// ============================================================================
// Store
// ============================================================================

/// A transactional backend
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Run `work` inside one transaction.
    ///
    /// Changes are committed when `work` returns `Ok` and discarded
    /// otherwise. Transactions on the same store are serialized.
    async fn transact<T, F>(&self, work: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn UnitOfWork) -> CoreResult<T> + Send + 'static;
}
