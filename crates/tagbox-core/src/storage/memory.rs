//! In-memory store
//!
//! Keeps all state behind one mutex. A transaction works on a copy of the
//! state and swaps it in only on success, so a failed call leaves nothing
//! behind.

use super::{
    AssociationStore, ElementQuery, ElementRepository, Store, TagRegistry, TokenRepository,
    UnitOfWork, UserRepository,
};
use crate::error::{CoreError, CoreResult};
use crate::filter::{search_matches, Combinator};
use crate::model::{
    ElementId, ElementRecord, NewElement, NewUser, Tag, TagId, TagName, Tagging, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::trace;

/// Thread-safe in-memory backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tagging rows, for assertions in tests
    pub fn tagging_count(&self) -> usize {
        self.state.lock().taggings.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn transact<T, F>(&self, work: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn UnitOfWork) -> CoreResult<T> + Send + 'static,
    {
        let mut state = self.state.lock();
        let mut scratch = state.clone();
        let out = work(&mut scratch)?;
        *state = scratch;
        trace!("memory transaction committed");
        Ok(out)
    }
}

#[derive(Clone, Default)]
struct MemoryState {
    last_id: i64,
    tags: BTreeMap<TagId, Tag>,
    elements: BTreeMap<ElementId, ElementRecord>,
    taggings: BTreeMap<(ElementId, TagId), Tagging>,
    users: BTreeMap<UserId, User>,
    tokens: BTreeMap<String, UserId>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn sorted_by_name(mut tags: Vec<Tag>) -> Vec<Tag> {
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn tag_ids_named(&self, names: &[String]) -> BTreeSet<TagId> {
        self.tags
            .values()
            .filter(|t| names.contains(&t.name))
            .map(|t| t.id)
            .collect()
    }
}

impl TagRegistry for MemoryState {
    fn get_or_create_tag(&mut self, name: &TagName, now: DateTime<Utc>) -> CoreResult<Tag> {
        if let Some(tag) = self.tags.values().find(|t| t.name == name.as_str()) {
            return Ok(tag.clone());
        }
        let tag = Tag {
            id: TagId(self.next_id()),
            name: name.to_string(),
            created_at: now,
        };
        self.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    fn find_tags(&mut self, name: &str) -> CoreResult<Vec<Tag>> {
        Ok(self
            .tags
            .values()
            .filter(|t| t.name == name)
            .cloned()
            .collect())
    }

    fn list_tags(&mut self) -> CoreResult<Vec<Tag>> {
        Ok(Self::sorted_by_name(self.tags.values().cloned().collect()))
    }
}

impl AssociationStore for MemoryState {
    fn attach(&mut self, element: ElementId, tag: &Tag, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.elements.contains_key(&element) {
            return Err(CoreError::not_found(format!("element {element}")));
        }
        self.taggings
            .entry((element, tag.id))
            .or_insert_with(|| Tagging {
                element_id: element,
                tag_id: tag.id,
                created_at: now,
            });
        Ok(())
    }

    fn detach(&mut self, element: ElementId, tag: &Tag) -> CoreResult<()> {
        self.taggings.remove(&(element, tag.id));
        Ok(())
    }

    fn tags_of(&mut self, element: ElementId) -> CoreResult<Vec<Tag>> {
        let tags = self
            .taggings
            .range((element, TagId(i64::MIN))..=(element, TagId(i64::MAX)))
            .filter_map(|((_, tag_id), _)| self.tags.get(tag_id).cloned())
            .collect();
        Ok(Self::sorted_by_name(tags))
    }

    fn elements_with_any_tag(&mut self, names: &[String]) -> CoreResult<BTreeSet<ElementId>> {
        let wanted = self.tag_ids_named(names);
        Ok(self
            .taggings
            .keys()
            .filter(|(_, tag_id)| wanted.contains(tag_id))
            .map(|(element_id, _)| *element_id)
            .collect())
    }

    fn elements_with_all_tags(&mut self, names: &[String]) -> CoreResult<BTreeSet<ElementId>> {
        let wanted = self.tag_ids_named(names);
        let distinct_names: BTreeSet<&String> = names.iter().collect();
        // A name with no registered tag can never be satisfied
        if wanted.len() < distinct_names.len() {
            return Ok(BTreeSet::new());
        }
        let mut counts: BTreeMap<ElementId, usize> = BTreeMap::new();
        for (element_id, tag_id) in self.taggings.keys() {
            if wanted.contains(tag_id) {
                *counts.entry(*element_id).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter(|(_, n)| *n == wanted.len())
            .map(|(id, _)| id)
            .collect())
    }
}

impl ElementRepository for MemoryState {
    fn insert_element(&mut self, new: &NewElement) -> CoreResult<ElementId> {
        if let Some(owner) = new.ownership.owner() {
            if !self.users.contains_key(&owner) {
                return Err(CoreError::not_found(format!("user {owner}")));
            }
        }
        let id = ElementId(self.next_id());
        self.elements.insert(
            id,
            ElementRecord {
                id,
                title: new.title.clone(),
                description: new.description.clone(),
                ownership: new.ownership,
                created_at: new.created_at,
                updated_at: new.created_at,
            },
        );
        Ok(id)
    }

    fn element(&mut self, id: ElementId) -> CoreResult<Option<ElementRecord>> {
        Ok(self.elements.get(&id).cloned())
    }

    fn save_element(&mut self, record: &ElementRecord) -> CoreResult<()> {
        let existing = self
            .elements
            .get_mut(&record.id)
            .ok_or_else(|| CoreError::not_found(format!("element {}", record.id)))?;
        existing.title = record.title.clone();
        existing.description = record.description.clone();
        existing.updated_at = record.updated_at;
        Ok(())
    }

    fn delete_element(&mut self, id: ElementId) -> CoreResult<bool> {
        let existed = self.elements.remove(&id).is_some();
        self.taggings.retain(|(element_id, _), _| *element_id != id);
        Ok(existed)
    }

    fn query_elements(&mut self, query: &ElementQuery<'_>) -> CoreResult<Vec<ElementRecord>> {
        let tagged = if query.tags.is_empty() {
            None
        } else {
            Some(match query.combinator {
                Combinator::All => self.elements_with_all_tags(query.tags)?,
                Combinator::Any => self.elements_with_any_tag(query.tags)?,
            })
        };
        Ok(self
            .elements
            .values()
            .filter(|e| tagged.as_ref().map_or(true, |ids| ids.contains(&e.id)))
            .filter(|e| {
                query.search.map_or(true, |needle| {
                    search_matches(needle, e.title.as_deref(), e.description.as_deref())
                })
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

impl UserRepository for MemoryState {
    fn insert_user(&mut self, new: &NewUser) -> CoreResult<UserId> {
        if self.users.values().any(|u| u.username == new.username) {
            return Err(CoreError::validation(format!(
                "username '{}' is already taken",
                new.username
            )));
        }
        let id = UserId(self.next_id());
        self.users.insert(
            id,
            User {
                id,
                username: new.username.clone(),
                password_hash: new.password_hash.clone(),
                is_admin: new.is_admin,
                created_at: new.created_at,
            },
        );
        Ok(id)
    }

    fn user(&mut self, id: UserId) -> CoreResult<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    fn user_by_username(&mut self, username: &str) -> CoreResult<Option<User>> {
        Ok(self.users.values().find(|u| u.username == username).cloned())
    }

    fn list_users(&mut self) -> CoreResult<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }

    fn save_user(&mut self, user: &User) -> CoreResult<()> {
        if self
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(CoreError::validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        let existing = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| CoreError::not_found(format!("user {}", user.id)))?;
        existing.username = user.username.clone();
        existing.password_hash = user.password_hash.clone();
        existing.is_admin = user.is_admin;
        Ok(())
    }
}

impl TokenRepository for MemoryState {
    fn token_for_user(&mut self, user: UserId) -> CoreResult<Option<String>> {
        Ok(self
            .tokens
            .iter()
            .find(|(_, owner)| **owner == user)
            .map(|(key, _)| key.clone()))
    }

    fn insert_token(&mut self, key: &str, user: UserId, _now: DateTime<Utc>) -> CoreResult<()> {
        self.tokens.retain(|_, owner| *owner != user);
        self.tokens.insert(key.to_string(), user);
        Ok(())
    }

    fn user_for_token(&mut self, key: &str) -> CoreResult<Option<User>> {
        Ok(self
            .tokens
            .get(key)
            .and_then(|id| self.users.get(id))
            .cloned())
    }
}
