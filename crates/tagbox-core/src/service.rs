//! Logical operations exposed to the request-handling layer
//!
//! [`TagboxService`] applies the access policy, then runs each operation in
//! exactly one store transaction.

use crate::coordinator;
use crate::credentials::CredentialHasher;
use crate::error::{CoreError, CoreResult};
use crate::filter::ElementFilter;
use crate::model::{Element, ElementId, NewUser, Principal, Tag, User, UserId};
use crate::policy::AccessPolicy;
use crate::storage::Store;
use crate::transfer::{ElementCreate, ElementUpdate, UserCreate, UserUpdate};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct TagboxService<S> {
    store: Arc<S>,
    policy: AccessPolicy,
    hasher: Arc<dyn CredentialHasher>,
}

impl<S> Clone for TagboxService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
            hasher: self.hasher.clone(),
        }
    }
}

impl<S: Store> TagboxService<S> {
    pub fn new(store: S, policy: AccessPolicy, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            store: Arc::new(store),
            policy,
            hasher,
        }
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    pub async fn create_element(
        &self,
        principal: Option<&Principal>,
        request: ElementCreate,
    ) -> CoreResult<Element> {
        let ownership = self.policy.creation_ownership(principal)?;
        let element = self
            .store
            .transact(move |uow| coordinator::create_element(uow, ownership, &request, Utc::now()))
            .await?;
        info!(element = %element.id, owner = ?ownership.owner(), "created element");
        Ok(element)
    }

    pub async fn update_element(
        &self,
        principal: Option<&Principal>,
        id: ElementId,
        update: ElementUpdate,
    ) -> CoreResult<Element> {
        let principal = self.policy.require_writer(principal)?.clone();
        let result = self
            .store
            .transact(move |uow| {
                coordinator::update_element(uow, Some(&principal), id, &update, Utc::now())
            })
            .await;
        if let Err(CoreError::Unauthorized(reason)) = &result {
            warn!(element = %id, %reason, "rejected element update");
        }
        result
    }

    pub async fn delete_element(&self, principal: Option<&Principal>, id: ElementId) -> CoreResult<()> {
        let principal = self.policy.require_writer(principal)?.clone();
        self.store
            .transact(move |uow| coordinator::delete_element(uow, Some(&principal), id))
            .await?;
        info!(element = %id, "deleted element");
        Ok(())
    }

    pub async fn get_element(&self, id: ElementId) -> CoreResult<Element> {
        self.store
            .transact(move |uow| coordinator::load_element(uow, id))
            .await?
            .ok_or_else(|| CoreError::not_found(format!("element {id}")))
    }

    pub async fn list_elements(&self, filter: ElementFilter) -> CoreResult<Vec<Element>> {
        self.store
            .transact(move |uow| coordinator::list_elements(uow, &filter))
            .await
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub async fn get_tag(&self, name: &str) -> CoreResult<Tag> {
        let name = name.to_string();
        self.store
            .transact(move |uow| {
                uow.find_tag(&name)?
                    .ok_or_else(|| CoreError::not_found(format!("tag '{name}'")))
            })
            .await
    }

    pub async fn list_tags(&self) -> CoreResult<Vec<Tag>> {
        self.store.transact(|uow| uow.list_tags()).await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a new account. Open to anyone.
    pub async fn create_user(&self, request: UserCreate) -> CoreResult<User> {
        self.insert_user(request, false).await
    }

    /// Register an account with the admin capability. Operator use only.
    pub async fn create_admin(&self, request: UserCreate) -> CoreResult<User> {
        self.insert_user(request, true).await
    }

    async fn insert_user(&self, request: UserCreate, is_admin: bool) -> CoreResult<User> {
        request.validate()?;
        let password_hash = self.hash_password(request.password).await?;
        let username = request.username;
        let user = self
            .store
            .transact(move |uow| {
                let id = uow.insert_user(&NewUser {
                    username,
                    password_hash,
                    is_admin,
                    created_at: Utc::now(),
                })?;
                uow.user(id)?
                    .ok_or_else(|| CoreError::storage(format!("user {id} vanished after insert")))
            })
            .await?;
        info!(user = %user.id, username = %user.username, is_admin, "created user");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        principal: Option<&Principal>,
        id: UserId,
        update: UserUpdate,
    ) -> CoreResult<User> {
        self.policy.require_user_access(principal, id)?;
        update.validate()?;

        let password_hash = match update.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };
        let username = update.username;

        self.store
            .transact(move |uow| {
                let mut user = uow
                    .user(id)?
                    .ok_or_else(|| CoreError::not_found(format!("user {id}")))?;
                if let Some(username) = username {
                    user.username = username;
                }
                if let Some(hash) = password_hash {
                    user.password_hash = hash;
                }
                uow.save_user(&user)?;
                Ok(user)
            })
            .await
    }

    pub async fn get_user(&self, principal: Option<&Principal>, id: UserId) -> CoreResult<User> {
        self.policy.require_user_access(principal, id)?;
        self.store
            .transact(move |uow| uow.user(id))
            .await?
            .ok_or_else(|| CoreError::not_found(format!("user {id}")))
    }

    /// Every user for admins, only the caller's own record otherwise
    pub async fn list_users(&self, principal: Option<&Principal>) -> CoreResult<Vec<User>> {
        let principal = principal
            .ok_or_else(|| CoreError::Unauthenticated("listing users requires authentication".into()))?
            .clone();
        self.store
            .transact(move |uow| {
                if principal.is_admin {
                    uow.list_users()
                } else {
                    Ok(uow.user(principal.user_id)?.into_iter().collect())
                }
            })
            .await
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Exchange a username and password for the user's bearer key
    pub async fn login(&self, username: &str, password: &str) -> CoreResult<String> {
        let lookup = username.to_string();
        let user = self
            .store
            .transact(move |uow| uow.user_by_username(&lookup))
            .await?;

        let rejected = || CoreError::validation("unable to log in with provided credentials");
        let Some(user) = user else {
            debug!(%username, "login for unknown user");
            return Err(rejected());
        };

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| CoreError::Credentials(e.to_string()))??;
        if !verified {
            debug!(user = %user.id, "login with wrong password");
            return Err(rejected());
        }

        let user_id = user.id;
        self.store
            .transact(move |uow| {
                if let Some(key) = uow.token_for_user(user_id)? {
                    return Ok(key);
                }
                let key = Uuid::new_v4().simple().to_string();
                uow.insert_token(&key, user_id, Utc::now())?;
                Ok(key)
            })
            .await
    }

    /// Resolve a bearer key; unknown keys yield `None`
    pub async fn authenticate(&self, key: &str) -> CoreResult<Option<Principal>> {
        let key = key.to_string();
        let user = self
            .store
            .transact(move |uow| uow.user_for_token(&key))
            .await?;
        Ok(user.map(|u| u.principal()))
    }

    /// The user behind a bearer key, or `NotFound`
    pub async fn user_for_token(&self, key: &str) -> CoreResult<User> {
        let key = key.to_string();
        self.store
            .transact(move |uow| uow.user_for_token(&key))
            .await?
            .ok_or_else(|| CoreError::not_found("no user for this token"))
    }

    async fn hash_password(&self, password: String) -> CoreResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| CoreError::Credentials(e.to_string()))?
    }
}
