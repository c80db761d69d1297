//! Domain records
//!
//! These are the internal, fully-populated records. What callers send and
//! receive lives in [`crate::transfer`].

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted tag name, in characters
pub const MAX_TAG_NAME_CHARS: usize = 255;
/// Longest accepted element title, in characters
pub const MAX_TITLE_CHARS: usize = 500;
/// Longest accepted element description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;
/// Longest accepted username, in characters
pub const MAX_USERNAME_CHARS: usize = 150;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Storage key of an element
    ElementId
);
id_type!(
    /// Storage key of a tag
    TagId
);
id_type!(
    /// Storage key of a user
    UserId
);

// ============================================================================
// Tags
// ============================================================================

/// A validated tag name: non-blank and at most [`MAX_TAG_NAME_CHARS`] long
///
/// Names are compared exactly, so `Rust` and `rust` are different tags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    /// Validate a raw tag name
    pub fn parse(raw: impl Into<String>) -> CoreResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::validation("tag name must not be empty"));
        }
        if raw.chars().count() > MAX_TAG_NAME_CHARS {
            return Err(CoreError::validation(format!(
                "tag name must be at most {MAX_TAG_NAME_CHARS} characters"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A registered tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Association between an element and a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagging {
    pub element_id: ElementId,
    pub tag_id: TagId,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Elements
// ============================================================================

/// Who owns an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    Owned(UserId),
    /// Created anonymously; anyone may modify it
    Unowned,
}

impl Ownership {
    pub fn from_owner(owner: Option<UserId>) -> Self {
        owner.map_or(Self::Unowned, Self::Owned)
    }

    pub fn owner(&self) -> Option<UserId> {
        match self {
            Self::Owned(id) => Some(*id),
            Self::Unowned => None,
        }
    }

    /// Check whether `principal` may mutate something with this ownership.
    pub fn authorize(&self, principal: Option<&Principal>) -> CoreResult<()> {
        match (self, principal) {
            (Self::Unowned, _) => Ok(()),
            (Self::Owned(owner), Some(p)) if p.user_id == *owner => Ok(()),
            (Self::Owned(_), Some(p)) => Err(CoreError::Unauthorized(format!(
                "user {} does not own this element",
                p.username
            ))),
            (Self::Owned(_), None) => Err(CoreError::Unauthenticated(
                "this element has an owner".to_string(),
            )),
        }
    }
}

/// An element row without its tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRecord {
    pub id: ElementId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ownership: Ownership,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a row about to be inserted
#[derive(Debug, Clone)]
pub struct NewElement {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ownership: Ownership,
    pub created_at: DateTime<Utc>,
}

/// An element together with its tag set, ordered by tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: ElementId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ownership: Ownership,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Element {
    pub fn from_record(record: ElementRecord, tags: Vec<Tag>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            ownership: record.ownership,
            tags,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

// ============================================================================
// Users
// ============================================================================

/// A user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// PHC-format hash produced by the credential collaborator
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Values for a user row about to be inserted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated actor behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl Principal {
    /// Whether this principal may read or modify the user record `id`
    pub fn may_manage_user(&self, id: UserId) -> bool {
        self.is_admin || self.user_id == id
    }
}

pub(crate) fn validate_username(username: &str) -> CoreResult<()> {
    if username.trim().is_empty() {
        return Err(CoreError::validation("username must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(CoreError::validation(format!(
            "username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    Ok(())
}
