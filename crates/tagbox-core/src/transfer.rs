//! Transfer records
//!
//! Each operation has its own request and response shape instead of one
//! record with read-only and write-only annotations. Requests are validated
//! as a whole before anything is written.

use crate::error::{CoreError, CoreResult};
use crate::model::{
    validate_username, Element, ElementId, Tag, TagName, User, UserId, MAX_DESCRIPTION_CHARS,
    MAX_TITLE_CHARS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One tag instruction inside a create or update payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDirective {
    pub name: String,
    /// Detach instead of attach
    #[serde(default, alias = "to_delete")]
    pub delete: bool,
}

impl TagDirective {
    pub fn attach(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delete: false,
        }
    }

    pub fn detach(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delete: true,
        }
    }
}

/// A validated tag directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOp {
    Attach(TagName),
    Detach(TagName),
}

impl TryFrom<&TagDirective> for TagOp {
    type Error = CoreError;

    fn try_from(directive: &TagDirective) -> CoreResult<Self> {
        let name = TagName::parse(directive.name.clone())?;
        Ok(if directive.delete {
            Self::Detach(name)
        } else {
            Self::Attach(name)
        })
    }
}

/// Payload for creating an element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCreate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagDirective>,
}

impl ElementCreate {
    /// Validate the payload, returning the tag names to attach in order
    pub fn validate(&self) -> CoreResult<Vec<TagName>> {
        validate_title(self.title.as_deref())?;
        validate_description(self.description.as_deref())?;
        self.tags
            .iter()
            .map(|directive| match TagOp::try_from(directive)? {
                TagOp::Attach(name) => Ok(name),
                TagOp::Detach(name) => Err(CoreError::validation(format!(
                    "cannot remove tag '{name}' from an element that is being created"
                ))),
            })
            .collect()
    }
}

/// Partial update of an element
///
/// For `title` and `description`, an absent key leaves the field untouched
/// while an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<TagDirective>>,
}

impl ElementUpdate {
    /// Validate the payload, returning the tag operations in list order
    pub fn validate(&self) -> CoreResult<Vec<TagOp>> {
        if let Some(title) = &self.title {
            validate_title(title.as_deref())?;
        }
        if let Some(description) = &self.description {
            validate_description(description.as_deref())?;
        }
        self.tags
            .iter()
            .flatten()
            .map(TagOp::try_from)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.as_ref().map_or(true, Vec::is_empty)
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_title(title: Option<&str>) -> CoreResult<()> {
    match title {
        Some(t) if t.chars().count() > MAX_TITLE_CHARS => Err(CoreError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        ))),
        _ => Ok(()),
    }
}

fn validate_description(description: Option<&str>) -> CoreResult<()> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_CHARS => {
            Err(CoreError::validation(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )))
        }
        _ => Ok(()),
    }
}

/// Tag as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagView {
    pub name: String,
}

impl From<&Tag> for TagView {
    fn from(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
        }
    }
}

/// Element as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementView {
    pub id: ElementId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner: Option<UserId>,
    pub tags: Vec<TagView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Element> for ElementView {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id,
            title: element.title.clone(),
            description: element.description.clone(),
            owner: element.ownership.owner(),
            tags: element.tags.iter().map(TagView::from).collect(),
            created_at: element.created_at,
            updated_at: element.updated_at,
        }
    }
}

/// Registration payload; the password is never echoed back
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
}

impl UserCreate {
    pub fn validate(&self) -> CoreResult<()> {
        validate_username(&self.username)?;
        validate_password(&self.password)
    }
}

/// Partial update of a user record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

fn validate_password(password: &str) -> CoreResult<()> {
    if password.is_empty() {
        return Err(CoreError::validation("password must not be empty"));
    }
    Ok(())
}

/// User as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}
