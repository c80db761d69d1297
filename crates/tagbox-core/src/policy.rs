//! Access policy
//!
//! Reads are open. Writes need an authenticated principal; element writes
//! additionally pass the ownership rule in [`Ownership::authorize`], which is
//! applied inside the update transaction. Whether anonymous callers may
//! create elements is a deployment setting.

use crate::error::{CoreError, CoreResult};
use crate::model::{Ownership, Principal, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Let unauthenticated callers create unowned elements
    #[serde(default)]
    pub allow_anonymous_create: bool,
}

impl AccessPolicy {
    /// Ownership for a new element created by `principal`
    pub fn creation_ownership(&self, principal: Option<&Principal>) -> CoreResult<Ownership> {
        match principal {
            Some(p) => Ok(Ownership::Owned(p.user_id)),
            None if self.allow_anonymous_create => Ok(Ownership::Unowned),
            None => Err(CoreError::Unauthenticated(
                "creating elements requires authentication".to_string(),
            )),
        }
    }

    /// Updates and deletes always need a principal
    pub fn require_writer<'a>(&self, principal: Option<&'a Principal>) -> CoreResult<&'a Principal> {
        principal.ok_or_else(|| {
            CoreError::Unauthenticated("modifying elements requires authentication".to_string())
        })
    }

    /// A principal may manage its own record; admins may manage any
    pub fn require_user_access<'a>(
        &self,
        principal: Option<&'a Principal>,
        target: UserId,
    ) -> CoreResult<&'a Principal> {
        let principal = principal.ok_or_else(|| {
            CoreError::Unauthenticated("user records require authentication".to_string())
        })?;
        if principal.may_manage_user(target) {
            Ok(principal)
        } else {
            Err(CoreError::Unauthorized(format!(
                "user {} may not manage user {target}",
                principal.username
            )))
        }
    }
}
