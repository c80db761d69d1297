//! Token authentication
//!
//! `Authorization: Token <key>` (or `Bearer <key>`) identifies the caller.
//! A missing header, or one using another scheme, means an anonymous
//! request. A malformed or unknown key is always rejected and never
//! downgraded to anonymous.

use crate::state::AppState;
use crate::WebError;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tagbox_core::{CoreError, Principal};
use tracing::debug;

const SCHEMES: [&str; 2] = ["token", "bearer"];

/// The caller's principal, if any credentials were presented
#[derive(Debug, Clone, Default)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };
        let header = header
            .to_str()
            .map_err(|_| invalid("Invalid token header. Token string should not contain invalid characters."))?;

        let Some(key) = token_key(header)? else {
            return Ok(Self(None));
        };

        match state.service.authenticate(key).await? {
            Some(principal) => {
                debug!(user = %principal.user_id, "authenticated request");
                Ok(Self(Some(principal)))
            }
            None => Err(invalid("Invalid token.")),
        }
    }
}

/// Extract the key from an authorization header value.
///
/// `Ok(None)` for schemes this API does not handle.
fn token_key(header: &str) -> Result<Option<&str>, WebError> {
    let mut parts = header.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        (None, _) => Err(invalid("Invalid token header. No credentials provided.")),
        (Some(_), Some(_)) => Err(invalid(
            "Invalid token header. Token string should not contain spaces.",
        )),
    }
}

fn invalid(message: &str) -> WebError {
    WebError::Core(CoreError::Unauthenticated(message.to_string()))
}
