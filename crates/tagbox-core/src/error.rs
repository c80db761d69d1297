//! Error taxonomy for tagbox operations
//!
//! Every operation classifies its failure into one of these variants; the
//! transport layer maps each variant to a stable status code.

use thiserror::Error;

/// Error type shared by every core operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A referenced element, tag or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller is authenticated but not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The operation requires an authenticated principal and none was given
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// The payload is malformed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The credential collaborator failed to hash or verify a password
    #[error("Credential error: {0}")]
    Credentials(String),

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Short, stable identifier for the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Validation(_) => "validation",
            Self::Credentials(_) => "credentials",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(CoreError::not_found("element 1").kind(), "not_found");
        assert_eq!(CoreError::validation("empty").kind(), "validation");
        assert_eq!(
            CoreError::Unauthorized("not owner".into()).kind(),
            "unauthorized"
        );
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::not_found("element 7");
        assert_eq!(err.to_string(), "Not found: element 7");
    }
}
