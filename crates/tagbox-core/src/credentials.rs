//! Credential collaborator
//!
//! The core never looks at passwords itself; it hands them to a
//! [`CredentialHasher`] and stores the opaque result.

use crate::error::{CoreError, CoreResult};
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

/// Hashes and verifies passwords
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> CoreResult<String>;

    /// Whether `password` matches `stored`. A malformed `stored` hash is an
    /// error, a wrong password is `Ok(false)`.
    fn verify(&self, password: &str, stored: &str) -> CoreResult<bool>;
}

/// Cost parameters for argon2id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// argon2id hasher producing PHC strings
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: Argon2Params) -> CoreResult<Self> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|err| CoreError::Credentials(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> CoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| CoreError::Credentials(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, stored: &str) -> CoreResult<bool> {
        let parsed =
            PasswordHash::new(stored).map_err(|err| CoreError::Credentials(err.to_string()))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::new(cheap_params()).unwrap();
        let hash = hasher.hash("Qwerty1234!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Qwerty1234!", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Argon2Hasher::new(cheap_params()).unwrap();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = Argon2Hasher::new(cheap_params()).unwrap();
        assert!(matches!(
            hasher.verify("pw", "not-a-phc-string"),
            Err(CoreError::Credentials(_))
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = Argon2Params {
            memory_kib: 8,
            iterations: 0,
            parallelism: 1,
        };
        assert!(Argon2Hasher::new(params).is_err());
    }
}
