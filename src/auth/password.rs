use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 64 * 1024; // 64KB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

/// Hashes and verifies user secrets with Argon2id.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hashes a secret into a PHC string with a random salt
    pub fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash secret: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a secret against a stored PHC hash
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify secret: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_correct_secret() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("hunter2").unwrap();

        assert!(hasher.verify("hunter2", &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_secret() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("hunter2").unwrap();

        assert!(!hasher.verify("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_hash_is_phc_format() {
        let hasher = PasswordHasher::new();
        assert!(hasher.hash("secret").unwrap().starts_with("$argon2id$"));
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = PasswordHasher::new();
        assert!(hasher.verify("secret", "not-a-phc-string").is_err());
    }
}
