//! Password hashing with Argon2id at the crate's default cost.
//!
//! Hashes are stored in PHC string form, so the salt and parameters travel
//! with the hash and verification needs nothing else.

use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password")]
    Hash,
}

/// Hash a plaintext password into a PHC string.
///
/// # Errors
/// Returns [`PasswordError::Hash`] if Argon2 cannot produce a hash.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::Hash)
}

/// Check `plaintext` against a stored PHC hash.
///
/// A stored value that is not a valid PHC string is reported as a mismatch.
#[must_use]
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one verification against a throwaway hash so unknown emails take as
/// long to reject as wrong passwords.
pub fn verify_against_dummy(plaintext: &str) {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| hash_password("afridauth-dummy").unwrap_or_default());
    let _ = verify_password(plaintext, hash);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() -> Result<(), PasswordError> {
        let hash = hash_password("secret123")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
        assert!(!verify_password("", &hash));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<(), PasswordError> {
        let first = hash_password("secret123")?;
        let second = hash_password("secret123")?;
        assert_ne!(first, second);
        assert!(verify_password("secret123", &second));
        Ok(())
    }

    #[test]
    fn hash_never_contains_plaintext() -> Result<(), PasswordError> {
        let hash = hash_password("correct horse battery staple")?;
        assert!(!hash.contains("correct horse"));
        Ok(())
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("secret123", ""));
        assert!(!verify_password("secret123", "secret123"));
        assert!(!verify_password("secret123", "$argon2id$broken"));
    }

    #[test]
    fn dummy_verification_does_not_panic() {
        verify_against_dummy("whatever");
        verify_against_dummy("whatever");
    }
}
