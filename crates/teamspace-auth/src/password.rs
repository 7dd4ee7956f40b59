//! Argon2id hashing for account passwords and password-reset secrets
//!
//! Both user passwords and reset secrets are stored only as PHC strings
//! produced here. Verification goes through argon2's own comparison, which
//! does not short-circuit on the first differing byte.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use thiserror::Error;

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Error types for credential hashing
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("failed to hash credential: {0}")]
    HashingFailed(String),

    #[error("failed to verify credential: {0}")]
    VerificationFailed(String),

    #[error("stored hash is not a valid PHC string: {0}")]
    InvalidHashFormat(String),
}

/// Hash a plaintext credential with Argon2id and a fresh 16-byte salt.
///
/// Returns the PHC-formatted string (`$argon2id$v=19$m=...`) that goes into
/// `users.password_hash` or `password_reset_tokens.token_hash`.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Check a plaintext credential against a stored PHC hash.
///
/// `Ok(false)` means the credential is wrong; `Err` means the stored hash
/// itself could not be used.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Spend one verification on a throwaway hash.
///
/// Called when there is no stored hash to check against, so that a lookup
/// miss takes as long as a wrong credential.
pub fn verify_dummy_password(plaintext: &str) {
    let hash = DUMMY_HASH.get_or_init(|| hash_password("teamspace-dummy-credential").ok());
    if let Some(hash) = hash {
        let _ = verify_password(plaintext, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = hash_password("secret123").expect("hash");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(!hash.contains("secret123"));
    }

    #[test]
    fn test_verify_accepts_matching_credential() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(verify_password("correct horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_credential() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(!verify_password("battery staple", &hash).unwrap());
        assert!(!verify_password("Correct horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_reports_corrupt_hash() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat(_))));
    }

    #[test]
    fn test_same_input_hashes_differently() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("same", &first).unwrap());
        assert!(verify_password("same", &second).unwrap());
    }

    #[test]
    fn test_reset_secret_round_trip() {
        let secret = crate::generate_reset_secret();
        let hash = hash_password(&secret).unwrap();

        assert!(verify_password(&secret, &hash).unwrap());
        assert!(!verify_password(&crate::generate_reset_secret(), &hash).unwrap());
    }

    #[test]
    fn test_dummy_verification_uses_real_hash() {
        verify_dummy_password("whatever");
        verify_dummy_password("whatever else");

        let hash = DUMMY_HASH.get().and_then(|h| h.as_deref()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("whatever", hash).unwrap());
    }
}
