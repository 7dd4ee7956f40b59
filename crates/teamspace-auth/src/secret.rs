//! Random secrets and token fingerprints

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

/// Length of a password-reset secret in characters.
pub const RESET_SECRET_LEN: usize = 64;

/// Generate a password-reset secret: 64 alphanumeric characters drawn from the
/// operating system RNG (~381 bits of entropy).
pub fn generate_reset_secret() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(RESET_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of an issued bearer token.
///
/// Session rows store this instead of the token itself.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
