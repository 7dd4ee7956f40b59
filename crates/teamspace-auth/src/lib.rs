//! Credentials, session tokens and reset secrets for teamspace

pub mod jwt;
pub mod password;
pub mod secret;

pub use jwt::{JwtClaims, JwtError, JwtValidator, SESSION_AUDIENCE, SESSION_TOKEN_TYPE};
pub use password::{hash_password, verify_dummy_password, verify_password, PasswordError};
pub use secret::{fingerprint, generate_reset_secret, RESET_SECRET_LEN};
