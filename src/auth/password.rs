//! Password hashing with Argon2id.
//!
//! Passwords are never stored in plain text; the `users.password` column
//! holds a PHC string that embeds the salt and parameters.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

use crate::FoundationError;

/// Hashing errors.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    HashFailed(String),

    #[error("invalid password hash format")]
    InvalidHash,

    /// Wrong password.
    #[error("password verification failed")]
    VerificationFailed,
}

impl From<HashError> for FoundationError {
    fn from(e: HashError) -> Self {
        match e {
            HashError::VerificationFailed => FoundationError::Auth(e.to_string()),
            _ => FoundationError::Database(e.to_string()),
        }
    }
}

/// Argon2id with 19 MiB memory, 2 iterations, 1 lane.
fn create_argon2() -> Result<Argon2<'static>, HashError> {
    let params =
        Params::new(19 * 1024, 2, 1, None).map_err(|e| HashError::HashFailed(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password, returning a PHC string.
///
/// Callers validate the password's content before hashing.
///
/// # Examples
///
/// ```
/// use foundation::auth::hash_password;
///
/// let hash = hash_password("Aa!15678").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = create_argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| HashError::HashFailed(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), HashError> {
    let parsed = PasswordHash::new(hash).map_err(|_| HashError::InvalidHash)?;
    // Parameters come from the parsed hash.
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| HashError::VerificationFailed)
}
