//! bcrypt password hashing.
//!
//! Hashing is CPU bound, so both operations run on the blocking pool.

use super::AuthError;

/// Lowest cost bcrypt accepts; used by tests.
pub const MIN_COST: u32 = 4;

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Malformed hashes verify as `false`.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))
}
