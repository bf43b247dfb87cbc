//! Accounts, password hashing and bearer tokens.

pub mod password;
pub mod service;
pub mod tokens;

pub use service::{AuthService, RegisterRequest, TokenPair};
pub use tokens::{Claims, TokenService, TokenType};

use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("User account is inactive")]
    InactiveUser,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { message, .. } => AuthError::Conflict(message),
            other => AuthError::Repository(other),
        }
    }
}
