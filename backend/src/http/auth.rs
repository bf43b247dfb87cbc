//! Bearer-token extractor.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use super::error::AppError;
use super::state::AppState;
use crate::api::UserId;
use crate::auth::Claims;
use crate::models::user::User;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
        let token = bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))?;
        let (user, claims) = state.auth.authenticate(token).await?;
        Ok(Self { user, claims })
    }
}
