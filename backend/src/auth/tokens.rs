//! HS256 access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::api::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub user_id: UserId,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Unique id used for revocation.
    pub jti: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue(
        &self,
        user_id: UserId,
        email: &str,
        token_type: TokenType,
    ) -> Result<(String, Claims), AuthError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(user_id, email, token_type, ttl)
    }

    pub(crate) fn issue_with_ttl(
        &self,
        user_id: UserId,
        email: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
            jti: Uuid::new_v4().simple().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok((token, claims))
    }

    /// Validate signature and expiry, and check the token is of `expected` type.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        if data.claims.token_type != expected {
            return Err(AuthError::InvalidToken(format!(
                "expected {:?} token",
                expected
            )));
        }
        Ok(data.claims)
    }
}
