//! Registration, login, token rotation and revocation.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use super::tokens::{Claims, TokenService, TokenType};
use super::AuthError;
use crate::api::UserId;
use crate::db::FullRepository;
use crate::models::user::{normalize_email, NewUser, User, UserProfile};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

pub struct AuthService {
    repo: Arc<dyn FullRepository>,
    tokens: TokenService,
    bcrypt_cost: u32,
    /// Revoked jti -> expiry timestamp. Entries are pruned once expired.
    revoked: RwLock<HashMap<String, i64>>,
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::Validation(format!("Invalid email address: {email}"));
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AuthError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(AuthError::Validation(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

impl AuthService {
    pub fn new(repo: Arc<dyn FullRepository>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            tokens,
            bcrypt_cost,
            revoked: RwLock::new(HashMap::new()),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account and log it in.
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<(UserProfile, TokenPair), AuthError> {
        let email = normalize_email(&request.email);
        let username = request.username.trim().to_string();
        validate_email(&email)?;
        validate_username(&username)?;
        if request.password.chars().count() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = self
            .repo
            .insert_user(NewUser {
                email,
                username,
                password_hash,
                display_name: request.display_name.filter(|d| !d.trim().is_empty()),
            })
            .await?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        let pair = self.issue_pair(&user)?;
        Ok((UserProfile::from(&user), pair))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        self.repo.touch_last_login(user.id, Utc::now()).await?;
        info!(user_id = %user.id, "User logged in");
        self.issue_pair(&user)
    }

    /// Exchange a refresh token for a new pair. The old refresh token is
    /// revoked before the user lookup, so a token is redeemed at most once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.decode(refresh_token, TokenType::Refresh)?;
        if !self.revoke(&claims) {
            return Err(AuthError::TokenRevoked);
        }
        let user = self.active_user(claims.user_id).await?;
        self.issue_pair(&user)
    }

    /// Revoke the presented access token and, when given, a refresh token.
    pub fn logout(&self, access: &Claims, refresh_token: Option<&str>) {
        self.revoke(access);
        if let Some(token) = refresh_token {
            if let Ok(claims) = self.tokens.decode(token, TokenType::Refresh) {
                if claims.user_id == access.user_id {
                    self.revoke(&claims);
                }
            }
        }
        info!(user_id = %access.user_id, "User logged out");
    }

    /// Resolve an access token to an active user.
    pub async fn authenticate(&self, access_token: &str) -> Result<(User, Claims), AuthError> {
        let claims = self.tokens.decode(access_token, TokenType::Access)?;
        self.ensure_not_revoked(&claims)?;
        let user = self.active_user(claims.user_id).await?;
        Ok((user, claims))
    }

    pub async fn current_user(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        let user = self.repo.get_user(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    async fn active_user(&self, user_id: UserId) -> Result<User, AuthError> {
        let user = self.repo.get_user(user_id).await.map_err(|e| {
            if e.is_not_found() {
                AuthError::InvalidToken("unknown user".to_string())
            } else {
                AuthError::from(e)
            }
        })?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let (access_token, _) = self.tokens.issue(user.id, &user.email, TokenType::Access)?;
        let (refresh_token, _) = self.tokens.issue(user.id, &user.email, TokenType::Refresh)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.tokens.access_ttl().num_seconds(),
        })
    }

    /// Returns `false` when the token was already revoked.
    fn revoke(&self, claims: &Claims) -> bool {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti.clone(), claims.exp).is_none()
    }

    fn ensure_not_revoked(&self, claims: &Claims) -> Result<(), AuthError> {
        if self.revoked.read().contains_key(&claims.jti) {
            return Err(AuthError::TokenRevoked);
        }
        Ok(())
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalRepository;
    use chrono::Duration;

    fn service() -> AuthService {
        let tokens = TokenService::new("test-secret", Duration::minutes(5), Duration::days(1));
        AuthService::new(Arc::new(LocalRepository::new()), tokens, 4)
    }

    async fn registered(auth: &AuthService) -> TokenPair {
        let (_, pair) = auth
            .register(RegisterRequest {
                email: "cat@purr.test".to_string(),
                username: "catcarer".to_string(),
                password: "whiskers123".to_string(),
                display_name: None,
            })
            .await
            .unwrap();
        pair
    }

    #[tokio::test]
    async fn test_concurrent_refresh_redeems_token_once() {
        let auth = service();
        let pair = registered(&auth).await;
        let (a, b) = tokio::join!(
            auth.refresh(&pair.refresh_token),
            auth.refresh(&pair.refresh_token)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let failed = if a.is_err() { a } else { b };
        assert!(matches!(failed, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_token() {
        let auth = service();
        let pair = registered(&auth).await;
        let (_, claims) = auth.authenticate(&pair.access_token).await.unwrap();
        auth.logout(&claims, Some(&pair.refresh_token));
        assert!(matches!(
            auth.refresh(&pair.refresh_token).await,
            Err(AuthError::TokenRevoked)
        ));
        assert!(matches!(
            auth.authenticate(&pair.access_token).await,
            Err(AuthError::TokenRevoked)
        ));
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("cat@purr.test").is_ok());
        for bad in ["", "cat", "@purr.test", "cat@", "cat@purr", "c at@purr.test", "a@b@c.d", "cat@.test"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("catcarer123").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("bad name").is_err());
    }
}
