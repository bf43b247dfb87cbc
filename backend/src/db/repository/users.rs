//! User account storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryResult;
use crate::api::UserId;
use crate::models::user::{NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the email or username is taken
    async fn insert_user(&self, user: NewUser) -> RepositoryResult<User>;

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User>;

    /// Look up by email. Matching is case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    async fn touch_last_login(&self, user_id: UserId, at: DateTime<Utc>) -> RepositoryResult<()>;
}
