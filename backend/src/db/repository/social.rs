//! Invitations, notifications, chat and achievement unlocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryResult;
use crate::api::{NotificationId, PetId, UserId};
use crate::models::social::{
    AchievementUnlock, ChatMessage, Invitation, NewInvitation, NewNotification, Notification,
};

#[async_trait]
pub trait SocialRepository: Send + Sync {
    async fn insert_invitation(&self, invitation: NewInvitation) -> RepositoryResult<Invitation>;

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> RepositoryResult<Option<Invitation>>;

    /// Overwrite an existing invitation (status changes).
    async fn update_invitation(&self, invitation: &Invitation) -> RepositoryResult<()>;

    async fn list_invitations_for_pet(&self, pet_id: PetId) -> RepositoryResult<Vec<Invitation>>;

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> RepositoryResult<Notification>;

    /// Newest first.
    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: usize,
    ) -> RepositoryResult<Vec<Notification>>;

    /// Mark one notification read. Notifications of other users are reported
    /// as not found.
    async fn mark_notification_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Notification>;

    async fn insert_message(
        &self,
        pet_id: PetId,
        user_id: UserId,
        content: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<ChatMessage>;

    /// The latest `limit` messages, oldest first.
    async fn list_messages(&self, pet_id: PetId, limit: usize)
        -> RepositoryResult<Vec<ChatMessage>>;

    /// Record an unlock. Returns `false` when the user already had it.
    async fn record_unlock(&self, unlock: AchievementUnlock) -> RepositoryResult<bool>;

    /// Forget an unlock so it can be earned again. Used when the reward for
    /// a fresh unlock could not be paid.
    async fn release_unlock(&self, user_id: UserId, achievement_id: i64) -> RepositoryResult<()>;

    async fn list_unlocks(&self, user_id: UserId) -> RepositoryResult<Vec<AchievementUnlock>>;
}
