//! Co-ownership invitations, notifications, pet chat and achievement unlocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{InvitationId, MessageId, NotificationId, PetId, UserId};
use crate::models::pet::OwnerRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub pet_id: PetId,
    pub inviter_id: UserId,
    pub invitee_email: String,
    pub role: OwnerRole,
    pub message: Option<String>,
    pub status: InvitationStatus,
    /// SHA-256 hex digest of the invitation token; the token itself is never stored.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub pet_id: PetId,
    pub inviter_id: UserId,
    pub invitee_email: String,
    pub role: OwnerRole,
    pub message: Option<String>,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PetHungry,
    PetSad,
    PetSick,
    TaskAssigned,
    TaskCompleted,
    TaskReminder,
    CurrencyEarned,
    AchievementUnlocked,
    InviteReceived,
    Mention,
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub pet_id: Option<PetId>,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub pet_id: Option<PetId>,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub pet_id: PetId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub user_id: UserId,
    pub achievement_id: i64,
    pub pet_id: Option<PetId>,
    pub unlocked_at: DateTime<Utc>,
}
