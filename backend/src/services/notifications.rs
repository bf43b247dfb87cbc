//! Stored notifications, pushed live to every connection of the recipient.

use chrono::Utc;
use tracing::debug;

use super::engine::{best_effort, EngineResult, PetEngine};
use crate::api::{NotificationId, PetId, UserId};
use crate::models::social::{NewNotification, Notification, NotificationKind, Priority};
use crate::realtime::{MessageType, ServerEvent};

impl PetEngine {
    /// Store a notification and push it. Critical ones go out as `alert`.
    ///
    /// Failures are logged; a notification never fails the operation that
    /// triggered it.
    pub async fn notify(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: String,
        content: String,
        priority: Priority,
        pet_id: Option<PetId>,
    ) -> Option<Notification> {
        let stored = best_effort(
            self.repo
                .insert_notification(NewNotification {
                    user_id,
                    pet_id,
                    kind,
                    title,
                    content,
                    priority,
                    created_at: Utc::now(),
                })
                .await,
            "notification",
        )?;
        let event_kind = if priority == Priority::Critical {
            MessageType::Alert
        } else {
            MessageType::Notification
        };
        let delivered = self
            .hub
            .send_to_user(user_id, ServerEvent::new(event_kind, serde_json::json!(stored)));
        debug!(user_id = %user_id, delivered, "Notification pushed");
        Some(stored)
    }

    pub async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Notification>> {
        let limit = limit.unwrap_or(50).clamp(1, 200);
        Ok(self.repo.list_notifications(user_id, unread_only, limit).await?)
    }

    pub async fn mark_notification_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
    ) -> EngineResult<Notification> {
        self.repo
            .mark_notification_read(user_id, notification_id, Utc::now())
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    super::engine::EngineError::NotFound("Notification".to_string())
                } else {
                    e.into()
                }
            })
    }
}
