//! Per-pet chat between co-owners.

use chrono::Utc;

use super::engine::{EngineError, EngineResult, PetEngine};
use super::ledger::DEFAULT_PAGE_SIZE;
use crate::api::{PetId, UserId};
use crate::models::social::ChatMessage;
use crate::realtime::{MessageType, ServerEvent};

pub const MAX_MESSAGE_CHARS: usize = 1000;

impl PetEngine {
    pub async fn post_message(
        &self,
        user_id: UserId,
        pet_id: PetId,
        content: &str,
    ) -> EngineResult<ChatMessage> {
        let content = content.trim();
        if content.is_empty() || content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(EngineError::Validation(format!(
                "Message must be between 1 and {MAX_MESSAGE_CHARS} characters"
            )));
        }
        let pet = self.load_for_member(pet_id, user_id).await?;
        let message = self
            .repo
            .insert_message(pet_id, user_id, content.to_string(), Utc::now())
            .await?;
        self.hub.broadcast_to_pet(
            pet_id,
            ServerEvent::for_pet(MessageType::Message, pet_id, pet.version, serde_json::json!(message)),
            &[],
        );
        Ok(message)
    }

    /// Latest messages, oldest first.
    pub async fn list_messages(
        &self,
        user_id: UserId,
        pet_id: PetId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<ChatMessage>> {
        self.load_for_member(pet_id, user_id).await?;
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 200);
        Ok(self.repo.list_messages(pet_id, limit).await?)
    }
}
