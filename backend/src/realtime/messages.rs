//! Wire format of the realtime channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PetId;

/// Event kinds pushed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Connect,
    Disconnect,
    Heartbeat,
    PetMetricsUpdate,
    PetStateChange,
    PetFeed,
    PetPlay,
    PetInteraction,
    PetCreated,
    TaskCreated,
    TaskCompleted,
    TaskAssigned,
    TaskCancelled,
    UserJoined,
    UserLeft,
    UserOnline,
    OwnerAdded,
    OwnerRemoved,
    CurrencyUpdate,
    Transaction,
    Notification,
    Alert,
    Message,
    Error,
}

/// Server to client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<PetId>,
    /// Committed pet version this event reflects, when it concerns a pet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ServerEvent {
    pub fn new(kind: MessageType, data: serde_json::Value) -> Self {
        Self {
            kind,
            pet_id: None,
            version: None,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn for_pet(kind: MessageType, pet_id: PetId, version: u64, data: serde_json::Value) -> Self {
        Self {
            kind,
            pet_id: Some(pet_id),
            version: Some(version),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            MessageType::Error,
            serde_json::json!({ "message": message.into() }),
        )
    }

    pub fn to_json(&self) -> String {
        // Serializing a struct of plain data with string keys cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Client to server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Heartbeat,
    JoinPet { pet_id: PetId },
    LeavePet,
    Message { content: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let join: ClientMessage = serde_json::from_str(r#"{"type":"join_pet","pet_id":4}"#).unwrap();
        assert_eq!(join, ClientMessage::JoinPet { pet_id: PetId::new(4) });
        let hb: ClientMessage = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(hb, ClientMessage::Heartbeat);
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_server_event_shape() {
        let event = ServerEvent::for_pet(
            MessageType::PetMetricsUpdate,
            PetId::new(2),
            7,
            serde_json::json!({"happiness": 50.0}),
        );
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value["type"], "pet_metrics_update");
        assert_eq!(value["pet_id"], 2);
        assert_eq!(value["version"], 7);

        let plain = serde_json::to_value(ServerEvent::new(MessageType::Heartbeat, serde_json::Value::Null)).unwrap();
        assert!(plain.get("pet_id").is_none());
    }
}
