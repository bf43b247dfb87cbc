//! WebSocket endpoint for interactive co-owner sessions.
//!
//! `GET /api/v1/ws?token=<access jwt>&pet_id=<optional>`. The token is checked
//! before the upgrade. Server events are forwarded from the hub queue; client
//! frames are parsed as [`ClientMessage`].

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::AppError;
use super::state::AppState;
use crate::api::{PetId, UserId};
use crate::realtime::{ClientMessage, ServerEvent};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
    #[serde(default)]
    pub pet_id: Option<i64>,
}

/// GET /api/v1/ws
pub async fn websocket(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let (user, _) = state.auth.authenticate(&query.token).await?;
    let pet_id = query.pet_id.map(PetId::new);
    if let Some(pet_id) = pet_id {
        if !state.engine.is_member(user.id, pet_id).await? {
            return Err(AppError::NotFound("Pet not found".to_string()));
        }
    }
    Ok(upgrade.on_upgrade(move |socket| run_session(state, socket, user.id, pet_id)))
}

/// Join a room and send the current snapshot. Returns false when the user
/// may not see the pet.
async fn join(state: &AppState, client_id: &str, user_id: UserId, pet_id: PetId) -> bool {
    match state.engine.join_pet_room(client_id, user_id, pet_id).await {
        Ok(()) => true,
        Err(e) => {
            debug!(client_id = %client_id, pet_id = %pet_id, error = %e, "Join refused");
            false
        }
    }
}

async fn run_session(state: AppState, socket: WebSocket, user_id: UserId, pet_id: Option<PetId>) {
    let (client_id, mut outbound) = state.hub.connect(user_id, false);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            if sink.send(Message::Text(event.to_json().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    if let Some(pet_id) = pet_id {
        join(&state, &client_id, user_id, pet_id).await;
    }

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "WebSocket read failed");
                break;
            }
        };
        let message = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                state
                    .hub
                    .send_to_client(&client_id, ServerEvent::error(format!("Invalid message: {e}")));
                continue;
            }
        };
        match message {
            ClientMessage::Heartbeat => {
                state.hub.heartbeat(&client_id);
            }
            ClientMessage::JoinPet { pet_id } => {
                if !join(&state, &client_id, user_id, pet_id).await {
                    state
                        .hub
                        .send_to_client(&client_id, ServerEvent::error("Pet not found"));
                }
            }
            ClientMessage::LeavePet => {
                state.hub.leave_room(&client_id);
            }
            ClientMessage::Message { content } => {
                let Some(room) = state.hub.room_of(&client_id) else {
                    state
                        .hub
                        .send_to_client(&client_id, ServerEvent::error("Join a pet before chatting"));
                    continue;
                };
                if let Err(e) = state.engine.post_message(user_id, room, &content).await {
                    warn!(client_id = %client_id, error = %e, "Chat message rejected");
                    state.hub.send_to_client(&client_id, ServerEvent::error(e.to_string()));
                }
            }
        }
    }

    state.hub.disconnect(&client_id);
    writer.abort();
}
