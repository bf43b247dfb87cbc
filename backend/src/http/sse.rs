//! Server-Sent Events subscription to a pet room.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use super::auth::AuthUser;
use super::error::AppError;
use super::state::AppState;
use crate::api::PetId;
use crate::realtime::ConnectionManager;

/// Disconnects the passive client when the response stream is dropped.
struct Subscription {
    hub: Arc<ConnectionManager>,
    client_id: String,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.disconnect(&self.client_id);
    }
}

/// GET /api/v1/pets/{pet_id}/events
///
/// Passive subscription: the client receives the same events as WebSocket
/// members of the room and is exempt from the heartbeat sweep.
pub async fn pet_events(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let pet_id = PetId::new(pet_id);
    let (client_id, mut outbound) = state.hub.connect(caller.id(), true);
    let guard = Subscription {
        hub: state.hub.clone(),
        client_id,
    };
    state
        .engine
        .join_pet_room(&guard.client_id, caller.id(), pet_id)
        .await?;

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = outbound.recv().await {
            let kind = serde_json::to_value(event.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "message".to_string());
            yield Ok(Event::default().event(kind).data(event.to_json()));
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.settings.realtime.sse_keep_alive_secs))
            .text("keep-alive"),
    ))
}
