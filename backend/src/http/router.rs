//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::state::AppState;
use super::{handlers, sse, ws};
use crate::config::ServerSettings;

/// CORS policy from the configured origins. `*` allows any origin.
pub fn cors_layer(server: &ServerSettings) -> CorsLayer {
    if server.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server);
    let body_limit = state.settings.server.body_limit_bytes;

    let auth = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me));

    let pets = Router::new()
        .route("/pets", get(handlers::list_pets).post(handlers::create_pet))
        .route("/pets/{pet_id}", get(handlers::get_pet))
        // Care and shop
        .route("/pets/{pet_id}/feed", post(handlers::feed_pet))
        .route("/pets/{pet_id}/interact", post(handlers::interact_with_pet))
        .route("/pets/{pet_id}/items/{item_id}/purchase", post(handlers::purchase_item))
        .route("/pets/{pet_id}/items/{item_id}/use", post(handlers::use_item))
        .route("/pets/{pet_id}/inventory", get(handlers::inventory))
        // Sharing
        .route("/pets/{pet_id}/invite", post(handlers::invite))
        .route("/pets/{pet_id}/invitations", get(handlers::list_invitations))
        .route("/pets/{pet_id}/owners/{user_id}", delete(handlers::remove_owner))
        .route("/pets/{pet_id}/leave", post(handlers::leave_pet))
        // Ledgers
        .route("/pets/{pet_id}/metrics/history", get(handlers::metrics_history))
        .route("/pets/{pet_id}/transactions", get(handlers::transactions))
        .route("/pets/{pet_id}/activity", get(handlers::activity))
        // Tasks
        .route("/pets/{pet_id}/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route("/pets/{pet_id}/tasks/{task_id}/complete", post(handlers::complete_task))
        .route("/pets/{pet_id}/tasks/{task_id}/assign", post(handlers::assign_task))
        .route("/pets/{pet_id}/tasks/{task_id}/cancel", post(handlers::cancel_task))
        // Chat and live updates
        .route(
            "/pets/{pet_id}/messages",
            get(handlers::list_messages).post(handlers::post_message),
        )
        .route("/pets/{pet_id}/events", get(sse::pet_events));

    let api_v1 = Router::new()
        .route("/status", get(handlers::api_status))
        .nest("/auth", auth)
        .merge(pets)
        .route("/invitations/{token}/accept", post(handlers::accept_invitation))
        .route("/invitations/{token}/decline", post(handlers::decline_invitation))
        .route("/items", get(handlers::list_items))
        .route("/achievements", get(handlers::list_achievements))
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/{id}/read", post(handlers::mark_notification_read))
        .route("/ws", get(ws::websocket));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_v1)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::db::{FullRepository, LocalRepository};
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn FullRepository>;
        let state = AppState::new(repo, Settings::default());
        let _router = create_router(state);
    }

    #[test]
    fn test_cors_from_wildcard_and_list() {
        let mut server = ServerSettings::default();
        let _listed = cors_layer(&server);
        server.cors_origins = vec!["*".to_string()];
        let _any = cors_layer(&server);
    }
}
