//! HTTP handlers for the REST API.
//!
//! Each handler parses its input, then delegates to the auth service or the
//! pet engine.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

use super::auth::AuthUser;
use super::dto::{
    AssignTaskRequest, AuthResponse, CreatePetRequest, CreateTaskBody, FeedRequest,
    HealthResponse, HistoryQuery, InteractRequest, InviteRequest, LimitQuery, LoginRequest,
    LogoutRequest, MessageRequest, MessageResponse, NotificationQuery, PurchaseRequest,
    RefreshRequest, StatusResponse, TaskQuery, VersionedRequest,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{ItemId, NotificationId, PetId, TaskId, UserId};
use crate::auth::{RegisterRequest, TokenPair};
use crate::models::catalog::{self, ItemDef};
use crate::models::ledger::{ActivityEntry, MetricsSnapshot, Transaction};
use crate::models::pet::PetView;
use crate::models::social::{ChatMessage, Invitation, Notification};
use crate::models::task::Task;
use crate::models::user::UserProfile;
use crate::services::{
    AchievementStatus, CompletionOutcome, FeedOutcome, Interaction, InteractionOutcome,
    InventoryItem, InvitationCreated, PurchaseOutcome, UseOutcome,
};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Parse an optional JSON body; an empty body yields the default.
fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}

// =============================================================================
// Health and status
// =============================================================================

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to Purretys API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api/v1/status",
    }))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository().health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

/// GET /api/v1/status
pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        api_version: "v1",
        status: "operational",
        environment: state.settings.environment.to_string(),
        realtime: state.hub.stats(),
        features: vec![
            "authentication",
            "pet_management",
            "task_system",
            "real_time_sync",
            "currency_system",
            "achievements",
        ],
    })
}

// =============================================================================
// Auth
// =============================================================================

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (user, tokens) = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> HandlerResult<TokenPair> {
    Ok(Json(state.auth.login(&request.email, &request.password).await?))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> HandlerResult<TokenPair> {
    Ok(Json(state.auth.refresh(&request.refresh_token).await?))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Bytes,
) -> HandlerResult<MessageResponse> {
    let request: LogoutRequest = optional_json(&body)?;
    state.auth.logout(&caller.claims, request.refresh_token.as_deref());
    Ok(Json(MessageResponse {
        message: "Successfully logged out".to_string(),
    }))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, caller: AuthUser) -> HandlerResult<UserProfile> {
    Ok(Json(state.auth.current_user(caller.id()).await?))
}

// =============================================================================
// Pets
// =============================================================================

/// POST /api/v1/pets
pub async fn create_pet(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(request): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<PetView>), AppError> {
    let pet = state
        .engine
        .create_pet(caller.id(), &request.name, request.sprite_id, request.color.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(pet)))
}

/// GET /api/v1/pets
pub async fn list_pets(State(state): State<AppState>, caller: AuthUser) -> HandlerResult<Vec<PetView>> {
    Ok(Json(state.engine.list_pets(caller.id()).await?))
}

/// GET /api/v1/pets/{pet_id}
pub async fn get_pet(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
) -> HandlerResult<PetView> {
    Ok(Json(state.engine.get_pet(caller.id(), PetId::new(pet_id)).await?))
}

/// POST /api/v1/pets/{pet_id}/feed
pub async fn feed_pet(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    body: Bytes,
) -> HandlerResult<FeedOutcome> {
    let request: FeedRequest = optional_json(&body)?;
    let outcome = state
        .engine
        .feed(caller.id(), PetId::new(pet_id), &request.food_type, request.expected_version)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/pets/{pet_id}/interact
pub async fn interact_with_pet(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Json(request): Json<InteractRequest>,
) -> HandlerResult<InteractionOutcome> {
    let action: Interaction = request.action.parse()?;
    let outcome = state
        .engine
        .interact(caller.id(), PetId::new(pet_id), action, request.expected_version)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/pets/{pet_id}/items/{item_id}/purchase
pub async fn purchase_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((pet_id, item_id)): Path<(i64, i64)>,
    body: Bytes,
) -> HandlerResult<PurchaseOutcome> {
    let PurchaseRequest {
        quantity,
        expected_version,
    } = optional_json(&body)?;
    let outcome = state
        .engine
        .purchase_item(
            caller.id(),
            PetId::new(pet_id),
            ItemId::new(item_id),
            quantity,
            expected_version,
        )
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/pets/{pet_id}/items/{item_id}/use
pub async fn use_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((pet_id, item_id)): Path<(i64, i64)>,
    body: Bytes,
) -> HandlerResult<UseOutcome> {
    let VersionedRequest { expected_version } = optional_json(&body)?;
    let outcome = state
        .engine
        .use_item(caller.id(), PetId::new(pet_id), ItemId::new(item_id), expected_version)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/pets/{pet_id}/inventory
pub async fn inventory(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
) -> HandlerResult<Vec<InventoryItem>> {
    Ok(Json(state.engine.inventory(caller.id(), PetId::new(pet_id)).await?))
}

// =============================================================================
// Sharing
// =============================================================================

/// POST /api/v1/pets/{pet_id}/invite
pub async fn invite(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InvitationCreated>), AppError> {
    let created = state
        .engine
        .invite(caller.id(), PetId::new(pet_id), &request.email, request.role, request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/pets/{pet_id}/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
) -> HandlerResult<Vec<Invitation>> {
    Ok(Json(
        state.engine.list_invitations(caller.id(), PetId::new(pet_id)).await?,
    ))
}

/// POST /api/v1/invitations/{token}/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(token): Path<String>,
) -> HandlerResult<PetView> {
    Ok(Json(state.engine.accept_invitation(caller.id(), &token).await?))
}

/// POST /api/v1/invitations/{token}/decline
pub async fn decline_invitation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(token): Path<String>,
) -> HandlerResult<Invitation> {
    Ok(Json(state.engine.decline_invitation(caller.id(), &token).await?))
}

/// DELETE /api/v1/pets/{pet_id}/owners/{user_id}
pub async fn remove_owner(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((pet_id, user_id)): Path<(i64, i64)>,
    Query(query): Query<VersionedRequest>,
) -> HandlerResult<PetView> {
    let pet = state
        .engine
        .remove_co_owner(
            caller.id(),
            PetId::new(pet_id),
            UserId::new(user_id),
            query.expected_version,
        )
        .await?;
    Ok(Json(pet))
}

/// POST /api/v1/pets/{pet_id}/leave
pub async fn leave_pet(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
) -> HandlerResult<MessageResponse> {
    state.engine.leave_pet(caller.id(), PetId::new(pet_id)).await?;
    Ok(Json(MessageResponse {
        message: "You left the pet".to_string(),
    }))
}

// =============================================================================
// Ledger reads
// =============================================================================

/// GET /api/v1/pets/{pet_id}/metrics/history?hours=
pub async fn metrics_history(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> HandlerResult<Vec<MetricsSnapshot>> {
    let history = state
        .engine
        .metrics_history(caller.id(), PetId::new(pet_id), query.hours)
        .await?;
    Ok(Json(history))
}

/// GET /api/v1/pets/{pet_id}/transactions
pub async fn transactions(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> HandlerResult<Vec<Transaction>> {
    Ok(Json(
        state
            .engine
            .transactions(caller.id(), PetId::new(pet_id), query.limit)
            .await?,
    ))
}

/// GET /api/v1/pets/{pet_id}/activity
pub async fn activity(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> HandlerResult<Vec<ActivityEntry>> {
    Ok(Json(
        state
            .engine
            .activity(caller.id(), PetId::new(pet_id), query.limit)
            .await?,
    ))
}

// =============================================================================
// Tasks
// =============================================================================

/// POST /api/v1/pets/{pet_id}/tasks
pub async fn create_task(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = state
        .engine
        .create_task(caller.id(), PetId::new(pet_id), body.task, body.expected_version)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/v1/pets/{pet_id}/tasks?status=
pub async fn list_tasks(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Query(query): Query<TaskQuery>,
) -> HandlerResult<Vec<Task>> {
    Ok(Json(
        state
            .engine
            .list_tasks(caller.id(), PetId::new(pet_id), query.status)
            .await?,
    ))
}

/// POST /api/v1/pets/{pet_id}/tasks/{task_id}/complete
pub async fn complete_task(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((pet_id, task_id)): Path<(i64, i64)>,
    body: Bytes,
) -> HandlerResult<CompletionOutcome> {
    let VersionedRequest { expected_version } = optional_json(&body)?;
    let outcome = state
        .engine
        .complete_task(caller.id(), PetId::new(pet_id), TaskId::new(task_id), expected_version)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/pets/{pet_id}/tasks/{task_id}/assign
pub async fn assign_task(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((pet_id, task_id)): Path<(i64, i64)>,
    Json(request): Json<AssignTaskRequest>,
) -> HandlerResult<Task> {
    let task = state
        .engine
        .assign_task(
            caller.id(),
            PetId::new(pet_id),
            TaskId::new(task_id),
            request.assignees,
            request.expected_version,
        )
        .await?;
    Ok(Json(task))
}

/// POST /api/v1/pets/{pet_id}/tasks/{task_id}/cancel
pub async fn cancel_task(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((pet_id, task_id)): Path<(i64, i64)>,
    body: Bytes,
) -> HandlerResult<Task> {
    let VersionedRequest { expected_version } = optional_json(&body)?;
    let task = state
        .engine
        .cancel_task(caller.id(), PetId::new(pet_id), TaskId::new(task_id), expected_version)
        .await?;
    Ok(Json(task))
}

// =============================================================================
// Chat, catalog, notifications
// =============================================================================

/// GET /api/v1/pets/{pet_id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> HandlerResult<Vec<ChatMessage>> {
    Ok(Json(
        state
            .engine
            .list_messages(caller.id(), PetId::new(pet_id), query.limit)
            .await?,
    ))
}

/// POST /api/v1/pets/{pet_id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(pet_id): Path<i64>,
    Json(request): Json<MessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    let message = state
        .engine
        .post_message(caller.id(), PetId::new(pet_id), &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/items
pub async fn list_items() -> Json<Vec<ItemDef>> {
    Json(catalog::items())
}

/// GET /api/v1/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
    caller: AuthUser,
) -> HandlerResult<Vec<AchievementStatus>> {
    Ok(Json(state.engine.list_achievements(caller.id()).await?))
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> HandlerResult<Vec<Notification>> {
    Ok(Json(
        state
            .engine
            .list_notifications(caller.id(), query.unread_only, query.limit)
            .await?,
    ))
}

/// POST /api/v1/notifications/{id}/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(notification_id): Path<i64>,
) -> HandlerResult<Notification> {
    Ok(Json(
        state
            .engine
            .mark_notification_read(caller.id(), NotificationId::new(notification_id))
            .await?,
    ))
}
