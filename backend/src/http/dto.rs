//! Data Transfer Objects for the HTTP API.
//!
//! Engine outcomes already serialize and are returned as-is; this module only
//! holds request bodies, query strings and the few responses built here.

use serde::{Deserialize, Serialize};

use crate::api::UserId;
use crate::auth::TokenPair;
use crate::models::pet::OwnerRole;
use crate::models::task::TaskStatus;
use crate::models::user::UserProfile;
use crate::realtime::HubStats;
use crate::services::NewTaskRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Returned by register: the new profile plus a token pair.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    #[serde(default)]
    pub sprite_id: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_food() -> String {
    "catnip".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedRequest {
    #[serde(default = "default_food", alias = "food")]
    pub food_type: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl Default for FeedRequest {
    fn default() -> Self {
        Self {
            food_type: default_food(),
            expected_version: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractRequest {
    pub action: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl Default for PurchaseRequest {
    fn default() -> Self {
        Self {
            quantity: default_quantity(),
            expected_version: None,
        }
    }
}

/// Body or query carrying only an optional version precondition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionedRequest {
    #[serde(default)]
    pub expected_version: Option<u64>,
}

fn default_invite_role() -> OwnerRole {
    OwnerRole::CoOwner
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    #[serde(default = "default_invite_role")]
    pub role: OwnerRole,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskBody {
    #[serde(flatten)]
    pub task: NewTaskRequest,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignTaskRequest {
    pub assignees: Vec<UserId>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub api_version: &'static str,
    pub status: &'static str,
    pub environment: String,
    pub realtime: HubStats,
    pub features: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
