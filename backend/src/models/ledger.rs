//! Append-only records kept next to each pet: currency transactions,
//! metric history snapshots and the activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ItemId, PetId, TaskId, TransactionId, UserId};
use crate::models::pet::{MetricDelta, MetricsView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    TaskReward,
    ItemPurchase,
    MiniGameReward,
    DailyBonus,
    AchievementReward,
    Gift,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub pet_id: PetId,
    pub user_id: UserId,
    /// Positive for earning, negative for spending.
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub task_id: Option<TaskId>,
    pub item_id: Option<ItemId>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// A transaction before the repository assigns its id.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub pet_id: PetId,
    pub user_id: UserId,
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub task_id: Option<TaskId>,
    pub item_id: Option<ItemId>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Metric snapshot taken after a change, used for history charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub pet_id: PetId,
    pub metrics: MetricsView,
    /// fed, played, petted, task_completed, decay, ...
    pub event_type: String,
    pub event_details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub pet_id: PetId,
    pub user_id: UserId,
    pub activity_type: String,
    pub details: serde_json::Value,
    pub metrics_change: MetricDelta,
    pub created_at: DateTime<Utc>,
}
