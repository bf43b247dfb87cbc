//! Real-world tasks that earn currency for a shared pet.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{TaskId, UserId};
use crate::models::pet::MetricDelta;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Exercise,
    Hydration,
    Study,
    Chores,
    Social,
    Work,
    SelfCare,
    #[default]
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl TaskDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Recurrence {
    /// Length of one recurrence period. Monthly is treated as 30 days.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Daily => Some(Duration::days(1)),
            Self::Weekly => Some(Duration::weeks(1)),
            Self::Biweekly => Some(Duration::weeks(2)),
            Self::Monthly => Some(Duration::days(30)),
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub difficulty: TaskDifficulty,
    pub status: TaskStatus,
    pub created_by: UserId,
    pub currency_reward: i64,
    pub experience_reward: u64,
    pub metric_impacts: MetricDelta,
    pub recurrence: Recurrence,
    pub due_date: Option<DateTime<Utc>>,
    pub assignees: Vec<UserId>,
    pub streak_count: u32,
    pub max_streak: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub total_completions: u32,
    pub priority: i32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    /// Whether `user_id` may complete this task. Unassigned tasks are open to
    /// every member.
    pub fn can_be_completed_by(&self, user_id: UserId) -> bool {
        self.assignees.is_empty() || self.assignees.contains(&user_id)
    }

    /// Whether the task is past due at `now` and should expire.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active()
            && !self.recurrence.is_recurring()
            && self.due_date.is_some_and(|due| due < now)
    }
}
