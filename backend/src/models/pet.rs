//! Pet aggregate: profile, shared metrics, co-owners, inventory and tasks.
//!
//! A [`PetRecord`] is the unit of consistency. Every mutation made by any
//! co-owner is applied to a whole record and committed with a version check,
//! so concurrent writers never interleave partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ItemId, PetId, UserId};
use crate::models::counter::PetCounter;
use crate::models::task::Task;
use crate::services::metrics;

/// Upper bound shared by every bounded metric.
pub const METRIC_MAX: f64 = 100.0;
/// Lower bound shared by every bounded metric.
pub const METRIC_MIN: f64 = 0.0;

/// Observable mood of a pet, derived from its metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetState {
    Happy,
    Sad,
    Sleeping,
    Hungry,
    Sick,
    Playful,
    Tired,
    Neutral,
}

/// Growth stage, derived from level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetStage {
    Kitten,
    Young,
    Adult,
    Senior,
}

/// Shared pet metrics. Bounded metrics live in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetMetrics {
    pub happiness: f64,
    /// 100 = starving, 0 = full.
    pub hunger: f64,
    pub health: f64,
    pub energy: f64,
    pub currency: i64,
    pub total_currency_earned: i64,
    pub total_currency_spent: i64,
    pub happiness_modifier: f64,
    pub health_modifier: f64,
    pub energy_modifier: f64,
    pub last_decay_at: DateTime<Utc>,
}

impl PetMetrics {
    /// Rounded snapshot for clients.
    pub fn view(&self) -> MetricsView {
        MetricsView {
            happiness: round1(self.happiness),
            hunger: round1(self.hunger),
            health: round1(self.health),
            energy: round1(self.energy),
            currency: self.currency,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Change to the bounded metrics. Absent components are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub happiness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunger: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
}

impl MetricDelta {
    pub fn is_empty(&self) -> bool {
        self.happiness.is_none()
            && self.hunger.is_none()
            && self.health.is_none()
            && self.energy.is_none()
    }

    pub fn happiness(mut self, v: f64) -> Self {
        self.happiness = Some(v);
        self
    }

    pub fn hunger(mut self, v: f64) -> Self {
        self.hunger = Some(v);
        self
    }

    pub fn health(mut self, v: f64) -> Self {
        self.health = Some(v);
        self
    }

    pub fn energy(mut self, v: f64) -> Self {
        self.energy = Some(v);
        self
    }
}

/// Metrics as clients see them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsView {
    pub happiness: f64,
    pub hunger: f64,
    pub health: f64,
    pub energy: f64,
    pub currency: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerRole {
    #[serde(rename = "owner")]
    Owner,
    #[serde(rename = "co-owner")]
    CoOwner,
}

/// Per-member permissions on a shared pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_feed: bool,
    pub can_play: bool,
    pub can_spend_currency: bool,
    pub can_create_tasks: bool,
    pub can_invite_others: bool,
}

impl Permissions {
    pub fn for_role(role: OwnerRole) -> Self {
        Self {
            can_feed: true,
            can_play: true,
            can_spend_currency: true,
            can_create_tasks: true,
            can_invite_others: role == OwnerRole::Owner,
        }
    }
}

/// Care statistics of one member on one pet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareStats {
    pub total_feeds: u64,
    pub total_plays: u64,
    pub total_pets: u64,
    pub total_tasks_completed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub user_id: UserId,
    pub role: OwnerRole,
    pub joined_at: DateTime<Utc>,
    pub permissions: Permissions,
    pub stats: CareStats,
}

impl Ownership {
    pub fn new(user_id: UserId, role: OwnerRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role,
            joined_at,
            permissions: Permissions::for_role(role),
            stats: CareStats::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_used: u32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub acquired_at: DateTime<Utc>,
}

/// Fields required to create a pet; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewPet {
    pub name: String,
    pub sprite_id: i32,
    pub color: String,
    pub created_by: UserId,
    pub metrics: PetMetrics,
    pub created_at: DateTime<Utc>,
}

/// The pet aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetRecord {
    pub id: PetId,
    pub name: String,
    pub sprite_id: i32,
    pub color: String,
    pub level: u32,
    pub experience_points: u64,
    pub is_sleeping: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_fed_at: Option<DateTime<Utc>>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub last_petted_at: Option<DateTime<Utc>>,
    pub times_petted: PetCounter,
    pub metrics: PetMetrics,
    pub ownerships: Vec<Ownership>,
    pub inventory: Vec<InventoryEntry>,
    pub tasks: Vec<Task>,
    /// Bumped by the repository on every committed save.
    pub version: u64,
}

impl PetRecord {
    /// Build the initial record for a freshly created pet.
    pub fn from_new(id: PetId, new: NewPet) -> Self {
        Self {
            id,
            name: new.name,
            sprite_id: new.sprite_id,
            color: new.color,
            level: 1,
            experience_points: 0,
            is_sleeping: false,
            created_by: new.created_by,
            created_at: new.created_at,
            updated_at: None,
            last_fed_at: None,
            last_played_at: None,
            last_petted_at: None,
            times_petted: PetCounter::new(),
            metrics: new.metrics,
            ownerships: vec![Ownership::new(new.created_by, OwnerRole::Owner, new.created_at)],
            inventory: Vec::new(),
            tasks: Vec::new(),
            version: 1,
        }
    }

    pub fn ownership(&self, user_id: UserId) -> Option<&Ownership> {
        self.ownerships.iter().find(|o| o.user_id == user_id)
    }

    pub fn ownership_mut(&mut self, user_id: UserId) -> Option<&mut Ownership> {
        self.ownerships.iter_mut().find(|o| o.user_id == user_id)
    }

    pub fn is_member(&self, user_id: UserId) -> bool {
        self.ownership(user_id).is_some()
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.ownerships.iter().map(|o| o.user_id).collect()
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.ownerships
            .iter()
            .find(|o| o.role == OwnerRole::Owner)
            .map(|o| o.user_id)
    }

    pub fn state(&self) -> PetState {
        metrics::derive_state(&self.metrics, self.is_sleeping)
    }

    pub fn stage(&self) -> PetStage {
        metrics::stage_for_level(self.level)
    }

    pub fn task(&self, task_id: crate::api::TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: crate::api::TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    pub fn inventory_entry(&self, item_id: ItemId) -> Option<&InventoryEntry> {
        self.inventory.iter().find(|e| e.item_id == item_id)
    }

    /// Add experience and recompute the level.
    pub fn gain_experience(&mut self, xp: u64) {
        self.experience_points = self.experience_points.saturating_add(xp);
        self.level = metrics::level_for_experience(self.experience_points);
    }

    pub fn view(&self) -> PetView {
        PetView {
            id: self.id,
            name: self.name.clone(),
            sprite_id: self.sprite_id,
            color: self.color.clone(),
            stage: self.stage(),
            state: self.state(),
            level: self.level,
            experience_points: self.experience_points,
            is_sleeping: self.is_sleeping,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_fed_at: self.last_fed_at,
            last_played_at: self.last_played_at,
            last_petted_at: self.last_petted_at,
            metrics: self.metrics.view(),
            owners: self
                .ownerships
                .iter()
                .map(|o| OwnerView {
                    user_id: o.user_id,
                    role: o.role,
                    joined_at: o.joined_at,
                    permissions: o.permissions,
                    stats: o.stats,
                })
                .collect(),
            times_petted: self.times_petted.count(),
            pet_button_label: self.times_petted.label(),
            version: self.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerView {
    pub user_id: UserId,
    pub role: OwnerRole,
    pub joined_at: DateTime<Utc>,
    pub permissions: Permissions,
    pub stats: CareStats,
}

/// Pet as returned to members and pushed over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetView {
    pub id: PetId,
    pub name: String,
    pub sprite_id: i32,
    pub color: String,
    pub stage: PetStage,
    pub state: PetState,
    pub level: u32,
    pub experience_points: u64,
    pub is_sleeping: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_fed_at: Option<DateTime<Utc>>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub last_petted_at: Option<DateTime<Utc>>,
    pub metrics: MetricsView,
    pub owners: Vec<OwnerView>,
    pub times_petted: u64,
    pub pet_button_label: String,
    pub version: u64,
}
