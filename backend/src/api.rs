//! Public API surface for the Purretys backend.
//!
//! Identifier newtypes live here together with re-exports of the view types
//! that the HTTP layer and the realtime hub serialize to clients.

use crate::define_id_type;

define_id_type!(
    i64 => UserId,
    PetId,
    TaskId,
    ItemId,
    NotificationId,
    MessageId,
    TransactionId,
    InvitationId,
);

/// Realtime connection identifier (UUID v4 string).
pub type ClientId = String;

pub use crate::models::catalog::{AchievementDef, ItemDef, ItemKind};
pub use crate::models::counter::PetCounter;
pub use crate::models::pet::{MetricsView, PetState, PetView};
pub use crate::models::task::{Task, TaskStatus};
pub use crate::models::user::UserProfile;
