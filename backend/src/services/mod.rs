//! Service layer: the pet engine and everything that mutates or reads pets.
//!
//! [`PetEngine`] is split across files by concern; every file adds methods
//! to the same type. `metrics` holds the pure rules the engine applies.

pub mod achievements;
pub mod care;
pub mod chat;
pub mod decay;
pub mod engine;
pub mod ledger;
pub mod maintenance;
pub mod metrics;
pub mod notifications;
pub mod sharing;
pub mod tasks;

pub use achievements::{AchievementStatus, Progress};
pub use care::{FeedOutcome, Interaction, InteractionOutcome, InventoryItem, PurchaseOutcome, UseOutcome};
pub use decay::DecayReport;
pub use engine::{Committed, EngineError, EngineResult, PetEngine};
pub use maintenance::{listen_for_shutdown, spawn_maintenance, MaintenanceReport, ShutdownSignal};
pub use sharing::InvitationCreated;
pub use tasks::{CompletionOutcome, NewTaskRequest};
