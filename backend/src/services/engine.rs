//! Core pet engine.
//!
//! Every change to a pet goes through [`PetEngine::mutate_pet`]: load the
//! aggregate, apply a closure to a copy, then commit with a compare-and-swap
//! on the pet version. A lost race is retried from a fresh load; the winner's
//! changes are never overwritten. Side effects (ledger rows, realtime events,
//! achievements) run only after a successful commit and carry the committed
//! version.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{PetId, UserId};
use crate::config::GameConfig;
use crate::db::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::ledger::{ActivityEntry, MetricsSnapshot, NewTransaction, TransactionKind};
use crate::models::pet::{MetricDelta, NewPet, Ownership, Permissions, PetRecord, PetView};
use crate::realtime::{ConnectionManager, MessageType, ServerEvent};
use crate::services::metrics;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// The caller's view of the pet is stale, or every retry lost the race.
    #[error("Pet was modified concurrently; current version is {current}")]
    VersionConflict { current: u64 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Result of a committed mutation.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    /// Aggregate as loaded for the winning attempt.
    pub before: PetRecord,
    /// Aggregate as stored.
    pub pet: PetRecord,
    pub value: T,
}

impl<T> Committed<T> {
    pub fn changed(&self) -> bool {
        self.before.version != self.pet.version
    }
}

#[derive(Clone)]
pub struct PetEngine {
    pub(crate) repo: Arc<dyn FullRepository>,
    pub(crate) hub: Arc<ConnectionManager>,
    pub(crate) config: GameConfig,
}

/// Membership and permission check used inside mutation closures.
pub(crate) fn require(
    pet: &PetRecord,
    user_id: UserId,
    allowed: fn(&Permissions) -> bool,
    action: &str,
) -> EngineResult<()> {
    let ownership = pet
        .ownership(user_id)
        .ok_or_else(|| EngineError::NotFound("Pet".to_string()))?;
    if !allowed(&ownership.permissions) {
        return Err(EngineError::Forbidden(format!(
            "You do not have permission to {action} this pet"
        )));
    }
    Ok(())
}

pub(crate) fn ownership_mut(pet: &mut PetRecord, user_id: UserId) -> EngineResult<&mut Ownership> {
    pet.ownership_mut(user_id)
        .ok_or_else(|| EngineError::NotFound("Pet".to_string()))
}

/// Debit the pet wallet. Fails without side effects when funds are short.
pub(crate) fn spend(pet: &mut PetRecord, amount: i64) -> EngineResult<i64> {
    let available = pet.metrics.currency;
    if amount > available {
        return Err(EngineError::InsufficientFunds {
            required: amount,
            available,
        });
    }
    pet.metrics.currency -= amount;
    pet.metrics.total_currency_spent += amount;
    Ok(pet.metrics.currency)
}

/// Credit the pet wallet and return the new balance.
pub(crate) fn earn(pet: &mut PetRecord, amount: i64) -> i64 {
    pet.metrics.currency = pet.metrics.currency.saturating_add(amount);
    pet.metrics.total_currency_earned = pet.metrics.total_currency_earned.saturating_add(amount);
    pet.metrics.currency
}

/// Log and swallow a failed post-commit write. The pet itself is already
/// committed at this point.
pub(crate) fn best_effort<T>(result: RepositoryResult<T>, what: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "Post-commit {} failed", what);
            None
        }
    }
}

impl PetEngine {
    pub fn new(
        repo: Arc<dyn FullRepository>,
        hub: Arc<ConnectionManager>,
        config: GameConfig,
    ) -> Self {
        Self { repo, hub, config }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<ConnectionManager> {
        &self.hub
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    /// Load a pet for a member. Non-members get `NotFound` so pet ids
    /// cannot be probed.
    pub(crate) async fn load_for_member(
        &self,
        pet_id: PetId,
        user_id: UserId,
    ) -> EngineResult<PetRecord> {
        let pet = self.load(pet_id).await?;
        if !pet.is_member(user_id) {
            return Err(EngineError::NotFound("Pet".to_string()));
        }
        Ok(pet)
    }

    async fn load(&self, pet_id: PetId) -> EngineResult<PetRecord> {
        self.repo.get_pet(pet_id).await.map_err(|e| {
            if e.is_not_found() {
                EngineError::NotFound("Pet".to_string())
            } else {
                e.into()
            }
        })
    }

    /// Apply `op` to pet `pet_id` on behalf of member `actor`.
    ///
    /// When `expected_version` is given and does not match the stored
    /// version, nothing is applied and `VersionConflict` is returned.
    pub async fn mutate_pet<T, F>(
        &self,
        pet_id: PetId,
        actor: UserId,
        expected_version: Option<u64>,
        op: F,
    ) -> EngineResult<Committed<T>>
    where
        F: FnMut(&mut PetRecord) -> EngineResult<T> + Send,
        T: Send,
    {
        self.commit(pet_id, Some(actor), expected_version, op).await
    }

    /// Mutation performed by the service itself (decay, rewards).
    pub(crate) async fn mutate_pet_as_system<T, F>(
        &self,
        pet_id: PetId,
        op: F,
    ) -> EngineResult<Committed<T>>
    where
        F: FnMut(&mut PetRecord) -> EngineResult<T> + Send,
        T: Send,
    {
        self.commit(pet_id, None, None, op).await
    }

    async fn commit<T, F>(
        &self,
        pet_id: PetId,
        actor: Option<UserId>,
        expected_version: Option<u64>,
        mut op: F,
    ) -> EngineResult<Committed<T>>
    where
        F: FnMut(&mut PetRecord) -> EngineResult<T> + Send,
        T: Send,
    {
        let max_attempts = self.config.max_save_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let before = self.load(pet_id).await?;
            if let Some(actor) = actor {
                if !before.is_member(actor) {
                    return Err(EngineError::NotFound("Pet".to_string()));
                }
            }
            if let Some(expected) = expected_version {
                if before.version != expected {
                    return Err(EngineError::VersionConflict {
                        current: before.version,
                    });
                }
            }

            let mut draft = before.clone();
            let value = op(&mut draft)?;
            if draft == before {
                return Ok(Committed {
                    pet: before.clone(),
                    before,
                    value,
                });
            }
            draft.updated_at = Some(Utc::now());

            match self.repo.save_pet(draft, before.version).await {
                Ok(pet) => {
                    debug!(pet_id = %pet_id, version = pet.version, attempt, "Pet committed");
                    return Ok(Committed { before, pet, value });
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    debug!(pet_id = %pet_id, attempt, error = %e, "Retrying pet mutation");
                    tokio::task::yield_now().await;
                }
                Err(RepositoryError::Conflict { .. }) => {
                    let current = self
                        .repo
                        .get_pet(pet_id)
                        .await
                        .map(|p| p.version)
                        .unwrap_or(before.version);
                    warn!(pet_id = %pet_id, attempts = attempt, "Giving up on contended pet");
                    return Err(EngineError::VersionConflict { current });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Push the committed state to the pet room and announce mood changes.
    pub(crate) fn publish<T>(&self, committed: &Committed<T>) {
        if !committed.changed() {
            return;
        }
        let pet = &committed.pet;
        self.hub
            .publish_pet_state(pet.id, pet.version, serde_json::json!(pet.view()));
        let (old, new) = (committed.before.state(), pet.state());
        if old != new {
            self.hub.broadcast_to_pet(
                pet.id,
                ServerEvent::for_pet(
                    MessageType::PetStateChange,
                    pet.id,
                    pet.version,
                    serde_json::json!({ "old_state": old, "new_state": new }),
                ),
                &[],
            );
        }
    }

    pub(crate) fn broadcast(
        &self,
        pet: &PetRecord,
        kind: MessageType,
        data: serde_json::Value,
    ) {
        self.hub.broadcast_to_pet(
            pet.id,
            ServerEvent::for_pet(kind, pet.id, pet.version, data),
            &[],
        );
    }

    pub(crate) async fn record_snapshot(&self, pet: &PetRecord, event_type: &str, details: Option<String>) {
        best_effort(
            self.repo
                .append_snapshot(MetricsSnapshot {
                    pet_id: pet.id,
                    metrics: pet.metrics.view(),
                    event_type: event_type.to_string(),
                    event_details: details,
                    timestamp: Utc::now(),
                })
                .await,
            "snapshot",
        );
    }

    pub(crate) async fn record_activity(
        &self,
        pet: &PetRecord,
        user_id: UserId,
        activity_type: &str,
        details: serde_json::Value,
        applied: MetricDelta,
    ) {
        best_effort(
            self.repo
                .append_activity(ActivityEntry {
                    pet_id: pet.id,
                    user_id,
                    activity_type: activity_type.to_string(),
                    details,
                    metrics_change: applied,
                    created_at: Utc::now(),
                })
                .await,
            "activity",
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn record_transaction(
        &self,
        pet: &PetRecord,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        description: String,
        task_id: Option<crate::api::TaskId>,
        item_id: Option<crate::api::ItemId>,
    ) {
        let tx = best_effort(
            self.repo
                .append_transaction(NewTransaction {
                    pet_id: pet.id,
                    user_id,
                    amount,
                    kind,
                    description,
                    task_id,
                    item_id,
                    balance_after: pet.metrics.currency,
                    created_at: Utc::now(),
                })
                .await,
            "transaction",
        );
        if let Some(tx) = tx {
            self.broadcast(pet, MessageType::Transaction, serde_json::json!(tx));
            self.broadcast(
                pet,
                MessageType::CurrencyUpdate,
                serde_json::json!({
                    "currency": pet.metrics.currency,
                    "change": amount,
                }),
            );
        }
    }

    // ==================== Pets ====================

    /// Create a pet owned by `user_id`.
    pub async fn create_pet(
        &self,
        user_id: UserId,
        name: &str,
        sprite_id: Option<i32>,
        color: Option<&str>,
    ) -> EngineResult<PetView> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(EngineError::Validation(
                "Pet name must be between 1 and 50 characters".to_string(),
            ));
        }
        let color = color.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("orange");
        if color.chars().count() > 20 {
            return Err(EngineError::Validation(
                "Color must be at most 20 characters".to_string(),
            ));
        }
        let sprite_id = sprite_id.unwrap_or(1);
        if sprite_id < 1 {
            return Err(EngineError::Validation("sprite_id must be positive".to_string()));
        }

        let now = Utc::now();
        let pet = self
            .repo
            .create_pet(NewPet {
                name: name.to_string(),
                sprite_id,
                color: color.to_string(),
                created_by: user_id,
                metrics: metrics::initial_metrics(self.config.initial_currency, now),
                created_at: now,
            })
            .await?;
        info!(pet_id = %pet.id, user_id = %user_id, "Pet created");

        self.record_snapshot(&pet, "created", None).await;
        self.record_activity(
            &pet,
            user_id,
            "created",
            serde_json::json!({ "name": pet.name }),
            MetricDelta::default(),
        )
        .await;

        let view = pet.view();
        self.hub.send_to_user(
            user_id,
            ServerEvent::for_pet(MessageType::PetCreated, pet.id, pet.version, serde_json::json!(view)),
        );
        Ok(view)
    }

    pub async fn get_pet(&self, user_id: UserId, pet_id: PetId) -> EngineResult<PetView> {
        Ok(self.load_for_member(pet_id, user_id).await?.view())
    }

    pub async fn list_pets(&self, user_id: UserId) -> EngineResult<Vec<PetView>> {
        Ok(self
            .repo
            .list_pets_for_user(user_id)
            .await?
            .iter()
            .map(PetRecord::view)
            .collect())
    }

    /// Whether `user_id` may see `pet_id`. Used by the realtime endpoints.
    pub async fn is_member(&self, user_id: UserId, pet_id: PetId) -> EngineResult<bool> {
        match self.repo.get_pet(pet_id).await {
            Ok(pet) => Ok(pet.is_member(user_id)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Current full snapshot for a member, as sent on room join.
    pub async fn snapshot_event(&self, user_id: UserId, pet_id: PetId) -> EngineResult<ServerEvent> {
        let pet = self.load_for_member(pet_id, user_id).await?;
        Ok(ServerEvent::for_pet(
            MessageType::PetMetricsUpdate,
            pet.id,
            pet.version,
            serde_json::json!(pet.view()),
        ))
    }

    /// Put `client_id` in the pet's room and queue the current snapshot.
    ///
    /// Membership is checked again once the client is in the room, so a
    /// removal committing concurrently either kicks the client or is seen
    /// here and the client leaves.
    pub async fn join_pet_room(
        &self,
        client_id: &str,
        user_id: UserId,
        pet_id: PetId,
    ) -> EngineResult<()> {
        if !self.is_member(user_id, pet_id).await? {
            return Err(EngineError::NotFound("Pet".to_string()));
        }
        self.hub.join_room(client_id, pet_id);
        match self.snapshot_event(user_id, pet_id).await {
            Ok(snapshot) => {
                self.hub.send_to_client(client_id, snapshot);
                Ok(())
            }
            Err(e) => {
                self.hub.leave_room(client_id);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
