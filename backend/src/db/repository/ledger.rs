//! Append-only per-pet logs: currency transactions, metric history and activity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryResult;
use crate::api::PetId;
use crate::models::ledger::{ActivityEntry, MetricsSnapshot, NewTransaction, Transaction};

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn append_transaction(&self, tx: NewTransaction) -> RepositoryResult<Transaction>;

    /// Most recent transactions first.
    async fn list_transactions(&self, pet_id: PetId, limit: usize)
        -> RepositoryResult<Vec<Transaction>>;

    /// Append a history point. Implementations keep a bounded number of
    /// snapshots per pet and drop the oldest first.
    async fn append_snapshot(&self, snapshot: MetricsSnapshot) -> RepositoryResult<()>;

    /// Snapshots taken at or after `since`, oldest first.
    async fn metrics_history(
        &self,
        pet_id: PetId,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MetricsSnapshot>>;

    async fn append_activity(&self, entry: ActivityEntry) -> RepositoryResult<()>;

    /// Most recent activity first.
    async fn list_activity(&self, pet_id: PetId, limit: usize)
        -> RepositoryResult<Vec<ActivityEntry>>;
}
