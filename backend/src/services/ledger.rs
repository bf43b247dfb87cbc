//! Read side of the per-pet ledgers.

use chrono::{Duration, Utc};

use super::engine::{EngineResult, PetEngine};
use crate::api::{PetId, UserId};
use crate::models::ledger::{ActivityEntry, MetricsSnapshot, Transaction};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

fn page_size(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

impl PetEngine {
    /// Snapshots from the last `hours` hours, oldest first.
    pub async fn metrics_history(
        &self,
        user_id: UserId,
        pet_id: PetId,
        hours: Option<i64>,
    ) -> EngineResult<Vec<MetricsSnapshot>> {
        self.load_for_member(pet_id, user_id).await?;
        let hours = hours
            .unwrap_or(self.config.history_default_hours)
            .clamp(1, self.config.history_max_hours);
        let since = Utc::now() - Duration::hours(hours);
        Ok(self.repo.metrics_history(pet_id, since).await?)
    }

    /// Newest first.
    pub async fn transactions(
        &self,
        user_id: UserId,
        pet_id: PetId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Transaction>> {
        self.load_for_member(pet_id, user_id).await?;
        Ok(self.repo.list_transactions(pet_id, page_size(limit)).await?)
    }

    /// Newest first.
    pub async fn activity(
        &self,
        user_id: UserId,
        pet_id: PetId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<ActivityEntry>> {
        self.load_for_member(pet_id, user_id).await?;
        Ok(self.repo.list_activity(pet_id, page_size(limit)).await?)
    }
}
