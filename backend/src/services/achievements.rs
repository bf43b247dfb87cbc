//! Achievement progress and unlocking.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use super::engine::{earn, EngineResult, PetEngine};
use crate::api::{PetId, UserId};
use crate::models::catalog::{self, AchievementDef, Requirement};
use crate::models::ledger::TransactionKind;
use crate::models::pet::PetRecord;
use crate::models::social::{AchievementUnlock, NotificationKind, Priority};

/// Counters an achievement threshold is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub feeds: u64,
    pub pets: u64,
    pub tasks_completed: u64,
    pub streak_days: u64,
    pub co_owners: u64,
    pub unique_co_owners: u64,
    pub days_alive: u64,
}

impl Progress {
    /// Aggregate `user_id`'s progress over `pets`, with the pet-scoped
    /// counters taken from `current`.
    pub fn compute(user_id: UserId, pets: &[PetRecord], current: &PetRecord, now: DateTime<Utc>) -> Self {
        let mut progress = Self::default();
        let mut partners = HashSet::new();
        for pet in pets {
            if let Some(own) = pet.ownership(user_id) {
                progress.feeds += own.stats.total_feeds;
                progress.pets += own.stats.total_pets;
                progress.tasks_completed += own.stats.total_tasks_completed;
            }
            partners.extend(pet.member_ids().into_iter().filter(|u| *u != user_id));
            let best = pet.tasks.iter().map(|t| u64::from(t.max_streak)).max().unwrap_or(0);
            progress.streak_days = progress.streak_days.max(best);
        }
        progress.unique_co_owners = partners.len() as u64;
        progress.co_owners = current.ownerships.len().saturating_sub(1) as u64;
        progress.days_alive = (now - current.created_at).num_days().max(0) as u64;
        progress
    }

    pub fn value(&self, requirement: Requirement) -> u64 {
        match requirement {
            Requirement::Feeds => self.feeds,
            Requirement::Pets => self.pets,
            Requirement::TasksCompleted => self.tasks_completed,
            Requirement::StreakDays => self.streak_days,
            Requirement::CoOwners => self.co_owners,
            Requirement::UniqueCoOwners => self.unique_co_owners,
            Requirement::DaysAlive => self.days_alive,
        }
    }

    pub fn satisfies(&self, achievement: &AchievementDef) -> bool {
        self.value(achievement.requirement) >= achievement.threshold
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: AchievementDef,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl PetEngine {
    /// Unlock every newly satisfied achievement for `user_id` and pay its
    /// reward into `pet_id`. Errors are logged, never returned.
    pub async fn evaluate_achievements(&self, user_id: UserId, pet_id: PetId) -> Vec<AchievementDef> {
        self.evaluate_achievements_at(user_id, pet_id, Utc::now()).await
    }

    /// Same as [`Self::evaluate_achievements`] with age measured at `now`.
    pub async fn evaluate_achievements_at(
        &self,
        user_id: UserId,
        pet_id: PetId,
        now: DateTime<Utc>,
    ) -> Vec<AchievementDef> {
        match self.try_evaluate_achievements(user_id, pet_id, now).await {
            Ok(unlocked) => unlocked,
            Err(e) => {
                warn!(user_id = %user_id, pet_id = %pet_id, error = %e, "Achievement evaluation failed");
                Vec::new()
            }
        }
    }

    async fn try_evaluate_achievements(
        &self,
        user_id: UserId,
        pet_id: PetId,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<AchievementDef>> {
        let pets = self.repo.list_pets_for_user(user_id).await?;
        let Some(current) = pets.iter().find(|p| p.id == pet_id) else {
            return Ok(Vec::new());
        };
        let progress = Progress::compute(user_id, &pets, current, now);
        let already: HashSet<i64> = self
            .repo
            .list_unlocks(user_id)
            .await?
            .into_iter()
            .map(|u| u.achievement_id)
            .collect();

        let mut unlocked = Vec::new();
        for achievement in catalog::achievements()
            .into_iter()
            .filter(|a| !already.contains(&a.id) && progress.satisfies(a))
        {
            let fresh = self
                .repo
                .record_unlock(AchievementUnlock {
                    user_id,
                    achievement_id: achievement.id,
                    pet_id: Some(pet_id),
                    unlocked_at: now,
                })
                .await?;
            if !fresh {
                continue;
            }
            info!(user_id = %user_id, achievement = achievement.name, "Achievement unlocked");
            if let Err(e) = self.pay_achievement(user_id, pet_id, &achievement).await {
                // Unpaid unlocks are released so the next evaluation retries.
                if let Err(release) = self.repo.release_unlock(user_id, achievement.id).await {
                    warn!(user_id = %user_id, achievement = achievement.name, error = %release, "Failed to release unpaid unlock");
                }
                return Err(e);
            }
            unlocked.push(achievement);
        }
        Ok(unlocked)
    }

    async fn pay_achievement(
        &self,
        user_id: UserId,
        pet_id: PetId,
        achievement: &AchievementDef,
    ) -> EngineResult<()> {
        let (currency, xp) = (achievement.currency_reward, achievement.experience_reward);
        let committed = self
            .mutate_pet_as_system(pet_id, |pet| {
                earn(pet, currency);
                pet.gain_experience(xp);
                Ok(())
            })
            .await?;
        self.record_transaction(
            &committed.pet,
            user_id,
            currency,
            TransactionKind::AchievementReward,
            format!("Achievement unlocked: {}", achievement.name),
            None,
            None,
        )
        .await;
        self.publish(&committed);
        self.notify(
            user_id,
            NotificationKind::AchievementUnlocked,
            format!("Achievement unlocked: {}", achievement.name),
            format!("{} (+{currency} coins, +{xp} xp)", achievement.description),
            Priority::Normal,
            Some(pet_id),
        )
        .await;
        Ok(())
    }

    /// The catalog with the caller's unlock state.
    pub async fn list_achievements(&self, user_id: UserId) -> EngineResult<Vec<AchievementStatus>> {
        let unlocks = self.repo.list_unlocks(user_id).await?;
        Ok(catalog::achievements()
            .into_iter()
            .map(|achievement| {
                let unlock = unlocks.iter().find(|u| u.achievement_id == achievement.id);
                AchievementStatus {
                    unlocked: unlock.is_some(),
                    unlocked_at: unlock.map(|u| u.unlocked_at),
                    achievement,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pet::{NewPet, OwnerRole, Ownership};
    use crate::services::metrics::initial_metrics;
    use chrono::Duration;

    fn pet(id: i64, owner: i64, created_at: DateTime<Utc>) -> PetRecord {
        PetRecord::from_new(
            PetId::new(id),
            NewPet {
                name: format!("Pet {id}"),
                sprite_id: 1,
                color: "orange".to_string(),
                created_by: UserId::new(owner),
                metrics: initial_metrics(100, created_at),
                created_at,
            },
        )
    }

    #[test]
    fn test_progress_aggregates_across_pets() {
        let now = Utc::now();
        let user = UserId::new(1);
        let mut a = pet(1, 1, now - Duration::days(8));
        let mut b = pet(2, 1, now);
        a.ownerships.push(Ownership::new(UserId::new(2), OwnerRole::CoOwner, now));
        b.ownerships.push(Ownership::new(UserId::new(2), OwnerRole::CoOwner, now));
        b.ownerships.push(Ownership::new(UserId::new(3), OwnerRole::CoOwner, now));
        a.ownership_mut(user).unwrap().stats.total_feeds = 2;
        b.ownership_mut(user).unwrap().stats.total_feeds = 3;

        let progress = Progress::compute(user, &[a.clone(), b], &a, now);
        assert_eq!(progress.feeds, 5);
        assert_eq!(progress.co_owners, 1);
        assert_eq!(progress.unique_co_owners, 2);
        assert_eq!(progress.days_alive, 8);
    }

    #[test]
    fn test_first_feed_threshold() {
        let first_feed = catalog::achievements().into_iter().next().unwrap();
        let mut progress = Progress::default();
        assert!(!progress.satisfies(&first_feed));
        progress.feeds = 1;
        assert!(progress.satisfies(&first_feed));
    }
}
