//! In-memory local repository implementation.
//!
//! Stores everything in hash maps behind a single `parking_lot::RwLock`.
//! Fast, deterministic and isolated, so it backs both local development and
//! the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::api::*;
use crate::db::repository::*;
use crate::models::ledger::{ActivityEntry, MetricsSnapshot, NewTransaction, Transaction};
use crate::models::pet::{NewPet, PetRecord};
use crate::models::social::{
    AchievementUnlock, ChatMessage, Invitation, InvitationStatus, NewInvitation, NewNotification,
    Notification,
};
use crate::models::user::{normalize_email, NewUser, User};

/// Default number of metric snapshots kept per pet.
pub const DEFAULT_HISTORY_CAPACITY: usize = 2000;

const ACTIVITY_CAPACITY: usize = 2000;
const MESSAGE_CAPACITY: usize = 1000;
const TRANSACTION_CAPACITY: usize = 2000;
/// Per user. The oldest notification is dropped first.
const NOTIFICATION_CAPACITY: usize = 500;

/// In-memory repository.
///
/// # Example
/// ```ignore
/// let repo = LocalRepository::new();
/// let user = repo.insert_user(new_user).await?;
/// let pet = repo.create_pet(new_pet).await?;
/// assert_eq!(pet.version, 1);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    history_capacity: usize,
}

#[derive(Default)]
struct LocalData {
    users: HashMap<UserId, User>,
    pets: HashMap<PetId, PetRecord>,
    transactions: HashMap<PetId, VecDeque<Transaction>>,
    history: HashMap<PetId, VecDeque<MetricsSnapshot>>,
    activity: HashMap<PetId, VecDeque<ActivityEntry>>,
    invitations: HashMap<InvitationId, Invitation>,
    notifications: HashMap<NotificationId, Notification>,
    messages: HashMap<PetId, VecDeque<ChatMessage>>,
    unlocks: Vec<AchievementUnlock>,
    unlock_keys: HashSet<(UserId, i64)>,

    next_user_id: i64,
    next_pet_id: i64,
    next_task_id: i64,
    next_transaction_id: i64,
    next_invitation_id: i64,
    next_notification_id: i64,
    next_message_id: i64,

    is_unhealthy: bool,
    failing_saves: usize,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
            history_capacity: history_capacity.max(1),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_unhealthy = !healthy;
    }

    /// Make the next `count` calls to `save_pet` fail with a connection
    /// error, for testing partial failures.
    pub fn fail_next_saves(&self, count: usize) {
        self.data.write().failing_saves = count;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let unhealthy = data.is_unhealthy;
        *data = LocalData {
            is_unhealthy: unhealthy,
            ..Default::default()
        };
    }

    pub fn pet_count(&self) -> usize {
        self.data.read().pets.len()
    }

    pub fn user_count(&self) -> usize {
        self.data.read().users.len()
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if self.data.read().is_unhealthy {
            return Err(RepositoryError::connection("Repository is not healthy"));
        }
        Ok(())
    }

    fn pet_not_found(pet_id: PetId) -> RepositoryError {
        RepositoryError::not_found_with_context(
            format!("Pet {} not found", pet_id),
            ErrorContext::default()
                .with_entity("pet")
                .with_entity_id(pet_id),
        )
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn insert_user(&self, user: NewUser) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();
        let email = normalize_email(&user.email);
        if data.users.values().any(|u| u.email == email) {
            return Err(RepositoryError::duplicate(
                "Email already registered",
                ErrorContext::new("insert_user").with_entity("user"),
            ));
        }
        if data
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(RepositoryError::duplicate(
                "Username already taken",
                ErrorContext::new("insert_user").with_entity("user"),
            ));
        }
        let id = UserId::new(next_id(&mut data.next_user_id));
        let stored = User {
            id,
            email,
            username: user.username,
            password_hash: user.password_hash,
            display_name: user.display_name,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        };
        data.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.check_health()?;
        self.data.read().users.get(&user_id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("User {} not found", user_id),
                ErrorContext::default()
                    .with_entity("user")
                    .with_entity_id(user_id),
            )
        })
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        let email = normalize_email(email);
        Ok(self
            .data
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn touch_last_login(&self, user_id: UserId, at: DateTime<Utc>) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let user = data
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RepositoryError::not_found(format!("User {} not found", user_id)))?;
        user.last_login = Some(at);
        Ok(())
    }
}

#[async_trait]
impl PetRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.data.read().is_unhealthy)
    }

    async fn allocate_task_id(&self) -> RepositoryResult<TaskId> {
        self.check_health()?;
        let mut data = self.data.write();
        Ok(TaskId::new(next_id(&mut data.next_task_id)))
    }

    async fn create_pet(&self, pet: NewPet) -> RepositoryResult<PetRecord> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = PetId::new(next_id(&mut data.next_pet_id));
        let record = PetRecord::from_new(id, pet);
        data.pets.insert(id, record.clone());
        Ok(record)
    }

    async fn get_pet(&self, pet_id: PetId) -> RepositoryResult<PetRecord> {
        self.check_health()?;
        self.data
            .read()
            .pets
            .get(&pet_id)
            .cloned()
            .ok_or_else(|| Self::pet_not_found(pet_id))
    }

    async fn list_pet_ids(&self) -> RepositoryResult<Vec<PetId>> {
        self.check_health()?;
        let mut ids: Vec<PetId> = self.data.read().pets.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_pets_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<PetRecord>> {
        self.check_health()?;
        let mut pets: Vec<PetRecord> = self
            .data
            .read()
            .pets
            .values()
            .filter(|p| p.is_member(user_id))
            .cloned()
            .collect();
        pets.sort_by_key(|p| p.id);
        Ok(pets)
    }

    async fn save_pet(
        &self,
        mut record: PetRecord,
        expected_version: u64,
    ) -> RepositoryResult<PetRecord> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.failing_saves > 0 {
            data.failing_saves -= 1;
            return Err(RepositoryError::connection("Simulated save failure")
                .with_operation("save_pet"));
        }
        let current = data
            .pets
            .get(&record.id)
            .ok_or_else(|| Self::pet_not_found(record.id))?;
        if current.version != expected_version {
            return Err(RepositoryError::version_conflict(
                "pet",
                record.id,
                expected_version,
                current.version,
            )
            .with_operation("save_pet"));
        }
        record.version = expected_version + 1;
        data.pets.insert(record.id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl LedgerRepository for LocalRepository {
    async fn append_transaction(&self, tx: NewTransaction) -> RepositoryResult<Transaction> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = Transaction {
            id: TransactionId::new(next_id(&mut data.next_transaction_id)),
            pet_id: tx.pet_id,
            user_id: tx.user_id,
            amount: tx.amount,
            kind: tx.kind,
            description: tx.description,
            task_id: tx.task_id,
            item_id: tx.item_id,
            balance_after: tx.balance_after,
            created_at: tx.created_at,
        };
        let ledger = data.transactions.entry(tx.pet_id).or_default();
        ledger.push_back(stored.clone());
        while ledger.len() > TRANSACTION_CAPACITY {
            ledger.pop_front();
        }
        Ok(stored)
    }

    async fn list_transactions(
        &self,
        pet_id: PetId,
        limit: usize,
    ) -> RepositoryResult<Vec<Transaction>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .transactions
            .get(&pet_id)
            .map(|txs| txs.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_snapshot(&self, snapshot: MetricsSnapshot) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let ring = data.history.entry(snapshot.pet_id).or_default();
        ring.push_back(snapshot);
        while ring.len() > self.history_capacity {
            ring.pop_front();
        }
        Ok(())
    }

    async fn metrics_history(
        &self,
        pet_id: PetId,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<MetricsSnapshot>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .history
            .get(&pet_id)
            .map(|ring| ring.iter().filter(|s| s.timestamp >= since).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_activity(&self, entry: ActivityEntry) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let log = data.activity.entry(entry.pet_id).or_default();
        log.push_back(entry);
        while log.len() > ACTIVITY_CAPACITY {
            log.pop_front();
        }
        Ok(())
    }

    async fn list_activity(
        &self,
        pet_id: PetId,
        limit: usize,
    ) -> RepositoryResult<Vec<ActivityEntry>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .activity
            .get(&pet_id)
            .map(|log| log.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SocialRepository for LocalRepository {
    async fn insert_invitation(&self, invitation: NewInvitation) -> RepositoryResult<Invitation> {
        self.check_health()?;
        let mut data = self.data.write();
        let email = normalize_email(&invitation.invitee_email);
        let duplicate = data.invitations.values().any(|i| {
            i.pet_id == invitation.pet_id
                && i.invitee_email == email
                && i.status == InvitationStatus::Pending
        });
        if duplicate {
            return Err(RepositoryError::duplicate(
                "A pending invitation already exists for this email",
                ErrorContext::new("insert_invitation")
                    .with_entity("invitation")
                    .with_entity_id(invitation.pet_id),
            ));
        }
        let stored = Invitation {
            id: InvitationId::new(next_id(&mut data.next_invitation_id)),
            pet_id: invitation.pet_id,
            inviter_id: invitation.inviter_id,
            invitee_email: email,
            role: invitation.role,
            message: invitation.message,
            status: InvitationStatus::Pending,
            token_hash: invitation.token_hash,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            responded_at: None,
        };
        data.invitations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> RepositoryResult<Option<Invitation>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .invitations
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn update_invitation(&self, invitation: &Invitation) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        match data.invitations.get_mut(&invitation.id) {
            Some(slot) => {
                *slot = invitation.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found(format!(
                "Invitation {} not found",
                invitation.id
            ))),
        }
    }

    async fn list_invitations_for_pet(&self, pet_id: PetId) -> RepositoryResult<Vec<Invitation>> {
        self.check_health()?;
        let mut out: Vec<Invitation> = self
            .data
            .read()
            .invitations
            .values()
            .filter(|i| i.pet_id == pet_id)
            .cloned()
            .collect();
        out.sort_by_key(|i| i.id);
        Ok(out)
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> RepositoryResult<Notification> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = Notification {
            id: NotificationId::new(next_id(&mut data.next_notification_id)),
            user_id: notification.user_id,
            pet_id: notification.pet_id,
            kind: notification.kind,
            title: notification.title,
            content: notification.content,
            priority: notification.priority,
            is_read: false,
            read_at: None,
            created_at: notification.created_at,
        };
        data.notifications.insert(stored.id, stored.clone());
        let mut owned: Vec<NotificationId> = data
            .notifications
            .values()
            .filter(|n| n.user_id == stored.user_id)
            .map(|n| n.id)
            .collect();
        if owned.len() > NOTIFICATION_CAPACITY {
            owned.sort();
            for id in &owned[..owned.len() - NOTIFICATION_CAPACITY] {
                data.notifications.remove(id);
            }
        }
        Ok(stored)
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: usize,
    ) -> RepositoryResult<Vec<Notification>> {
        self.check_health()?;
        let mut out: Vec<Notification> = self
            .data
            .read()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out.truncate(limit);
        Ok(out)
    }

    async fn mark_notification_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Notification> {
        self.check_health()?;
        let mut data = self.data.write();
        match data.notifications.get_mut(&notification_id) {
            Some(n) if n.user_id == user_id => {
                if !n.is_read {
                    n.is_read = true;
                    n.read_at = Some(at);
                }
                Ok(n.clone())
            }
            _ => Err(RepositoryError::not_found_with_context(
                format!("Notification {} not found", notification_id),
                ErrorContext::new("mark_notification_read").with_entity("notification"),
            )),
        }
    }

    async fn insert_message(
        &self,
        pet_id: PetId,
        user_id: UserId,
        content: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<ChatMessage> {
        self.check_health()?;
        let mut data = self.data.write();
        let message = ChatMessage {
            id: MessageId::new(next_id(&mut data.next_message_id)),
            pet_id,
            user_id,
            content,
            created_at: at,
        };
        let log = data.messages.entry(pet_id).or_default();
        log.push_back(message.clone());
        while log.len() > MESSAGE_CAPACITY {
            log.pop_front();
        }
        Ok(message)
    }

    async fn list_messages(
        &self,
        pet_id: PetId,
        limit: usize,
    ) -> RepositoryResult<Vec<ChatMessage>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .messages
            .get(&pet_id)
            .map(|log| {
                let skip = log.len().saturating_sub(limit);
                log.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn record_unlock(&self, unlock: AchievementUnlock) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data
            .unlock_keys
            .insert((unlock.user_id, unlock.achievement_id))
        {
            return Ok(false);
        }
        data.unlocks.push(unlock);
        Ok(true)
    }

    async fn release_unlock(&self, user_id: UserId, achievement_id: i64) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.unlock_keys.remove(&(user_id, achievement_id)) {
            data.unlocks
                .retain(|u| !(u.user_id == user_id && u.achievement_id == achievement_id));
        }
        Ok(())
    }

    async fn list_unlocks(&self, user_id: UserId) -> RepositoryResult<Vec<AchievementUnlock>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .unlocks
            .iter()
            .filter(|u| u.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::TransactionKind;
    use crate::models::pet::MetricsView;
    use crate::models::social::{NotificationKind, Priority};
    use crate::services::metrics::initial_metrics;
    use chrono::Duration;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            display_name: None,
        }
    }

    fn new_pet(owner: UserId) -> NewPet {
        NewPet {
            name: "Mochi".to_string(),
            sprite_id: 1,
            color: "orange".to_string(),
            created_by: owner,
            metrics: initial_metrics(100, Utc::now()),
            created_at: Utc::now(),
        }
    }

    fn snapshot(pet_id: PetId, at: DateTime<Utc>) -> MetricsSnapshot {
        MetricsSnapshot {
            pet_id,
            metrics: MetricsView {
                happiness: 50.0,
                hunger: 50.0,
                health: 100.0,
                energy: 50.0,
                currency: 100,
            },
            event_type: "decay".to_string(),
            event_details: None,
            timestamp: at,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        assert!(repo.list_pet_ids().await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let repo = LocalRepository::new();
        repo.insert_user(new_user("Ana@Example.com", "ana")).await.unwrap();
        let err = repo
            .insert_user(new_user("ana@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
        assert!(!err.is_retryable());
        let found = repo.find_user_by_email("ANA@example.com").await.unwrap();
        assert_eq!(found.unwrap().username, "ana");
    }

    #[tokio::test]
    async fn test_save_pet_compare_and_swap() {
        let repo = LocalRepository::new();
        let pet = repo.create_pet(new_pet(UserId::new(1))).await.unwrap();
        assert_eq!(pet.version, 1);

        let mut edited = pet.clone();
        edited.name = "Nori".to_string();
        let saved = repo.save_pet(edited.clone(), 1).await.unwrap();
        assert_eq!(saved.version, 2);

        let err = repo.save_pet(edited, 1).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(repo.get_pet(pet.id).await.unwrap().name, "Nori");
    }

    #[tokio::test]
    async fn test_list_pets_for_user_filters_membership() {
        let repo = LocalRepository::new();
        repo.create_pet(new_pet(UserId::new(1))).await.unwrap();
        repo.create_pet(new_pet(UserId::new(2))).await.unwrap();
        let mine = repo.list_pets_for_user(UserId::new(1)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(repo.pet_count(), 2);
    }

    #[tokio::test]
    async fn test_history_ring_is_capped() {
        let repo = LocalRepository::with_history_capacity(3);
        let pet_id = PetId::new(1);
        let start = Utc::now();
        for i in 0..5 {
            repo.append_snapshot(snapshot(pet_id, start + Duration::minutes(i)))
                .await
                .unwrap();
        }
        let all = repo
            .metrics_history(pet_id, start - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].timestamp, start + Duration::minutes(2));
    }

    #[tokio::test]
    async fn test_transactions_newest_first() {
        let repo = LocalRepository::new();
        let pet_id = PetId::new(1);
        for amount in [10, -5, 20] {
            repo.append_transaction(NewTransaction {
                pet_id,
                user_id: UserId::new(1),
                amount,
                kind: TransactionKind::Other,
                description: String::new(),
                task_id: None,
                item_id: None,
                balance_after: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        let txs = repo.list_transactions(pet_id, 2).await.unwrap();
        assert_eq!(txs.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![20, -5]);
    }

    #[tokio::test]
    async fn test_notification_read_is_scoped_to_owner() {
        let repo = LocalRepository::new();
        let n = repo
            .insert_notification(NewNotification {
                user_id: UserId::new(1),
                pet_id: None,
                kind: NotificationKind::System,
                title: "hi".to_string(),
                content: "hello".to_string(),
                priority: Priority::Normal,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(repo
            .mark_notification_read(UserId::new(2), n.id, Utc::now())
            .await
            .unwrap_err()
            .is_not_found());
        let read = repo
            .mark_notification_read(UserId::new(1), n.id, Utc::now())
            .await
            .unwrap();
        assert!(read.is_read);
        assert!(repo
            .list_notifications(UserId::new(1), true, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_record_unlock_once() {
        let repo = LocalRepository::new();
        let unlock = AchievementUnlock {
            user_id: UserId::new(1),
            achievement_id: 1,
            pet_id: None,
            unlocked_at: Utc::now(),
        };
        assert!(repo.record_unlock(unlock.clone()).await.unwrap());
        assert!(!repo.record_unlock(unlock).await.unwrap());
        assert_eq!(repo.list_unlocks(UserId::new(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_release_unlock_allows_a_second_unlock() {
        let repo = LocalRepository::new();
        let unlock = AchievementUnlock {
            user_id: UserId::new(1),
            achievement_id: 4,
            pet_id: None,
            unlocked_at: Utc::now(),
        };
        assert!(repo.record_unlock(unlock.clone()).await.unwrap());
        repo.release_unlock(UserId::new(1), 4).await.unwrap();
        assert!(repo.list_unlocks(UserId::new(1)).await.unwrap().is_empty());
        assert!(repo.record_unlock(unlock).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_saves_are_consumed() {
        let repo = LocalRepository::new();
        let pet = repo.create_pet(new_pet(UserId::new(1))).await.unwrap();
        repo.fail_next_saves(1);
        let err = repo.save_pet(pet.clone(), 1).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(repo.save_pet(pet, 1).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_transaction_ledger_is_capped() {
        let repo = LocalRepository::new();
        let pet_id = PetId::new(1);
        for amount in 0..(TRANSACTION_CAPACITY as i64 + 5) {
            repo.append_transaction(NewTransaction {
                pet_id,
                user_id: UserId::new(1),
                amount,
                kind: TransactionKind::Other,
                description: String::new(),
                task_id: None,
                item_id: None,
                balance_after: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        let txs = repo.list_transactions(pet_id, usize::MAX).await.unwrap();
        assert_eq!(txs.len(), TRANSACTION_CAPACITY);
        assert_eq!(txs.last().map(|t| t.amount), Some(5));
    }

    #[tokio::test]
    async fn test_notifications_are_capped_per_user() {
        let repo = LocalRepository::new();
        let notify = |user: i64, title: String| NewNotification {
            user_id: UserId::new(user),
            pet_id: None,
            kind: NotificationKind::System,
            title,
            content: String::new(),
            priority: Priority::Low,
            created_at: Utc::now(),
        };
        repo.insert_notification(notify(2, "other".to_string())).await.unwrap();
        for i in 0..(NOTIFICATION_CAPACITY + 3) {
            repo.insert_notification(notify(1, format!("n{i}"))).await.unwrap();
        }
        let mine = repo
            .list_notifications(UserId::new(1), false, usize::MAX)
            .await
            .unwrap();
        assert_eq!(mine.len(), NOTIFICATION_CAPACITY);
        assert_eq!(mine.last().map(|n| n.title.as_str()), Some("n3"));
        let theirs = repo
            .list_notifications(UserId::new(2), false, usize::MAX)
            .await
            .unwrap();
        assert_eq!(theirs.len(), 1);
    }

    #[tokio::test]
    async fn test_messages_latest_oldest_first() {
        let repo = LocalRepository::new();
        let pet_id = PetId::new(1);
        for text in ["a", "b", "c"] {
            repo.insert_message(pet_id, UserId::new(1), text.to_string(), Utc::now())
                .await
                .unwrap();
        }
        let msgs = repo.list_messages(pet_id, 2).await.unwrap();
        assert_eq!(
            msgs.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["b", "c"]
        );
    }
}
