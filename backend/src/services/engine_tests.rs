use super::*;
use chrono::DateTime;
use crate::api::ItemId;
use crate::db::{LocalRepository, PetRepository, UserRepository};
use crate::models::user::NewUser;
use crate::models::pet::OwnerRole;
use crate::models::social::{InvitationStatus, NotificationKind};
use crate::models::task::{Recurrence, TaskDifficulty, TaskStatus};
use crate::services::care::Interaction;
use crate::services::tasks::NewTaskRequest;

struct Fixture {
    engine: PetEngine,
    repo: Arc<LocalRepository>,
}

fn fixture() -> Fixture {
    fixture_with(GameConfig::default())
}

fn fixture_with(config: GameConfig) -> Fixture {
    let repo = Arc::new(LocalRepository::new());
    let engine = PetEngine::new(repo.clone(), Arc::new(ConnectionManager::default()), config);
    Fixture { engine, repo }
}

async fn user(f: &Fixture, name: &str) -> UserId {
    f.repo
        .insert_user(NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            password_hash: "x".to_string(),
            display_name: None,
        })
        .await
        .unwrap()
        .id
}

async fn shared_pet(f: &Fixture) -> (UserId, UserId, PetId) {
    let owner = user(f, "alice").await;
    let co = user(f, "bob").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let invite = f
        .engine
        .invite(owner, pet.id, "BOB@example.com", OwnerRole::CoOwner, None)
        .await
        .unwrap();
    f.engine.accept_invitation(co, &invite.token).await.unwrap();
    (owner, co, pet.id)
}

#[tokio::test]
async fn test_create_pet_defaults() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "  Mochi ", None, None).await.unwrap();
    assert_eq!(pet.name, "Mochi");
    assert_eq!(pet.color, "orange");
    assert_eq!(pet.metrics.currency, 100);
    assert_eq!(pet.metrics.hunger, 50.0);
    assert_eq!(pet.version, 1);
    assert_eq!(pet.pet_button_label, "Pet the Cat (0 pets)");

    assert!(matches!(
        f.engine.create_pet(owner, "", None, None).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn test_non_member_gets_not_found() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let stranger = user(&f, "mallory").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    assert!(matches!(
        f.engine.get_pet(stranger, pet.id).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        f.engine.feed(stranger, pet.id, "catnip", None).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(f.engine.list_pets(stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feed_debits_and_applies_effects() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();

    let outcome = f.engine.feed(owner, pet.id, "Catnip", Some(1)).await.unwrap();
    assert_eq!(outcome.cost, 10);
    assert_eq!(outcome.new_metrics.currency, 90);
    assert_eq!(outcome.new_metrics.hunger, 20.0);
    assert_eq!(outcome.new_metrics.happiness, 70.0);
    assert_eq!(outcome.version, 2);

    let tx = f.engine.transactions(owner, pet.id, None).await.unwrap();
    assert!(tx.iter().any(|t| t.amount == -10 && t.balance_after == 90));
}

#[tokio::test]
async fn test_feed_rejects_unknown_food_and_non_food() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    assert!(matches!(
        f.engine.feed(owner, pet.id, "pizza", None).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        f.engine.feed(owner, pet.id, "yarn-ball", None).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn test_feed_with_insufficient_funds_changes_nothing() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine
        .mutate_pet(pet.id, owner, None, |p| {
            p.metrics.currency = 3;
            Ok(())
        })
        .await
        .unwrap();
    let err = f.engine.feed(owner, pet.id, "catnip", None).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { required: 10, available: 3 }));
    let after = f.engine.get_pet(owner, pet.id).await.unwrap();
    assert_eq!(after.metrics.currency, 3);
    assert_eq!(after.version, 2);
}

#[tokio::test]
async fn test_stale_expected_version_is_rejected() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine.interact(owner, pet.id, Interaction::Pet, Some(1)).await.unwrap();
    let err = f
        .engine
        .interact(owner, pet.id, Interaction::Pet, Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::VersionConflict { current: 2 }));
}

#[tokio::test]
async fn test_noop_mutation_keeps_version() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let committed = f.engine.mutate_pet(pet.id, owner, None, |_| Ok(())).await.unwrap();
    assert!(!committed.changed());
    assert_eq!(committed.pet.version, 1);
}

#[tokio::test]
async fn test_interactions_and_sleep_rules() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();

    let petted = f.engine.interact(owner, pet.id, Interaction::Pet, None).await.unwrap();
    assert_eq!(petted.pet.times_petted, 1);
    assert_eq!(petted.pet.pet_button_label, "Pet the Cat (1 pets)");

    let played = f.engine.interact(owner, pet.id, Interaction::Play, None).await.unwrap();
    assert_eq!(played.pet.metrics.energy, 35.0);

    f.engine.interact(owner, pet.id, Interaction::Sleep, None).await.unwrap();
    assert!(matches!(
        f.engine.interact(owner, pet.id, Interaction::Sleep, None).await,
        Err(EngineError::Conflict(_))
    ));
    assert!(matches!(
        f.engine.interact(owner, pet.id, Interaction::Play, None).await,
        Err(EngineError::Conflict(_))
    ));
    f.engine.interact(owner, pet.id, Interaction::Wake, None).await.unwrap();
    assert!(matches!(
        f.engine.interact(owner, pet.id, Interaction::Wake, None).await,
        Err(EngineError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_purchase_and_use_items() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();

    let bought = f
        .engine
        .purchase_item(owner, pet.id, ItemId::new(6), 2, None)
        .await
        .unwrap();
    assert_eq!(bought.total_cost, 60);
    assert_eq!(bought.remaining_currency, 40);
    assert_eq!(bought.owned, 2);

    let used = f.engine.use_item(owner, pet.id, ItemId::new(6), None).await.unwrap();
    assert_eq!(used.remaining, 1);

    // Bow tie is gated behind level 3.
    assert!(matches!(
        f.engine.purchase_item(owner, pet.id, ItemId::new(8), 1, None).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        f.engine.use_item(owner, pet.id, ItemId::new(1), None).await,
        Err(EngineError::Validation(_))
    ));
    let inventory = f.engine.inventory(owner, pet.id).await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].quantity, 1);
}

#[tokio::test]
async fn test_durable_item_is_not_consumed() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine
        .purchase_item(owner, pet.id, ItemId::new(4), 1, None)
        .await
        .unwrap();
    let used = f.engine.use_item(owner, pet.id, ItemId::new(4), None).await.unwrap();
    assert_eq!(used.remaining, 1);
}

#[tokio::test]
async fn test_task_completion_pays_the_shared_wallet() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    let task = f
        .engine
        .create_task(
            owner,
            pet_id,
            NewTaskRequest {
                title: "Go for a run".to_string(),
                difficulty: TaskDifficulty::Hard,
                assignees: vec![co],
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(task.currency_reward, 20);

    assert!(matches!(
        f.engine.complete_task(owner, pet_id, task.id, None).await,
        Err(EngineError::Forbidden(_))
    ));
    let done = f.engine.complete_task(co, pet_id, task.id, None).await.unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
    assert_eq!(done.currency_earned, 20);
    assert!(done.new_metrics.currency >= 120);

    assert!(matches!(
        f.engine.complete_task(co, pet_id, task.id, None).await,
        Err(EngineError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_recurring_task_stays_active_and_streaks() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let task = f
        .engine
        .create_task(
            owner,
            pet.id,
            NewTaskRequest {
                title: "Drink water".to_string(),
                recurrence: Recurrence::Daily,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let first = f.engine.complete_task(owner, pet.id, task.id, None).await.unwrap();
    let second = f.engine.complete_task(owner, pet.id, task.id, None).await.unwrap();
    assert_eq!(first.streak, 1);
    assert_eq!(second.streak, 2);
    assert_eq!(second.task.status, TaskStatus::Active);
    assert!(second.task.due_date.is_some());
}

#[tokio::test]
async fn test_task_reward_bounds_and_assignee_membership() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let stranger = user(&f, "mallory").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let too_rich = NewTaskRequest {
        title: "Win the lottery".to_string(),
        currency_reward: Some(5000),
        ..Default::default()
    };
    assert!(matches!(
        f.engine.create_task(owner, pet.id, too_rich, None).await,
        Err(EngineError::Validation(_))
    ));
    let with_stranger = NewTaskRequest {
        title: "Walk".to_string(),
        assignees: vec![stranger],
        ..Default::default()
    };
    assert!(matches!(
        f.engine.create_task(owner, pet.id, with_stranger, None).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn test_cancel_requires_creator_or_owner() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    let task = f
        .engine
        .create_task(
            owner,
            pet_id,
            NewTaskRequest {
                title: "Vacuum".to_string(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert!(matches!(
        f.engine.cancel_task(co, pet_id, task.id, None).await,
        Err(EngineError::Forbidden(_))
    ));
    let cancelled = f.engine.cancel_task(owner, pet_id, task.id, None).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    let active = f
        .engine
        .list_tasks(owner, pet_id, Some(TaskStatus::Active))
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_expire_tasks_marks_overdue() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let past = Utc::now() - chrono::Duration::hours(1);
    f.engine
        .create_task(
            owner,
            pet.id,
            NewTaskRequest {
                title: "Late".to_string(),
                due_date: Some(past),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(f.engine.expire_tasks(Utc::now()).await.unwrap(), 1);
    assert_eq!(f.engine.expire_tasks(Utc::now()).await.unwrap(), 0);
    let tasks = f.engine.list_tasks(owner, pet.id, None).await.unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Expired);
}

#[tokio::test]
async fn test_invitation_flow() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    let pet = f.engine.get_pet(co, pet_id).await.unwrap();
    assert_eq!(pet.owners.len(), 2);

    // Co-owners cannot invite.
    assert!(matches!(
        f.engine
            .invite(co, pet_id, "carol@example.com", OwnerRole::CoOwner, None)
            .await,
        Err(EngineError::Forbidden(_))
    ));
    // Existing members cannot be invited again.
    assert!(matches!(
        f.engine
            .invite(owner, pet_id, "bob@example.com", OwnerRole::CoOwner, None)
            .await,
        Err(EngineError::Conflict(_))
    ));
    f.engine
        .invite(owner, pet_id, "carol@example.com", OwnerRole::CoOwner, None)
        .await
        .unwrap();
    assert!(matches!(
        f.engine
            .invite(owner, pet_id, "Carol@example.com", OwnerRole::CoOwner, None)
            .await,
        Err(EngineError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_invitation_email_must_match() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let other = user(&f, "eve").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let invite = f
        .engine
        .invite(owner, pet.id, "bob@example.com", OwnerRole::CoOwner, None)
        .await
        .unwrap();
    assert!(matches!(
        f.engine.accept_invitation(other, &invite.token).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        f.engine.accept_invitation(other, "bogus").await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remove_and_leave() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    assert!(matches!(
        f.engine.remove_co_owner(co, pet_id, owner, None).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        f.engine.leave_pet(owner, pet_id).await,
        Err(EngineError::Forbidden(_))
    ));
    f.engine.remove_co_owner(owner, pet_id, co, None).await.unwrap();
    assert!(matches!(
        f.engine.get_pet(co, pet_id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_first_feed_unlocks_achievement_once() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine.feed(owner, pet.id, "catnip", None).await.unwrap();
    f.engine.feed(owner, pet.id, "catnip", None).await.unwrap();

    let statuses = f.engine.list_achievements(owner).await.unwrap();
    let first = statuses.iter().find(|s| s.achievement.id == 1).unwrap();
    assert!(first.unlocked);
    let rewards = f
        .engine
        .transactions(owner, pet.id, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::AchievementReward)
        .count();
    assert_eq!(rewards, 1);
}

#[tokio::test]
async fn test_chat_and_notifications() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    f.engine.post_message(owner, pet_id, "hello").await.unwrap();
    f.engine.post_message(co, pet_id, "hi!").await.unwrap();
    assert!(matches!(
        f.engine.post_message(co, pet_id, "   ").await,
        Err(EngineError::Validation(_))
    ));
    let messages = f.engine.list_messages(owner, pet_id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hello");

    // The owner was told about the accepted invitation.
    let unread = f.engine.list_notifications(owner, true, None).await.unwrap();
    assert!(!unread.is_empty());
    let read = f
        .engine
        .mark_notification_read(owner, unread[0].id)
        .await
        .unwrap();
    assert!(read.is_read);
    assert!(matches!(
        f.engine.mark_notification_read(co, unread[0].id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_decay_notifies_crossed_alerts() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let later = Utc::now() + chrono::Duration::hours(400);
    let report = f.engine.run_decay(later).await.unwrap();
    assert_eq!(report.pets_updated, 1);
    assert!(report.alerts_sent >= 2);

    let after = f.engine.get_pet(owner, pet.id).await.unwrap();
    assert_eq!(after.metrics.hunger, 90.0);
    let history = f.engine.metrics_history(owner, pet.id, Some(720)).await.unwrap();
    assert!(history.iter().any(|s| s.event_type == "decay"));
}

#[tokio::test]
async fn test_concurrent_feeds_never_lose_updates() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    let start = f.engine.get_pet(owner, pet_id).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let engine = f.engine.clone();
        let who = if i % 2 == 0 { owner } else { co };
        handles.push(tokio::spawn(async move {
            engine.interact(who, pet_id, Interaction::Pet, None).await
        }));
    }
    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    let end = f.engine.get_pet(owner, pet_id).await.unwrap();
    assert_eq!(end.times_petted, start.times_petted + ok);
    assert!(end.version > start.version);
}

#[tokio::test]
async fn test_publish_carries_committed_version() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let (client, mut rx) = f.engine.hub().connect(owner, false);
    f.engine.hub().join_room(&client, pet.id);
    while rx.try_recv().is_ok() {}

    let outcome = f.engine.feed(owner, pet.id, "milk-bowl", None).await.unwrap();
    let mut versions = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.kind == MessageType::PetMetricsUpdate {
            versions.push(event.version);
        }
    }
    assert_eq!(versions.first().copied().flatten(), Some(outcome.version));
    assert_eq!(f.engine.hub().published_version(pet.id), versions.last().copied().flatten());
}

#[tokio::test]
async fn test_purchase_past_stack_limit_is_rejected() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine
        .purchase_item(owner, pet.id, ItemId::new(6), 1, None)
        .await
        .unwrap();
    assert!(matches!(
        f.engine
            .purchase_item(owner, pet.id, ItemId::new(6), u32::MAX, None)
            .await,
        Err(EngineError::Validation(_))
    ));
    let after = f.engine.get_pet(owner, pet.id).await.unwrap();
    assert_eq!(after.metrics.currency, 70);
}

#[tokio::test]
async fn test_decay_unlocks_age_achievements() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let now = Utc::now();
    let mut record = f.repo.get_pet(pet.id).await.unwrap();
    record.created_at = now - chrono::Duration::days(8);
    f.repo.save_pet(record, 1).await.unwrap();

    let report = f.engine.run_decay(now + chrono::Duration::hours(1)).await.unwrap();
    assert_eq!(report.achievements_unlocked, 1);
    let statuses = f.engine.list_achievements(owner).await.unwrap();
    let unlocked: Vec<&str> = statuses
        .iter()
        .filter(|s| s.unlocked)
        .map(|s| s.achievement.name)
        .collect();
    assert_eq!(unlocked, vec!["Week One"]);

    let again = f.engine.run_decay(now + chrono::Duration::hours(2)).await.unwrap();
    assert_eq!(again.achievements_unlocked, 0);
}

#[tokio::test]
async fn test_unpaid_achievement_is_released_and_retried() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let mut record = f.repo.get_pet(pet.id).await.unwrap();
    record.ownership_mut(owner).unwrap().stats.total_feeds = 1;
    f.repo.save_pet(record, 1).await.unwrap();

    f.repo.fail_next_saves(GameConfig::default().max_save_attempts as usize);
    assert!(f.engine.evaluate_achievements(owner, pet.id).await.is_empty());
    let statuses = f.engine.list_achievements(owner).await.unwrap();
    assert!(statuses.iter().all(|s| !s.unlocked));

    let unlocked = f.engine.evaluate_achievements(owner, pet.id).await;
    assert_eq!(unlocked.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
    let after = f.engine.get_pet(owner, pet.id).await.unwrap();
    assert_eq!(after.metrics.currency, 110);
}

#[tokio::test]
async fn test_assign_task_notifies_new_assignees() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    let stranger = user(&f, "mallory").await;
    let task = f
        .engine
        .create_task(
            owner,
            pet_id,
            NewTaskRequest {
                title: "Water the plants".to_string(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let assigned = f
        .engine
        .assign_task(owner, pet_id, task.id, vec![co, co], None)
        .await
        .unwrap();
    assert_eq!(assigned.assignees, vec![co]);
    let inbox = f.engine.list_notifications(co, true, None).await.unwrap();
    assert!(inbox.iter().any(|n| n.kind == NotificationKind::TaskAssigned));

    assert!(matches!(
        f.engine
            .assign_task(owner, pet_id, task.id, vec![stranger], None)
            .await,
        Err(EngineError::Validation(_))
    ));
    f.engine.cancel_task(owner, pet_id, task.id, None).await.unwrap();
    assert!(matches!(
        f.engine.assign_task(owner, pet_id, task.id, vec![owner], None).await,
        Err(EngineError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_decline_and_list_invitations() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let carol = user(&f, "carol").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let invite = f
        .engine
        .invite(owner, pet.id, "carol@example.com", OwnerRole::CoOwner, None)
        .await
        .unwrap();

    let listed = f.engine.list_invitations(owner, pet.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, InvitationStatus::Pending);
    assert!(matches!(
        f.engine.list_invitations(carol, pet.id).await,
        Err(EngineError::NotFound(_))
    ));

    let declined = f.engine.decline_invitation(carol, &invite.token).await.unwrap();
    assert_eq!(declined.status, InvitationStatus::Declined);
    assert!(declined.responded_at.is_some());
    assert!(f.engine.accept_invitation(carol, &invite.token).await.is_err());
    assert!(f.engine.decline_invitation(carol, &invite.token).await.is_err());

    // A declined invitation does not block a fresh one.
    f.engine
        .invite(owner, pet.id, "carol@example.com", OwnerRole::CoOwner, None)
        .await
        .unwrap();
    assert_eq!(f.engine.list_invitations(owner, pet.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invite_respects_owner_limit() {
    let f = fixture_with(GameConfig {
        max_owners_per_pet: 2,
        ..GameConfig::default()
    });
    let (owner, _co, pet_id) = shared_pet(&f).await;
    assert!(matches!(
        f.engine
            .invite(owner, pet_id, "carol@example.com", OwnerRole::CoOwner, None)
            .await,
        Err(EngineError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_activity_is_newest_first() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let stranger = user(&f, "mallory").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine.feed(owner, pet.id, "catnip", None).await.unwrap();
    f.engine.interact(owner, pet.id, Interaction::Pet, None).await.unwrap();

    let entries = f.engine.activity(owner, pet.id, Some(2)).await.unwrap();
    let kinds: Vec<&str> = entries.iter().map(|e| e.activity_type.as_str()).collect();
    assert_eq!(kinds, vec!["pet", "fed"]);
    assert!(entries.iter().all(|e| e.user_id == owner));
    assert!(matches!(
        f.engine.activity(stranger, pet.id, None).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_run_maintenance_expires_and_sweeps() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    f.engine
        .create_task(
            owner,
            pet.id,
            NewTaskRequest {
                title: "Late".to_string(),
                due_date: Some(Utc::now() + chrono::Duration::minutes(1)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let (_interactive, _rx) = f.engine.hub().connect(owner, false);
    let (passive, _events) = f.engine.hub().connect(owner, true);

    let report = f
        .engine
        .run_maintenance(Utc::now() + chrono::Duration::minutes(5))
        .await;
    assert_eq!(report.decay.pets_processed, 1);
    assert_eq!(report.decay.pets_updated, 1);
    assert_eq!(report.tasks_expired, 1);
    assert_eq!(report.clients_swept, 1);
    assert_eq!(f.engine.hub().user_clients(owner), vec![passive]);
}

#[tokio::test]
async fn test_join_pet_room_requires_membership() {
    let f = fixture();
    let (owner, co, pet_id) = shared_pet(&f).await;
    let stranger = user(&f, "mallory").await;
    let hub = f.engine.hub().clone();

    let (outsider, _rx) = hub.connect(stranger, false);
    assert!(matches!(
        f.engine.join_pet_room(&outsider, stranger, pet_id).await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(hub.room_of(&outsider), None);

    let (member, mut rx) = hub.connect(co, false);
    f.engine.join_pet_room(&member, co, pet_id).await.unwrap();
    assert_eq!(hub.room_of(&member), Some(pet_id));
    let mut snapshots = 0;
    while let Ok(event) = rx.try_recv() {
        if event.kind == MessageType::PetMetricsUpdate {
            snapshots += 1;
        }
    }
    assert_eq!(snapshots, 1);

    f.engine.remove_co_owner(owner, pet_id, co, None).await.unwrap();
    assert_eq!(hub.room_of(&member), None);
    assert!(f.engine.join_pet_room(&member, co, pet_id).await.is_err());
    assert_eq!(hub.room_of(&member), None);
}

#[tokio::test]
async fn test_recurring_task_at_calendar_end_completes() {
    let f = fixture();
    let owner = user(&f, "alice").await;
    let pet = f.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let task = f
        .engine
        .create_task(
            owner,
            pet.id,
            NewTaskRequest {
                title: "Forever".to_string(),
                recurrence: Recurrence::Daily,
                due_date: Some(DateTime::<Utc>::MAX_UTC),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let done = f.engine.complete_task(owner, pet.id, task.id, None).await.unwrap();
    assert_eq!(done.task.due_date, None);
    assert_eq!(done.task.status, TaskStatus::Active);

    let greedy = NewTaskRequest {
        title: "Level me up".to_string(),
        experience_reward: Some(u64::MAX),
        ..Default::default()
    };
    assert!(matches!(
        f.engine.create_task(owner, pet.id, greedy, None).await,
        Err(EngineError::Validation(_))
    ));
}
