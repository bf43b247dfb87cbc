//! Shared pets under concurrent owners, observed through the realtime hub.

use std::sync::Arc;

use purretys::api::{PetId, UserId};
use purretys::config::GameConfig;
use purretys::db::{LocalRepository, UserRepository};
use purretys::models::{NewUser, OwnerRole};
use purretys::realtime::{ConnectionManager, MessageType};
use purretys::services::{EngineError, Interaction, PetEngine};

struct World {
    engine: PetEngine,
    repo: Arc<LocalRepository>,
}

fn world(max_save_attempts: u32) -> World {
    let repo = Arc::new(LocalRepository::new());
    let config = GameConfig {
        max_save_attempts,
        ..GameConfig::default()
    };
    let engine = PetEngine::new(repo.clone(), Arc::new(ConnectionManager::default()), config);
    World { engine, repo }
}

async fn user(w: &World, name: &str) -> UserId {
    w.repo
        .insert_user(NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            password_hash: "unused".to_string(),
            display_name: None,
        })
        .await
        .unwrap()
        .id
}

async fn household(w: &World, co_owners: usize) -> (Vec<UserId>, PetId) {
    let owner = user(w, "owner").await;
    let pet = w.engine.create_pet(owner, "Mochi", None, None).await.unwrap();
    let mut members = vec![owner];
    for i in 0..co_owners {
        let name = format!("co{i}");
        let id = user(w, &name).await;
        let invite = w
            .engine
            .invite(owner, pet.id, &format!("{name}@example.com"), OwnerRole::CoOwner, None)
            .await
            .unwrap();
        w.engine.accept_invitation(id, &invite.token).await.unwrap();
        members.push(id);
    }
    (members, pet.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_concurrent_petting_is_counted() {
    let w = world(64);
    let (members, pet_id) = household(&w, 3).await;
    let start = w.engine.get_pet(members[0], pet_id).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..24 {
        let engine = w.engine.clone();
        let who = members[i % members.len()];
        handles.push(tokio::spawn(async move {
            engine.interact(who, pet_id, Interaction::Pet, None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let end = w.engine.get_pet(members[0], pet_id).await.unwrap();
    assert_eq!(end.times_petted, start.times_petted + 24);
    assert!(end.version >= start.version + 24);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_room_sees_monotonic_versions() {
    let w = world(64);
    let (members, pet_id) = household(&w, 1).await;
    let hub = w.engine.hub().clone();
    let (watcher, mut events) = hub.connect(members[1], false);
    hub.join_room(&watcher, pet_id);

    let mut handles = Vec::new();
    for i in 0..12 {
        let engine = w.engine.clone();
        let who = members[i % 2];
        handles.push(tokio::spawn(async move {
            engine.interact(who, pet_id, Interaction::Pet, None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut last = 0;
    let mut updates = 0;
    while let Ok(event) = events.try_recv() {
        if event.kind != MessageType::PetMetricsUpdate {
            continue;
        }
        let version = event.version.unwrap();
        assert!(version > last, "version went from {last} to {version}");
        last = version;
        updates += 1;
    }
    assert!(updates >= 1);
    let current = w.engine.get_pet(members[0], pet_id).await.unwrap();
    assert_eq!(hub.published_version(pet_id), Some(current.version));
}

#[tokio::test]
async fn test_stale_writer_gets_current_version() {
    let w = world(4);
    let (members, pet_id) = household(&w, 1).await;
    let seen = w.engine.get_pet(members[1], pet_id).await.unwrap().version;

    w.engine
        .interact(members[0], pet_id, Interaction::Pet, Some(seen))
        .await
        .unwrap();
    let err = w
        .engine
        .interact(members[1], pet_id, Interaction::Pet, Some(seen))
        .await
        .unwrap_err();
    let current = w.engine.get_pet(members[0], pet_id).await.unwrap().version;
    match err {
        EngineError::VersionConflict { current: reported } => assert_eq!(reported, current),
        other => panic!("expected version conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_removed_co_owner_is_kicked_from_room() {
    let w = world(4);
    let (members, pet_id) = household(&w, 1).await;
    let hub = w.engine.hub().clone();
    let (client, mut events) = hub.connect(members[1], false);
    hub.join_room(&client, pet_id);

    w.engine
        .remove_co_owner(members[0], pet_id, members[1], None)
        .await
        .unwrap();
    assert_eq!(hub.room_of(&client), None);
    let mut saw_removal = false;
    while let Ok(event) = events.try_recv() {
        if event.kind == MessageType::OwnerRemoved {
            saw_removal = true;
        }
    }
    assert!(saw_removal);
    assert!(matches!(
        w.engine.get_pet(members[1], pet_id).await,
        Err(EngineError::NotFound(_))
    ));
}
