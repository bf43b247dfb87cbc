//! Connection manager for realtime clients and per-pet rooms.
//!
//! Each connected client owns an unbounded outbound queue; the transport task
//! (WebSocket or SSE) drains it. All bookkeeping sits behind one
//! `parking_lot::RwLock`, and senders are cloned out of the lock before
//! delivery so no send ever happens while the lock is held.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::messages::{MessageType, ServerEvent};
use crate::api::{ClientId, PetId, UserId};

pub type Outbound = mpsc::UnboundedSender<ServerEvent>;
pub type Inbound = mpsc::UnboundedReceiver<ServerEvent>;

/// Default time without a heartbeat before an interactive client is dropped.
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: i64 = 60;

struct ClientEntry {
    user_id: UserId,
    sender: Outbound,
    connected_at: DateTime<Utc>,
    last_heartbeat: DateTime<Utc>,
    room: Option<PetId>,
    /// SSE subscribers cannot send heartbeats and are never swept.
    passive: bool,
}

#[derive(Default)]
struct HubState {
    clients: HashMap<ClientId, ClientEntry>,
    rooms: HashMap<PetId, HashSet<ClientId>>,
    /// Highest pet version published per pet.
    published: HashMap<PetId, u64>,
}

impl HubState {
    fn leave(&mut self, client_id: &str) -> Option<PetId> {
        let pet_id = self.clients.get_mut(client_id)?.room.take()?;
        if let Some(members) = self.rooms.get_mut(&pet_id) {
            members.remove(client_id);
            if members.is_empty() {
                self.rooms.remove(&pet_id);
            }
        }
        Some(pet_id)
    }

    fn room_targets(&self, pet_id: PetId, exclude: &[&str]) -> Vec<(ClientId, Outbound)> {
        self.rooms
            .get(&pet_id)
            .into_iter()
            .flatten()
            .filter(|id| !exclude.contains(&id.as_str()))
            .filter_map(|id| self.clients.get(id).map(|c| (id.clone(), c.sender.clone())))
            .collect()
    }
}

/// Point-in-time counters for status endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HubStats {
    pub clients: usize,
    pub users: usize,
    pub rooms: usize,
}

pub struct ConnectionManager {
    state: RwLock<HubState>,
    heartbeat_timeout: Duration,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_HEARTBEAT_TIMEOUT_SECS))
    }
}

impl ConnectionManager {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(HubState::default()),
            heartbeat_timeout,
        }
    }

    /// Register a client and send it a `connect` event.
    pub fn connect(&self, user_id: UserId, passive: bool) -> (ClientId, Inbound) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.state.write().clients.insert(
            client_id.clone(),
            ClientEntry {
                user_id,
                sender: tx,
                connected_at: now,
                last_heartbeat: now,
                room: None,
                passive,
            },
        );
        info!(client_id = %client_id, user_id = %user_id, passive, "Realtime client connected");
        self.send_to_client(
            &client_id,
            ServerEvent::new(
                MessageType::Connect,
                serde_json::json!({ "client_id": client_id, "user_id": user_id }),
            ),
        );
        (client_id, rx)
    }

    /// Remove a client, leaving its room. Returns the owner and the room it was in.
    pub fn disconnect(&self, client_id: &str) -> Option<(UserId, Option<PetId>)> {
        let (user_id, room) = {
            let mut state = self.state.write();
            let room = state.leave(client_id);
            let entry = state.clients.remove(client_id)?;
            (entry.user_id, room)
        };
        info!(client_id = %client_id, user_id = %user_id, "Realtime client disconnected");
        if let Some(pet_id) = room {
            self.notify_presence(MessageType::UserLeft, pet_id, user_id, client_id);
        }
        Some((user_id, room))
    }

    /// Drop every client and room. Closing the outbound queues ends the
    /// transport tasks draining them, so open streams finish on shutdown.
    pub fn disconnect_all(&self) -> usize {
        let dropped = {
            let mut state = self.state.write();
            state.rooms.clear();
            state.clients.drain().count()
        };
        if dropped > 0 {
            info!(count = dropped, "Disconnected all realtime clients");
        }
        dropped
    }

    /// Move a client into `pet_id`'s room, leaving any previous room first.
    ///
    /// Membership must be checked by the caller.
    pub fn join_room(&self, client_id: &str, pet_id: PetId) -> bool {
        let (user_id, previous) = {
            let mut state = self.state.write();
            let Some(user_id) = state.clients.get(client_id).map(|c| c.user_id) else {
                return false;
            };
            let previous = state.leave(client_id);
            if let Some(entry) = state.clients.get_mut(client_id) {
                entry.room = Some(pet_id);
            }
            state
                .rooms
                .entry(pet_id)
                .or_default()
                .insert(client_id.to_string());
            (user_id, previous)
        };
        if let Some(old) = previous.filter(|old| *old != pet_id) {
            self.notify_presence(MessageType::UserLeft, old, user_id, client_id);
        }
        debug!(client_id = %client_id, pet_id = %pet_id, "Client joined pet room");
        self.notify_presence(MessageType::UserJoined, pet_id, user_id, client_id);
        true
    }

    pub fn leave_room(&self, client_id: &str) -> Option<PetId> {
        let (user_id, pet_id) = {
            let mut state = self.state.write();
            let user_id = state.clients.get(client_id)?.user_id;
            (user_id, state.leave(client_id)?)
        };
        self.notify_presence(MessageType::UserLeft, pet_id, user_id, client_id);
        Some(pet_id)
    }

    fn notify_presence(&self, kind: MessageType, pet_id: PetId, user_id: UserId, client_id: &str) {
        let event = ServerEvent::new(
            kind,
            serde_json::json!({ "pet_id": pet_id, "user_id": user_id }),
        );
        self.broadcast_to_pet(pet_id, event, &[client_id]);
    }

    /// Deliver to pre-collected targets, dropping clients whose queue is closed.
    fn deliver(&self, targets: Vec<(ClientId, Outbound)>, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (client_id, sender) in targets {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(client_id);
            }
        }
        for client_id in dead {
            debug!(client_id = %client_id, "Dropping client with closed channel");
            self.disconnect(&client_id);
        }
        delivered
    }

    pub fn send_to_client(&self, client_id: &str, event: ServerEvent) -> bool {
        let target = self
            .state
            .read()
            .clients
            .get(client_id)
            .map(|c| (client_id.to_string(), c.sender.clone()));
        match target {
            Some(target) => self.deliver(vec![target], &event) == 1,
            None => false,
        }
    }

    /// Send to every connection of `user_id`.
    pub fn send_to_user(&self, user_id: UserId, event: ServerEvent) -> usize {
        let targets: Vec<_> = self
            .state
            .read()
            .clients
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .map(|(id, c)| (id.clone(), c.sender.clone()))
            .collect();
        self.deliver(targets, &event)
    }

    pub fn broadcast(&self, event: ServerEvent) -> usize {
        let targets: Vec<_> = self
            .state
            .read()
            .clients
            .iter()
            .map(|(id, c)| (id.clone(), c.sender.clone()))
            .collect();
        self.deliver(targets, &event)
    }

    pub fn broadcast_to_pet(&self, pet_id: PetId, event: ServerEvent, exclude: &[&str]) -> usize {
        let targets = self.state.read().room_targets(pet_id, exclude);
        self.deliver(targets, &event)
    }

    /// Push a full metrics snapshot for a committed pet version.
    ///
    /// Snapshots arrive from concurrent request tasks and may be out of order;
    /// anything not newer than the last published version for the pet is
    /// dropped so clients never move backwards. Returns whether it was sent.
    pub fn publish_pet_state(&self, pet_id: PetId, version: u64, snapshot: serde_json::Value) -> bool {
        let targets = {
            let mut state = self.state.write();
            let last = state.published.entry(pet_id).or_insert(0);
            if version <= *last {
                debug!(pet_id = %pet_id, version, last = *last, "Dropping stale pet snapshot");
                return false;
            }
            *last = version;
            state.room_targets(pet_id, &[])
        };
        let event = ServerEvent::for_pet(MessageType::PetMetricsUpdate, pet_id, version, snapshot);
        self.deliver(targets, &event);
        true
    }

    /// Last version published for a pet.
    pub fn published_version(&self, pet_id: PetId) -> Option<u64> {
        self.state.read().published.get(&pet_id).copied()
    }

    /// Record a heartbeat and echo one back.
    pub fn heartbeat(&self, client_id: &str) -> bool {
        {
            let mut state = self.state.write();
            match state.clients.get_mut(client_id) {
                Some(entry) => entry.last_heartbeat = Utc::now(),
                None => return false,
            }
        }
        self.send_to_client(
            client_id,
            ServerEvent::new(MessageType::Heartbeat, serde_json::json!({ "status": "alive" })),
        )
    }

    /// Disconnect interactive clients silent for longer than the timeout.
    pub fn sweep_stale(&self, now: DateTime<Utc>) -> Vec<ClientId> {
        let stale: Vec<ClientId> = self
            .state
            .read()
            .clients
            .iter()
            .filter(|(_, c)| !c.passive && now - c.last_heartbeat > self.heartbeat_timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for client_id in &stale {
            self.send_to_client(
                client_id,
                ServerEvent::new(
                    MessageType::Disconnect,
                    serde_json::json!({ "reason": "heartbeat timeout" }),
                ),
            );
            self.disconnect(client_id);
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "Swept stale realtime clients");
        }
        stale
    }

    /// Remove all of `user_id`'s connections from `pet_id`'s room. The
    /// connections stay open.
    pub fn kick_user_from_room(&self, user_id: UserId, pet_id: PetId) -> usize {
        let client_ids: Vec<ClientId> = self
            .state
            .read()
            .clients
            .iter()
            .filter(|(_, c)| c.user_id == user_id && c.room == Some(pet_id))
            .map(|(id, _)| id.clone())
            .collect();
        for client_id in &client_ids {
            self.leave_room(client_id);
        }
        client_ids.len()
    }

    pub fn client_count(&self) -> usize {
        self.state.read().clients.len()
    }

    pub fn room_size(&self, pet_id: PetId) -> usize {
        self.state.read().rooms.get(&pet_id).map_or(0, HashSet::len)
    }

    pub fn room_of(&self, client_id: &str) -> Option<PetId> {
        self.state.read().clients.get(client_id)?.room
    }

    pub fn user_of(&self, client_id: &str) -> Option<UserId> {
        self.state.read().clients.get(client_id).map(|c| c.user_id)
    }

    pub fn user_clients(&self, user_id: UserId) -> Vec<ClientId> {
        self.state
            .read()
            .clients
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Distinct users currently in a pet room.
    pub fn online_users(&self, pet_id: PetId) -> Vec<UserId> {
        let state = self.state.read();
        let mut users: Vec<UserId> = state
            .rooms
            .get(&pet_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.clients.get(id).map(|c| c.user_id))
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Seconds since the client connected.
    pub fn connection_age(&self, client_id: &str, now: DateTime<Utc>) -> Option<i64> {
        self.state
            .read()
            .clients
            .get(client_id)
            .map(|c| (now - c.connected_at).num_seconds())
    }

    pub fn stats(&self) -> HubStats {
        let state = self.state.read();
        let users: HashSet<UserId> = state.clients.values().map(|c| c.user_id).collect();
        HubStats {
            clients: state.clients.len(),
            users: users.len(),
            rooms: state.rooms.len(),
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
