use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

#[derive(Clone)]
/// Handle used to push frames to one connected participant.
pub struct ClientConnection {
    /// Identifier of this connection (one participant may hold several).
    pub id: Uuid,
    /// Participant the connection authenticated as.
    pub participant_id: String,
    /// Writer-task channel for outbound frames.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Per-poll connection set plus the gate serializing that poll's mutations.
///
/// The gate is held across the whole read-modify-broadcast sequence, store
/// awaits included, so two operations on the same poll can never interleave.
/// Operations on different polls never contend.
pub struct PollRoom {
    gate: Mutex<()>,
    connections: DashMap<Uuid, ClientConnection>,
}

impl PollRoom {
    fn new() -> Self {
        Self {
            gate: Mutex::new(()),
            connections: DashMap::new(),
        }
    }

    /// Critical-section gate for this poll.
    pub fn gate(&self) -> &Mutex<()> {
        &self.gate
    }

    /// Register a connection as a subscriber of this poll.
    pub fn insert(&self, connection: ClientConnection) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove one connection.
    pub fn remove(&self, connection_id: Uuid) {
        self.connections.remove(&connection_id);
    }

    /// Whether any connection is still subscribed.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of every subscriber's outbound channel.
    pub fn senders(&self) -> Vec<mpsc::UnboundedSender<Message>> {
        self.connections
            .iter()
            .map(|entry| entry.tx.clone())
            .collect()
    }

    /// All connections authenticated as the given participant.
    pub fn connections_of(&self, participant_id: &str) -> Vec<ClientConnection> {
        self.connections
            .iter()
            .filter(|entry| entry.participant_id == participant_id)
            .map(|entry| entry.clone())
            .collect()
    }
}

/// Registry of live rooms keyed by poll id.
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<PollRoom>>,
}

impl RoomRegistry {
    pub(crate) fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Room for `poll_id`, created on first use.
    pub fn room(&self, poll_id: &str) -> Arc<PollRoom> {
        self.rooms
            .entry(poll_id.to_owned())
            .or_insert_with(|| Arc::new(PollRoom::new()))
            .clone()
    }

    /// Room for `poll_id` if one is live.
    pub fn get(&self, poll_id: &str) -> Option<Arc<PollRoom>> {
        self.rooms.get(poll_id).map(|entry| entry.clone())
    }

    /// Drop the room entry entirely (poll cancelled or deleted).
    pub fn drop_room(&self, poll_id: &str) {
        self.rooms.remove(poll_id);
    }

    /// Remove one connection, reaping the room once nothing references it.
    ///
    /// The entry is only removed when the registry holds the last `Arc`: an
    /// in-flight operation still holding the room (and its gate) keeps the
    /// entry alive, so a racing subscriber can never end up on a second gate
    /// for the same poll.
    pub fn unsubscribe(&self, poll_id: &str, connection_id: Uuid) {
        if let Some(room) = self.get(poll_id) {
            room.remove(connection_id);
        }
        self.rooms
            .remove_if(poll_id, |_, room| room.is_empty() && Arc::strong_count(room) == 1);
    }
}
