use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{
    dao::models::PollEntity,
    dto::{poll::PollSnapshot, ws::ServerMessage},
    error::ServiceError,
    state::SharedState,
};

/// Serialize a server message into a WebSocket text frame.
fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize server message `{message:?}`");
            None
        }
    }
}

/// Broadcast the canonical snapshot to every subscriber of the poll.
///
/// Callers hold the poll gate while this runs, so subscribers of one poll
/// observe snapshots in commit order.
pub fn broadcast_poll_updated(state: &SharedState, poll: &PollEntity) {
    let message = ServerMessage::PollUpdated {
        poll: PollSnapshot::from(poll),
    };
    let Some(room) = state.rooms().get(&poll.id) else {
        return;
    };
    let Some(frame) = encode(&message) else {
        return;
    };
    for tx in room.senders() {
        let _ = tx.send(frame.clone());
    }
}

/// Broadcast the termination frame, close every subscriber, and drop the room.
pub fn broadcast_poll_cancelled(state: &SharedState, poll_id: &str) {
    if let Some(room) = state.rooms().get(poll_id) {
        let frame = encode(&ServerMessage::PollCancelled);
        for tx in room.senders() {
            if let Some(frame) = frame.as_ref() {
                let _ = tx.send(frame.clone());
            }
            let _ = tx.send(Message::Close(None));
        }
    }
    state.rooms().drop_room(poll_id);
}

/// Force-disconnect every connection of a kicked participant.
pub fn disconnect_participant(state: &SharedState, poll_id: &str, participant_id: &str) {
    let Some(room) = state.rooms().get(poll_id) else {
        return;
    };
    for connection in room.connections_of(participant_id) {
        let _ = connection.tx.send(Message::Close(None));
        room.remove(connection.id);
    }
}

/// Send a rejection frame to one connection only; errors are never broadcast.
pub fn send_error(tx: &mpsc::UnboundedSender<Message>, err: &ServiceError) {
    if let Some(frame) = encode(&ServerMessage::error(err)) {
        let _ = tx.send(frame);
    }
}
