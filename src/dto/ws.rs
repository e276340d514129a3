use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dto::poll::PollSnapshot, error::ServiceError};

/// Messages accepted from poll WebSocket clients.
///
/// The first frame on a fresh connection must be `join` carrying the bearer
/// token issued over REST; everything else is rejected until then.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the connection and subscribe to the poll.
    Join {
        /// Bearer token from `POST /polls` or `POST /polls/join`.
        token: String,
    },
    /// Propose a nomination during the lobby phase.
    Nominate {
        /// Free text of the option.
        text: String,
    },
    /// Withdraw a nomination (author or admin).
    RemoveNomination {
        /// Identifier of the nomination to remove.
        id: String,
    },
    /// Kick a participant (admin only).
    RemoveParticipant {
        /// Identifier of the participant to remove.
        id: String,
    },
    /// Transition the poll from lobby to voting (admin only).
    StartVote,
    /// Submit or overwrite the caller's ballot.
    SubmitRankings {
        /// Ordered nomination ids, best first.
        rankings: Vec<String>,
    },
    /// Close voting and publish the tally (admin only).
    ClosePoll,
    /// Tear the poll down (admin only).
    CancelPoll,
    /// Leave the poll; the admin leaving cancels it.
    Leave,
    /// Any unrecognized message type.
    #[serde(other)]
    Unknown,
}

/// Messages pushed to poll WebSocket clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Canonical snapshot, broadcast after every successful mutation.
    PollUpdated {
        /// The updated poll.
        poll: PollSnapshot,
    },
    /// The poll was torn down; a close frame follows.
    PollCancelled,
    /// A rejected action, sent only to the originating connection.
    Error {
        /// Rejection details.
        error: ErrorBody,
    },
}

/// Payload of a rejection frame.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable tag (e.g. `phase_conflict`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl ServerMessage {
    /// Build a rejection frame from a service error.
    pub fn error(err: &ServiceError) -> Self {
        ServerMessage::Error {
            error: ErrorBody {
                kind: err.kind().to_owned(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_decode_by_type_tag() {
        let frame: ClientMessage =
            serde_json::from_str(r#"{"type":"nominate","text":"tacos"}"#).unwrap();
        assert!(matches!(frame, ClientMessage::Nominate { text } if text == "tacos"));

        let frame: ClientMessage =
            serde_json::from_str(r#"{"type":"submit_rankings","rankings":["a","b"]}"#).unwrap();
        assert!(matches!(frame, ClientMessage::SubmitRankings { rankings } if rankings.len() == 2));

        let frame: ClientMessage = serde_json::from_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(frame, ClientMessage::Unknown));
    }

    #[test]
    fn error_frames_carry_kind_and_message() {
        let message = ServerMessage::error(&ServiceError::PhaseConflict("too late".into()));
        let encoded = serde_json::to_string(&message).unwrap();
        assert!(encoded.contains(r#""type":"error""#));
        assert!(encoded.contains(r#""type":"phase_conflict""#));
        assert!(encoded.contains("too late"));
    }
}
