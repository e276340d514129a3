use crate::{dao::models::PollEntity, error::ServiceError};

/// Lifecycle phase of a poll, derived from its persisted record.
///
/// `Terminated` has no representation here: a terminated poll has no record,
/// so it surfaces as `NotFound` before any phase check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Gathering participants and nominations; voting not yet started.
    Lobby,
    /// Ballots are being collected; the tally has not been computed.
    Voting,
    /// The tally has been published; the record is read-only.
    Closed,
}

impl PollPhase {
    /// Derive the phase from the record's `has_started` / `results` fields.
    pub fn of(poll: &PollEntity) -> Self {
        if !poll.has_started {
            PollPhase::Lobby
        } else if poll.results.is_empty() {
            PollPhase::Voting
        } else {
            PollPhase::Closed
        }
    }
}

/// Reject the action unless the poll is still in the lobby.
pub fn ensure_lobby(poll: &PollEntity) -> Result<(), ServiceError> {
    match PollPhase::of(poll) {
        PollPhase::Lobby => Ok(()),
        phase => Err(ServiceError::PhaseConflict(format!(
            "action only allowed before voting starts (phase is {phase:?})"
        ))),
    }
}

/// Reject the action unless ballots are currently being collected.
pub fn ensure_voting(poll: &PollEntity) -> Result<(), ServiceError> {
    match PollPhase::of(poll) {
        PollPhase::Voting => Ok(()),
        PollPhase::Lobby => Err(ServiceError::PhaseConflict(
            "voting has not started yet".into(),
        )),
        PollPhase::Closed => Err(ServiceError::PhaseConflict(
            "voting is already closed".into(),
        )),
    }
}

/// Reject the action unless the caller is the poll admin.
pub fn ensure_admin(poll: &PollEntity, participant_id: &str) -> Result<(), ServiceError> {
    if poll.admin_id == participant_id {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "only the poll admin may perform this action".into(),
        ))
    }
}

/// Reject the action unless the caller is a current participant of the poll.
pub fn ensure_participant(poll: &PollEntity, participant_id: &str) -> Result<(), ServiceError> {
    if poll.participants.contains_key(participant_id) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "caller is not a participant of this poll".into(),
        ))
    }
}
