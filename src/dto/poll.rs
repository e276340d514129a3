use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{PollEntity, ResultEntryEntity},
    dto::{format_system_time, validation::validate_poll_code},
};

/// Payload used to open a brand-new poll.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    /// Question the participants will vote on.
    #[validate(length(min = 1, max = 100, message = "topic must be 1 to 100 characters"))]
    pub topic: String,
    /// How many ranked choices each ballot may carry.
    #[validate(range(min = 1, max = 5))]
    pub votes_per_voter: usize,
    /// Display name of the creator, who becomes the poll admin.
    #[validate(length(min = 1, max = 25, message = "name must be 1 to 25 characters"))]
    pub name: String,
}

/// Payload used to request access to an existing poll.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinPollRequest {
    /// Shareable code of the poll to join.
    #[validate(custom(function = validate_poll_code))]
    pub poll_id: String,
    /// Display name of the joining participant.
    #[validate(length(min = 1, max = 25, message = "name must be 1 to 25 characters"))]
    pub name: String,
}

/// Public projection of a nomination.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NominationView {
    /// Participant that proposed the option.
    pub user_id: String,
    /// Free text of the option.
    pub text: String,
}

/// One entry of the published tally.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntryView {
    /// Identifier of the scored nomination.
    pub nomination_id: String,
    /// Text of the nomination at tally time.
    pub nomination_text: String,
    /// Total positional score across all ballots.
    pub score: i64,
}

impl From<&ResultEntryEntity> for ResultEntryView {
    fn from(entry: &ResultEntryEntity) -> Self {
        Self {
            nomination_id: entry.nomination_id.clone(),
            nomination_text: entry.nomination_text.clone(),
            score: entry.score,
        }
    }
}

/// Poll snapshot exposed to clients over REST and WebSocket broadcasts.
///
/// Individual ballots never leave the server: voting progress is published as
/// a counter and the tally only appears once the poll is closed.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    /// Shareable poll code.
    pub id: String,
    /// Question being voted on.
    pub topic: String,
    /// Ballot size cap.
    pub votes_per_voter: usize,
    /// Identifier of the poll admin.
    pub admin_id: String,
    /// Participant id -> display name.
    #[schema(value_type = std::collections::HashMap<String, String>)]
    pub participants: IndexMap<String, String>,
    /// Nomination id -> nomination, in submission order.
    #[schema(value_type = std::collections::HashMap<String, NominationView>)]
    pub nominations: IndexMap<String, NominationView>,
    /// Number of participants whose ballot has been stored.
    pub ballots_submitted: usize,
    /// Aggregate tally, present once the poll is closed.
    pub results: Vec<ResultEntryView>,
    /// Whether voting has started.
    pub has_started: bool,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Absolute expiry timestamp (RFC 3339).
    pub expires_at: String,
}

impl From<&PollEntity> for PollSnapshot {
    fn from(poll: &PollEntity) -> Self {
        Self {
            id: poll.id.clone(),
            topic: poll.topic.clone(),
            votes_per_voter: poll.votes_per_voter,
            admin_id: poll.admin_id.clone(),
            participants: poll.participants.clone(),
            nominations: poll
                .nominations
                .iter()
                .map(|(id, nomination)| {
                    (
                        id.clone(),
                        NominationView {
                            user_id: nomination.user_id.clone(),
                            text: nomination.text.clone(),
                        },
                    )
                })
                .collect(),
            ballots_submitted: poll.rankings.len(),
            results: poll.results.iter().map(ResultEntryView::from).collect(),
            has_started: poll.has_started,
            created_at: format_system_time(poll.created_at),
            expires_at: format_system_time(poll.expires_at),
        }
    }
}

/// Response for poll creation and joining: the snapshot plus a bearer token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollAccessResponse {
    /// Current canonical snapshot of the poll.
    pub poll: PollSnapshot,
    /// Opaque bearer token presented on the WebSocket `join` frame.
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn snapshot_redacts_ballots() {
        let mut poll = PollEntity::new(
            "AB12CD".into(),
            "lunch".into(),
            2,
            "admin".into(),
            Duration::from_secs(60),
        );
        poll.rankings.insert("u1".into(), vec!["n1".into()]);
        poll.rankings.insert("u2".into(), vec!["n2".into()]);

        let snapshot = PollSnapshot::from(&poll);
        let encoded = serde_json::to_string(&snapshot).unwrap();

        assert_eq!(snapshot.ballots_submitted, 2);
        assert!(!encoded.contains("rankings"));
        assert!(encoded.contains("\"ballotsSubmitted\":2"));
    }
}
