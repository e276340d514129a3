use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Nomination id -> nomination, in submission order.
///
/// Submission order is load-bearing: it is the tie-break of the final tally,
/// so the map type must preserve insertion order end to end.
pub type NominationMap = IndexMap<String, NominationEntity>;

/// Participant id -> that participant's submitted ballot.
pub type RankingMap = IndexMap<String, Vec<String>>;

/// A candidate option proposed during the lobby phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NominationEntity {
    /// Participant that proposed the option.
    pub user_id: String,
    /// Free text of the option.
    pub text: String,
}

/// One scored entry of the final tally, ordered best first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultEntryEntity {
    /// Identifier of the scored nomination.
    pub nomination_id: String,
    /// Text of the nomination at tally time.
    pub nomination_text: String,
    /// Total positional score across all ballots.
    pub score: i64,
}

/// Persisted representation of a poll shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollEntity {
    /// Short shareable code identifying the poll.
    pub id: String,
    /// Question the participants vote on. Immutable after creation.
    pub topic: String,
    /// Cap on how many ranked choices a single ballot may carry.
    pub votes_per_voter: usize,
    /// Participant that created the poll and holds elevated authority.
    pub admin_id: String,
    /// Participant id -> display name.
    pub participants: IndexMap<String, String>,
    /// Candidate options, in submission order.
    pub nominations: NominationMap,
    /// Submitted ballots, one per participant, last write wins.
    pub rankings: RankingMap,
    /// Aggregate tally, empty until the poll is closed.
    pub results: Vec<ResultEntryEntity>,
    /// Latched false -> true when the admin starts the vote.
    pub has_started: bool,
    /// Creation instant.
    pub created_at: SystemTime,
    /// Absolute expiry instant; the store drops the record past this point.
    pub expires_at: SystemTime,
}

impl PollEntity {
    /// Build a fresh poll record with its expiry armed relative to now.
    pub fn new(
        id: String,
        topic: String,
        votes_per_voter: usize,
        admin_id: String,
        ttl: Duration,
    ) -> Self {
        let created_at = SystemTime::now();
        Self {
            id,
            topic,
            votes_per_voter,
            admin_id,
            participants: IndexMap::new(),
            nominations: IndexMap::new(),
            rankings: IndexMap::new(),
            results: Vec::new(),
            has_started: false,
            created_at,
            expires_at: created_at + ttl,
        }
    }
}
