/// In-process backend used for local development and tests.
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB backend with field-path updates and TTL-driven expiry.
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::{NominationEntity, PollEntity, ResultEntryEntity};
use crate::dao::storage::StorageResult;

/// Single-field write applied atomically to a poll record.
#[derive(Debug, Clone)]
pub enum PollField {
    /// `participants.<id>`: display name keyed by participant id.
    Participant {
        /// Participant identifier.
        id: String,
        /// Display name to store.
        name: String,
    },
    /// `nominations.<id>`: a nomination keyed by its fresh id.
    Nomination {
        /// Nomination identifier.
        id: String,
        /// Nomination payload.
        nomination: NominationEntity,
    },
    /// `rankings.<id>`: a participant's ballot, overwritten as a whole.
    Ranking {
        /// Owner of the ballot.
        participant_id: String,
        /// Ordered nomination ids.
        ballot: Vec<String>,
    },
    /// `results`: the computed tally.
    Results(Vec<ResultEntryEntity>),
    /// `has_started`: the lobby -> voting latch.
    HasStarted(bool),
}

/// Single-field delete applied atomically to a poll record.
#[derive(Debug, Clone)]
pub enum PollFieldPath {
    /// `participants.<id>`.
    Participant(String),
    /// `nominations.<id>`.
    Nomination(String),
}

/// Abstraction over the persistence layer for poll records.
///
/// Implementations provide field-level atomic writes and whole-record expiry.
/// Anything coarser (check-then-act across fields) is serialized by the
/// session coordinator, not by the store.
pub trait PollStore: Send + Sync {
    /// Write a whole poll record and arm its expiry in the same operation.
    fn create_record(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Read a whole poll record. `None` when absent or expired.
    fn fetch_record(&self, poll_id: String)
    -> BoxFuture<'static, StorageResult<Option<PollEntity>>>;
    /// Set one field. Returns `false` when the record does not exist.
    fn set_field(&self, poll_id: String, field: PollField)
    -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete one field. Returns `false` when the record does not exist.
    fn delete_field(
        &self,
        poll_id: String,
        path: PollFieldPath,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a whole record. Returns `false` when it was already gone.
    fn delete_record(&self, poll_id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish the backend connection after a failed probe.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
