use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::{
    dao::{
        models::{NominationEntity, PollEntity, ResultEntryEntity},
        poll_store::{PollField, PollFieldPath, PollStore},
        storage::{StorageError, StorageResult},
    },
    error::ServiceError,
};

/// Deadline for a single store call before it is classified as timed out.
const STORE_CALL_TIMEOUT: Duration = Duration::from_secs(3);
/// Bounded retry budget for transient store failures.
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Translates poll domain operations into field-level store writes.
///
/// Every mutation is followed by a read-back of the whole record, so callers
/// always observe post-write canonical state rather than locally patched
/// state. All retried writes are idempotent whole-field sets; a retry after a
/// lost acknowledgement cannot half-apply an operation.
pub struct PollRepository {
    store: Arc<dyn PollStore>,
    ttl: Duration,
}

impl PollRepository {
    /// Bind a repository to a store handle and the configured poll lifetime.
    pub fn new(store: Arc<dyn PollStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create a fresh poll record with its expiry armed, returning canonical state.
    pub async fn create_poll(
        &self,
        poll_id: &str,
        topic: &str,
        votes_per_voter: usize,
        admin_id: &str,
    ) -> Result<PollEntity, ServiceError> {
        let poll = PollEntity::new(
            poll_id.to_owned(),
            topic.to_owned(),
            votes_per_voter,
            admin_id.to_owned(),
            self.ttl,
        );
        self.call(|| self.store.create_record(poll.clone())).await?;
        self.get_poll(poll_id).await
    }

    /// Fetch a poll; absence (including TTL expiry) surfaces as `NotFound`.
    pub async fn get_poll(&self, poll_id: &str) -> Result<PollEntity, ServiceError> {
        self.call(|| self.store.fetch_record(poll_id.to_owned()))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("poll `{poll_id}` not found")))
    }

    /// Add or overwrite a participant entry.
    pub async fn add_participant(
        &self,
        poll_id: &str,
        participant_id: &str,
        name: &str,
    ) -> Result<PollEntity, ServiceError> {
        self.apply(
            poll_id,
            PollField::Participant {
                id: participant_id.to_owned(),
                name: name.to_owned(),
            },
        )
        .await
    }

    /// Remove a participant entry.
    pub async fn remove_participant(
        &self,
        poll_id: &str,
        participant_id: &str,
    ) -> Result<PollEntity, ServiceError> {
        self.remove(poll_id, PollFieldPath::Participant(participant_id.to_owned()))
            .await
    }

    /// Store a new nomination under a fresh id.
    pub async fn add_nomination(
        &self,
        poll_id: &str,
        nomination_id: &str,
        nomination: NominationEntity,
    ) -> Result<PollEntity, ServiceError> {
        self.apply(
            poll_id,
            PollField::Nomination {
                id: nomination_id.to_owned(),
                nomination,
            },
        )
        .await
    }

    /// Remove a nomination entry.
    pub async fn remove_nomination(
        &self,
        poll_id: &str,
        nomination_id: &str,
    ) -> Result<PollEntity, ServiceError> {
        self.remove(poll_id, PollFieldPath::Nomination(nomination_id.to_owned()))
            .await
    }

    /// Latch the lobby -> voting transition flag.
    pub async fn set_has_started(&self, poll_id: &str) -> Result<PollEntity, ServiceError> {
        self.apply(poll_id, PollField::HasStarted(true)).await
    }

    /// Store or overwrite one participant's ballot.
    pub async fn add_ranking(
        &self,
        poll_id: &str,
        participant_id: &str,
        ballot: Vec<String>,
    ) -> Result<PollEntity, ServiceError> {
        self.apply(
            poll_id,
            PollField::Ranking {
                participant_id: participant_id.to_owned(),
                ballot,
            },
        )
        .await
    }

    /// Persist the computed tally.
    pub async fn set_results(
        &self,
        poll_id: &str,
        results: Vec<ResultEntryEntity>,
    ) -> Result<PollEntity, ServiceError> {
        self.apply(poll_id, PollField::Results(results)).await
    }

    /// Delete the whole poll record. Deleting an already-gone record is fine.
    pub async fn delete_poll(&self, poll_id: &str) -> Result<(), ServiceError> {
        self.call(|| self.store.delete_record(poll_id.to_owned()))
            .await?;
        Ok(())
    }

    async fn apply(&self, poll_id: &str, field: PollField) -> Result<PollEntity, ServiceError> {
        let existed = self
            .call(|| self.store.set_field(poll_id.to_owned(), field.clone()))
            .await?;
        if !existed {
            return Err(ServiceError::NotFound(format!(
                "poll `{poll_id}` not found"
            )));
        }
        self.get_poll(poll_id).await
    }

    async fn remove(&self, poll_id: &str, path: PollFieldPath) -> Result<PollEntity, ServiceError> {
        let existed = self
            .call(|| self.store.delete_field(poll_id.to_owned(), path.clone()))
            .await?;
        if !existed {
            return Err(ServiceError::NotFound(format!(
                "poll `{poll_id}` not found"
            )));
        }
        self.get_poll(poll_id).await
    }

    /// Run one store call under a deadline, retrying transient failures with backoff.
    async fn call<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        F: Fn() -> BoxFuture<'static, StorageResult<T>>,
    {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 0;
        loop {
            let outcome = match timeout(STORE_CALL_TIMEOUT, op()).await {
                Ok(result) => result,
                Err(_) => Err(StorageError::Timeout {
                    waited_ms: STORE_CALL_TIMEOUT.as_millis() as u64,
                }),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(ServiceError::Unavailable(err));
                    }
                    warn!(attempt, error = %err, "store call failed; retrying");
                    sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}
