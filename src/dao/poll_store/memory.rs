use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::models::PollEntity;
use crate::dao::poll_store::{PollField, PollFieldPath, PollStore};
use crate::dao::storage::StorageResult;

/// In-process poll store.
///
/// Mirrors the field-level contract of the MongoDB backend over a [`DashMap`].
/// Expiry is absolute from record creation and enforced lazily: an expired
/// record is dropped the first time anything touches it.
#[derive(Clone, Default)]
pub struct MemoryPollStore {
    records: Arc<DashMap<String, PollEntity>>,
}

impl MemoryPollStore {
    /// Remove the record when its expiry has passed, reporting whether it is live.
    fn is_live(&self, poll_id: &str) -> bool {
        let expired = match self.records.get(poll_id) {
            Some(entry) => entry.expires_at <= SystemTime::now(),
            None => return false,
        };
        if expired {
            self.records.remove(poll_id);
            return false;
        }
        true
    }

    fn apply_set(&self, poll_id: &str, field: PollField) -> bool {
        if !self.is_live(poll_id) {
            return false;
        }
        let Some(mut entry) = self.records.get_mut(poll_id) else {
            return false;
        };
        match field {
            PollField::Participant { id, name } => {
                entry.participants.insert(id, name);
            }
            PollField::Nomination { id, nomination } => {
                entry.nominations.insert(id, nomination);
            }
            PollField::Ranking {
                participant_id,
                ballot,
            } => {
                entry.rankings.insert(participant_id, ballot);
            }
            PollField::Results(results) => {
                entry.results = results;
            }
            PollField::HasStarted(flag) => {
                entry.has_started = flag;
            }
        }
        true
    }

    fn apply_delete(&self, poll_id: &str, path: PollFieldPath) -> bool {
        if !self.is_live(poll_id) {
            return false;
        }
        let Some(mut entry) = self.records.get_mut(poll_id) else {
            return false;
        };
        match path {
            PollFieldPath::Participant(id) => {
                entry.participants.shift_remove(&id);
            }
            PollFieldPath::Nomination(id) => {
                entry.nominations.shift_remove(&id);
            }
        }
        true
    }
}

impl PollStore for MemoryPollStore {
    fn create_record(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.records.insert(poll.id.clone(), poll);
            Ok(())
        })
    }

    fn fetch_record(
        &self,
        poll_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<PollEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            if !store.is_live(&poll_id) {
                return Ok(None);
            }
            Ok(store.records.get(&poll_id).map(|entry| entry.clone()))
        })
    }

    fn set_field(
        &self,
        poll_id: String,
        field: PollField,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.apply_set(&poll_id, field)) })
    }

    fn delete_field(
        &self,
        poll_id: String,
        path: PollFieldPath,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.apply_delete(&poll_id, path)) })
    }

    fn delete_record(&self, poll_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.records.remove(&poll_id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::models::NominationEntity;

    fn poll(id: &str, ttl: Duration) -> PollEntity {
        PollEntity::new(id.into(), "lunch".into(), 2, "admin".into(), ttl)
    }

    #[tokio::test]
    async fn set_field_on_missing_record_reports_absence() {
        let store = MemoryPollStore::default();
        let applied = store
            .set_field("ABC123".into(), PollField::HasStarted(true))
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn expired_record_behaves_as_absent() {
        let store = MemoryPollStore::default();
        store
            .create_record(poll("ABC123", Duration::ZERO))
            .await
            .unwrap();

        assert!(store.fetch_record("ABC123".into()).await.unwrap().is_none());
        let applied = store
            .set_field(
                "ABC123".into(),
                PollField::Nomination {
                    id: "n1".into(),
                    nomination: NominationEntity {
                        user_id: "admin".into(),
                        text: "tacos".into(),
                    },
                },
            )
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn field_writes_round_trip() {
        let store = MemoryPollStore::default();
        store
            .create_record(poll("ABC123", Duration::from_secs(60)))
            .await
            .unwrap();

        store
            .set_field(
                "ABC123".into(),
                PollField::Participant {
                    id: "u1".into(),
                    name: "Ana".into(),
                },
            )
            .await
            .unwrap();
        store
            .delete_field("ABC123".into(), PollFieldPath::Participant("u1".into()))
            .await
            .unwrap();

        let fetched = store
            .fetch_record("ABC123".into())
            .await
            .unwrap()
            .expect("record should exist");
        assert!(fetched.participants.is_empty());
    }
}
