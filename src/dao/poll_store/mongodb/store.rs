use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoPollDocument, doc_id, set_update, unset_update},
};
use crate::dao::{
    models::PollEntity,
    poll_store::{PollField, PollFieldPath, PollStore},
    storage::StorageResult,
};

const POLL_COLLECTION_NAME: &str = "polls";

#[derive(Clone)]
pub struct MongoPollStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoPollStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// TTL index so poll records vanish at their absolute `expires_at` instant.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let collection = database.collection::<mongodb::bson::Document>(POLL_COLLECTION_NAME);
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"expires_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("poll_expiry_idx".to_owned()))
                    .expire_after(Some(Duration::from_secs(0)))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: POLL_COLLECTION_NAME,
                index: "expires_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self) -> Collection<MongoPollDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPollDocument>(POLL_COLLECTION_NAME)
    }

    async fn create_record(&self, poll: PollEntity) -> MongoResult<()> {
        let id = poll.id.clone();
        let document: MongoPollDocument = poll.into();
        let collection = self.collection().await;
        collection
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::CreatePoll { id, source })?;

        Ok(())
    }

    async fn fetch_record(&self, poll_id: &str) -> MongoResult<Option<PollEntity>> {
        let collection = self.collection().await;

        let document = collection
            .find_one(doc_id(poll_id))
            .await
            .map_err(|source| MongoDaoError::LoadPoll {
                id: poll_id.to_owned(),
                source,
            })?;

        // The TTL monitor only sweeps periodically; an expired document that
        // has not been reaped yet must still read as absent.
        let entity: Option<PollEntity> = document.map(Into::into);
        Ok(entity.filter(|poll| poll.expires_at > std::time::SystemTime::now()))
    }

    async fn set_field(&self, poll_id: &str, field: PollField) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .update_one(doc_id(poll_id), set_update(field))
            .await
            .map_err(|source| MongoDaoError::UpdatePoll {
                id: poll_id.to_owned(),
                source,
            })?;
        Ok(result.matched_count > 0)
    }

    async fn delete_field(&self, poll_id: &str, path: PollFieldPath) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .update_one(doc_id(poll_id), unset_update(path))
            .await
            .map_err(|source| MongoDaoError::UpdatePoll {
                id: poll_id.to_owned(),
                source,
            })?;
        Ok(result.matched_count > 0)
    }

    async fn delete_record(&self, poll_id: &str) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(doc_id(poll_id))
            .await
            .map_err(|source| MongoDaoError::DeletePoll {
                id: poll_id.to_owned(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }
}

impl PollStore for MongoPollStore {
    fn create_record(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_record(poll).await.map_err(Into::into) })
    }

    fn fetch_record(
        &self,
        poll_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<PollEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.fetch_record(&poll_id).await.map_err(Into::into) })
    }

    fn set_field(
        &self,
        poll_id: String,
        field: PollField,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.set_field(&poll_id, field).await.map_err(Into::into) })
    }

    fn delete_field(
        &self,
        poll_id: String,
        path: PollFieldPath,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_field(&poll_id, path).await.map_err(Into::into) })
    }

    fn delete_record(&self, poll_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_record(&poll_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
