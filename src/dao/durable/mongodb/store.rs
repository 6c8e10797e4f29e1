use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
};
use tokio::sync::RwLock;
use tracing::warn;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{document_entry, entry_document, query_filter},
};
use crate::dao::{
    durable::{DurableStore, Query},
    entry::Entry,
    storage::StorageResult,
};

/// MongoDB-backed [`DurableStore`]: one collection per leaderboard.
#[derive(Clone)]
pub struct MongoDurableStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
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
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoDurableStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn collection(&self, name: &str) -> Collection<Document> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<Document>(name)
    }

    async fn insert_entry(&self, collection: String, entry: Entry) -> MongoResult<()> {
        self.collection(&collection)
            .await
            .insert_one(entry_document(&entry))
            .await
            .map_err(|source| MongoDaoError::Insert { collection, source })?;
        Ok(())
    }

    async fn find_entries(&self, collection: String, query: Query) -> MongoResult<Vec<Entry>> {
        let documents: Vec<Document> = self
            .collection(&collection)
            .await
            .find(query_filter(&query))
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::Find {
                collection: collection.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Find { collection, source })?;

        Ok(documents.iter().map(document_entry).collect())
    }

    async fn delete_entries(&self, collection: String, query: Query) -> MongoResult<()> {
        self.collection(&collection)
            .await
            .delete_many(query_filter(&query))
            .await
            .map_err(|source| MongoDaoError::Delete { collection, source })?;
        Ok(())
    }

    async fn count_entries(&self, collection: String, query: Query) -> MongoResult<u64> {
        self.collection(&collection)
            .await
            .count_documents(query_filter(&query))
            .await
            .map_err(|source| MongoDaoError::Count { collection, source })
    }

    /// Ping the server, rebuilding the client once if the ping fails.
    async fn check_or_reconnect(&self) -> MongoResult<()> {
        match self.inner.ping().await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "MongoDB health ping failed; attempting reconnect");
                self.inner.reconnect().await
            }
        }
    }
}

impl DurableStore for MongoDurableStore {
    fn insert(&self, collection: &str, entry: Entry) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            store
                .insert_entry(collection, entry)
                .await
                .map_err(Into::into)
        })
    }

    fn find(
        &self,
        collection: &str,
        query: Query,
    ) -> BoxFuture<'static, StorageResult<Vec<Entry>>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            store
                .find_entries(collection, query)
                .await
                .map_err(Into::into)
        })
    }

    fn delete(&self, collection: &str, query: Query) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            store
                .delete_entries(collection, query)
                .await
                .map_err(Into::into)
        })
    }

    fn count(&self, collection: &str, query: Query) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            store
                .count_entries(collection, query)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check_or_reconnect().await.map_err(Into::into) })
    }
}
