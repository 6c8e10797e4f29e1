use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::dao::{
    durable::{DurableStore, Query},
    entry::Entry,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkDocsRequest, BulkDocsResult, CouchEntryDocument, DeletedDocument,
        collection_range,
    },
};

const ALL_DOCS: &str = "_all_docs";
const BULK_DOCS: &str = "_bulk_docs";

/// CouchDB-backed [`DurableStore`]: every entry is its own document.
#[derive(Clone)]
pub struct CouchDurableStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchDurableStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorized(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    debug!(%database, "created CouchDB database");
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    /// Every document of `collection`, ordered by id.
    async fn list_documents(&self, collection: &str) -> CouchResult<Vec<CouchEntryDocument>> {
        let (startkey, endkey) = collection_range(collection);
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", startkey),
            ("endkey", endkey),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        // Decoded straight from the body so field order inside each entry survives.
        let payload = response
            .json::<AllDocsResponse<CouchEntryDocument>>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        Ok(payload.rows.into_iter().filter_map(|row| row.doc).collect())
    }

    async fn matching_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> CouchResult<Vec<CouchEntryDocument>> {
        let documents = self.list_documents(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| query.matches(&doc.fields))
            .collect())
    }

    async fn insert_entry(&self, collection: String, entry: Entry) -> CouchResult<()> {
        let document = CouchEntryDocument::new(&collection, entry);
        self.put_document(&document.id, &document).await
    }

    async fn find_entries(&self, collection: String, query: Query) -> CouchResult<Vec<Entry>> {
        let documents = self.matching_documents(&collection, &query).await?;
        Ok(documents.into_iter().map(|doc| doc.fields).collect())
    }

    async fn delete_entries(&self, collection: String, query: Query) -> CouchResult<()> {
        let tombstones: Vec<DeletedDocument> = self
            .matching_documents(&collection, &query)
            .await?
            .into_iter()
            .filter_map(|doc| {
                doc.rev.map(|rev| DeletedDocument {
                    id: doc.id,
                    rev,
                    deleted: true,
                })
            })
            .collect();

        if tombstones.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, BULK_DOCS)
            .json(&BulkDocsRequest { docs: tombstones })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: BULK_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: BULK_DOCS.to_string(),
                status: response.status(),
            });
        }

        let results = response
            .json::<Vec<BulkDocsResult>>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: BULK_DOCS.to_string(),
                source,
            })?;

        let failed: Vec<String> = results
            .into_iter()
            .filter(|result| result.error.is_some())
            .map(|result| result.id)
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(CouchDaoError::BulkDelete { collection, failed })
        }
    }

    async fn count_entries(&self, collection: String, query: Query) -> CouchResult<u64> {
        let documents = self.matching_documents(&collection, &query).await?;
        Ok(documents.len() as u64)
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

impl DurableStore for CouchDurableStore {
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
