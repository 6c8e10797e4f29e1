/// CouchDB durable store.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// MongoDB durable store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    entry::{Entry, FieldValue},
    storage::StorageResult,
};

/// Selection applied to a durable collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every record of the collection.
    All,
    /// Records whose `field` equals `value`.
    Where {
        /// Field to compare.
        field: String,
        /// Value the field must equal.
        value: FieldValue,
    },
}

impl Query {
    /// Build an equality query.
    pub fn where_eq(field: impl Into<String>, value: FieldValue) -> Self {
        Query::Where {
            field: field.into(),
            value,
        }
    }

    /// Whether `entry` is selected by this query.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Query::All => true,
            Query::Where { field, value } => entry.matches(field, value),
        }
    }
}

/// Optional persistence layer behind a cache-first backend.
///
/// A single store is shared by many leaderboards, discriminated by collection name.
pub trait DurableStore: Send + Sync {
    /// Persist one record.
    fn insert(&self, collection: &str, entry: Entry) -> BoxFuture<'static, StorageResult<()>>;

    /// Records matching `query`, in insertion order.
    fn find(&self, collection: &str, query: Query)
    -> BoxFuture<'static, StorageResult<Vec<Entry>>>;

    /// Delete every record matching `query`.
    fn delete(&self, collection: &str, query: Query) -> BoxFuture<'static, StorageResult<()>>;

    /// Number of records matching `query`.
    fn count(&self, collection: &str, query: Query) -> BoxFuture<'static, StorageResult<u64>>;

    /// Verify the store is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
