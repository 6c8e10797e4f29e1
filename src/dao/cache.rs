//! Whole-list caches consumed by [`CacheFirstStorage`](crate::dao::cached::CacheFirstStorage).

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, ready};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::dao::{entry::Entry, storage::StorageResult};

/// Per-collection mutual exclusion owned by a cache instance.
///
/// Each read-mutate-write cycle on a collection runs under that collection's
/// lock; distinct collections never contend.
#[derive(Clone, Default)]
pub struct CollectionLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CollectionLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `collection`.
    pub async fn acquire(&self, collection: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(collection.to_owned())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }
}

/// Cache holding the full materialized entry list of each collection.
pub trait ListCache: Send + Sync {
    /// Cached list for `collection`, `None` on a miss.
    fn get_list(&self, collection: &str)
    -> BoxFuture<'static, StorageResult<Option<Vec<Entry>>>>;

    /// Replace the cached list for `collection`.
    fn put_list(
        &self,
        collection: &str,
        entries: Vec<Entry>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Drop the cached list so the next read is a miss.
    fn invalidate(&self, collection: &str) -> BoxFuture<'static, StorageResult<()>>;

    /// Lock table guarding the collections of this cache.
    ///
    /// Every handle to the same cache must return the same table.
    fn locks(&self) -> CollectionLocks;
}

/// In-process [`ListCache`] keyed by collection name.
#[derive(Clone, Default)]
pub struct LocalListCache {
    lists: Arc<DashMap<String, Arc<Vec<Entry>>>>,
    locks: CollectionLocks,
}

impl LocalListCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListCache for LocalListCache {
    fn get_list(&self, collection: &str) -> BoxFuture<'static, StorageResult<Option<Vec<Entry>>>> {
        let list = self
            .lists
            .get(collection)
            .map(|cached| cached.value().as_ref().clone());
        ready(Ok(list)).boxed()
    }

    fn put_list(
        &self,
        collection: &str,
        entries: Vec<Entry>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.lists.insert(collection.to_owned(), Arc::new(entries));
        ready(Ok(())).boxed()
    }

    fn invalidate(&self, collection: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.lists.remove(collection);
        ready(Ok(())).boxed()
    }

    fn locks(&self) -> CollectionLocks {
        self.locks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_are_keyed_by_collection() {
        let cache = LocalListCache::new();
        let entry = Entry::builder().field("player", "Steve").build();

        assert!(cache.get_list("kills").await.unwrap().is_none());

        cache.put_list("kills", vec![entry.clone()]).await.unwrap();
        cache.put_list("deaths", Vec::new()).await.unwrap();

        assert_eq!(cache.get_list("kills").await.unwrap(), Some(vec![entry]));
        assert_eq!(cache.get_list("deaths").await.unwrap(), Some(Vec::new()));

        cache.invalidate("kills").await.unwrap();
        assert!(cache.get_list("kills").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clones_share_collection_locks() {
        let cache = LocalListCache::new();
        let other = cache.clone();

        let guard = cache.locks().acquire("kills").await;
        assert!(other.locks().locks.get("kills").unwrap().try_lock().is_err());
        assert!(other.locks().locks.get("deaths").is_none());

        drop(guard);
        let _again = other.locks().acquire("kills").await;
    }
}
