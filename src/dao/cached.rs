//! Cache-first storage backend with optional write-through durable store.
//!
//! The cache holds the whole entry list of a collection as a single unit. Reads
//! go to the cache and only fall back to the durable store after a miss, in
//! which case the cache is repopulated with exactly what the store returned.
//! Mutations hit the durable store first; the cache is only rewritten once the
//! store accepted the write.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::dao::{
    cache::{CollectionLocks, ListCache},
    durable::{DurableStore, Query},
    entry::{Entry, FieldValue},
    storage::{StorageBackend, StorageResult, sort_top},
};

/// [`StorageBackend`] keeping a collection in a [`ListCache`], optionally
/// backed by a [`DurableStore`].
#[derive(Clone)]
pub struct CacheFirstStorage {
    durable: Option<Arc<dyn DurableStore>>,
    cache: Arc<dyn ListCache>,
    collection: Arc<str>,
    locks: CollectionLocks,
}

impl CacheFirstStorage {
    /// Cache only, no persistence.
    ///
    /// Locking follows the cache, so backends built on the same cache and
    /// collection serialize with each other.
    pub fn new(cache: Arc<dyn ListCache>, collection: impl Into<String>) -> Self {
        Self {
            durable: None,
            locks: cache.locks(),
            cache,
            collection: Arc::from(collection.into()),
        }
    }

    /// Cache in front of a durable store.
    pub fn with_durable(
        durable: Arc<dyn DurableStore>,
        cache: Arc<dyn ListCache>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            durable: Some(durable),
            ..Self::new(cache, collection)
        }
    }

    /// Collection (cache key and durable collection) this backend manages.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Owned copy of the cached list, reloading from the durable store on a miss.
    async fn cached_list(&self) -> StorageResult<Vec<Entry>> {
        if let Some(list) = self.cache.get_list(&self.collection).await? {
            return Ok(list);
        }

        let Some(durable) = &self.durable else {
            return Ok(Vec::new());
        };

        let list = durable.find(&self.collection, Query::All).await?;
        debug!(
            collection = %self.collection,
            count = list.len(),
            "cache miss; reloaded collection from durable store"
        );
        self.cache.put_list(&self.collection, list.clone()).await?;
        Ok(list)
    }

    async fn save_entry(&self, entry: Entry) -> StorageResult<()> {
        let _guard = self.locks.acquire(&self.collection).await;
        // Loaded before the durable insert so a reload cannot already contain `entry`.
        let mut list = self.cached_list().await?;

        if let Some(durable) = &self.durable {
            durable
                .insert(&self.collection, entry.clone())
                .await
                .inspect_err(|err| {
                    warn!(collection = %self.collection, error = %err, "durable insert failed")
                })?;
        }

        list.push(entry);
        self.cache.put_list(&self.collection, list).await
    }

    async fn top_entries(&self, score_field: &str, limit: usize) -> StorageResult<Vec<Entry>> {
        let _guard = self.locks.acquire(&self.collection).await;
        let list = self.cached_list().await?;
        Ok(sort_top(list, score_field, limit))
    }

    async fn find_entry(&self, field: &str, value: &FieldValue) -> StorageResult<Option<Entry>> {
        let _guard = self.locks.acquire(&self.collection).await;
        let list = self.cached_list().await?;
        Ok(list.into_iter().find(|entry| entry.matches(field, value)))
    }

    async fn remove_entries(&self, field: String, value: FieldValue) -> StorageResult<()> {
        let _guard = self.locks.acquire(&self.collection).await;
        let mut list = self.cached_list().await?;

        if let Some(durable) = &self.durable {
            durable
                .delete(&self.collection, Query::where_eq(field.clone(), value.clone()))
                .await
                .inspect_err(|err| {
                    warn!(collection = %self.collection, error = %err, "durable delete failed")
                })?;
        }

        list.retain(|entry| !entry.matches(&field, &value));
        self.cache.put_list(&self.collection, list).await
    }

    async fn count_entries(&self) -> StorageResult<u64> {
        if let Some(durable) = &self.durable {
            return durable.count(&self.collection, Query::All).await;
        }

        let _guard = self.locks.acquire(&self.collection).await;
        Ok(self.cached_list().await?.len() as u64)
    }

    async fn clear_entries(&self) -> StorageResult<()> {
        let _guard = self.locks.acquire(&self.collection).await;

        if let Some(durable) = &self.durable {
            durable
                .delete(&self.collection, Query::All)
                .await
                .inspect_err(|err| {
                    warn!(collection = %self.collection, error = %err, "durable clear failed")
                })?;
        }

        self.cache.put_list(&self.collection, Vec::new()).await
    }
}

impl StorageBackend for CacheFirstStorage {
    fn save(&self, entry: Entry) -> BoxFuture<'static, StorageResult<()>> {
        let storage = self.clone();
        Box::pin(async move { storage.save_entry(entry).await })
    }

    fn top_sorted_by(
        &self,
        score_field: &str,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<Entry>>> {
        let storage = self.clone();
        let score_field = score_field.to_owned();
        Box::pin(async move { storage.top_entries(&score_field, limit).await })
    }

    fn find_by(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> BoxFuture<'static, StorageResult<Option<Entry>>> {
        let storage = self.clone();
        let field = field.to_owned();
        let value = value.clone();
        Box::pin(async move { storage.find_entry(&field, &value).await })
    }

    fn remove_by(&self, field: &str, value: &FieldValue) -> BoxFuture<'static, StorageResult<()>> {
        let storage = self.clone();
        let field = field.to_owned();
        let value = value.clone();
        Box::pin(async move { storage.remove_entries(field, value).await })
    }

    fn size(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let storage = self.clone();
        Box::pin(async move { storage.count_entries().await })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let storage = self.clone();
        Box::pin(async move { storage.clear_entries().await })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io,
        sync::{
            Mutex as StdMutex,
            atomic::{AtomicBool, Ordering},
        },
    };

    use futures::future::{FutureExt, ready};

    use super::*;
    use crate::dao::{cache::LocalListCache, memory::InMemoryStorage, storage::StorageError};

    /// Durable store double keeping records per collection, with switchable write failures.
    #[derive(Default)]
    struct FakeDurable {
        records: StdMutex<HashMap<String, Vec<Entry>>>,
        fail_writes: AtomicBool,
    }

    impl FakeDurable {
        fn write_guard(&self) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(StorageError::unavailable(
                    "write rejected".into(),
                    io::Error::other("injected failure"),
                ))
            } else {
                Ok(())
            }
        }

        fn stored(&self, collection: &str) -> Vec<Entry> {
            self.records
                .lock()
                .unwrap()
                .get(collection)
                .cloned()
                .unwrap_or_default()
        }
    }

    impl DurableStore for FakeDurable {
        fn insert(&self, collection: &str, entry: Entry) -> BoxFuture<'static, StorageResult<()>> {
            let result = self.write_guard().map(|()| {
                self.records
                    .lock()
                    .unwrap()
                    .entry(collection.to_owned())
                    .or_default()
                    .push(entry);
            });
            ready(result).boxed()
        }

        fn find(
            &self,
            collection: &str,
            query: Query,
        ) -> BoxFuture<'static, StorageResult<Vec<Entry>>> {
            let found = self
                .stored(collection)
                .into_iter()
                .filter(|entry| query.matches(entry))
                .collect();
            ready(Ok(found)).boxed()
        }

        fn delete(&self, collection: &str, query: Query) -> BoxFuture<'static, StorageResult<()>> {
            let result = self.write_guard().map(|()| {
                if let Some(list) = self.records.lock().unwrap().get_mut(collection) {
                    list.retain(|entry| !query.matches(entry));
                }
            });
            ready(result).boxed()
        }

        fn count(&self, collection: &str, query: Query) -> BoxFuture<'static, StorageResult<u64>> {
            let count = self
                .stored(collection)
                .iter()
                .filter(|entry| query.matches(entry))
                .count() as u64;
            ready(Ok(count)).boxed()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            ready(Ok(())).boxed()
        }
    }

    fn kills(player: &str, kills: i64) -> Entry {
        Entry::builder()
            .field("player", player)
            .field("kills", kills)
            .build()
    }

    fn players(entries: &[Entry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.get_as::<String>("player").unwrap().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn cache_only_backend_round_trips_operations() {
        let storage = CacheFirstStorage::new(Arc::new(LocalListCache::new()), "kills");

        storage.save(kills("Steve", 3)).await.unwrap();
        storage.save(kills("Alex", 7)).await.unwrap();
        storage.save(kills("Steve", 1)).await.unwrap();

        assert_eq!(storage.size().await.unwrap(), 3);
        let top = storage.top_sorted_by("kills", 2).await.unwrap();
        assert_eq!(players(&top), vec!["Alex", "Steve"]);

        storage.remove_by("player", &"Steve".into()).await.unwrap();
        assert_eq!(storage.size().await.unwrap(), 1);
        assert!(
            storage
                .find_by("player", &"Steve".into())
                .await
                .unwrap()
                .is_none()
        );

        storage.clear().await.unwrap();
        assert_eq!(storage.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fresh_backend_rebuilds_from_durable_store() {
        let durable = Arc::new(FakeDurable::default());
        let first = CacheFirstStorage::with_durable(
            durable.clone(),
            Arc::new(LocalListCache::new()),
            "kills",
        );
        first.save(kills("Steve", 150)).await.unwrap();

        let fresh = CacheFirstStorage::with_durable(
            durable.clone(),
            Arc::new(LocalListCache::new()),
            "kills",
        );
        let found = fresh.find_by("player", &"Steve".into()).await.unwrap();
        assert_eq!(found, Some(kills("Steve", 150)));
    }

    #[tokio::test]
    async fn save_after_miss_does_not_duplicate() {
        let durable = Arc::new(FakeDurable::default());
        durable.records.lock().unwrap().insert("kills".into(), vec![kills("Alex", 1)]);

        let cache = Arc::new(LocalListCache::new());
        let storage = CacheFirstStorage::with_durable(durable.clone(), cache.clone(), "kills");
        storage.save(kills("Steve", 2)).await.unwrap();

        let cached = cache.get_list("kills").await.unwrap().unwrap();
        assert_eq!(players(&cached), vec!["Alex", "Steve"]);
        assert_eq!(durable.stored("kills").len(), 2);
    }

    #[tokio::test]
    async fn clear_wipes_durable_and_cache() {
        let durable = Arc::new(FakeDurable::default());
        let cache = Arc::new(LocalListCache::new());
        let storage = CacheFirstStorage::with_durable(durable.clone(), cache.clone(), "kills");
        storage.save(kills("Steve", 1)).await.unwrap();
        storage.save(kills("Alex", 2)).await.unwrap();

        storage.clear().await.unwrap();
        assert_eq!(storage.size().await.unwrap(), 0);

        cache.invalidate("kills").await.unwrap();
        assert!(storage.top_sorted_by("kills", 10).await.unwrap().is_empty());
        assert_eq!(cache.get_list("kills").await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn rejected_durable_write_leaves_cache_untouched() {
        let durable = Arc::new(FakeDurable::default());
        let cache = Arc::new(LocalListCache::new());
        let storage = CacheFirstStorage::with_durable(durable.clone(), cache.clone(), "kills");
        storage.save(kills("Steve", 1)).await.unwrap();

        durable.fail_writes.store(true, Ordering::SeqCst);

        assert!(storage.save(kills("Alex", 2)).await.is_err());
        assert!(storage.remove_by("player", &"Steve".into()).await.is_err());
        assert!(storage.clear().await.is_err());

        let cached = cache.get_list("kills").await.unwrap().unwrap();
        assert_eq!(cached, vec![kills("Steve", 1)]);
        assert_eq!(durable.stored("kills"), vec![kills("Steve", 1)]);
    }

    #[tokio::test]
    async fn size_prefers_durable_count() {
        let durable = Arc::new(FakeDurable::default());
        let storage = CacheFirstStorage::with_durable(
            durable.clone(),
            Arc::new(LocalListCache::new()),
            "kills",
        );
        storage.save(kills("Steve", 1)).await.unwrap();

        // Written by another process, not yet visible in this cache.
        durable
            .records
            .lock()
            .unwrap()
            .entry("kills".into())
            .or_default()
            .push(kills("Alex", 2));

        assert_eq!(storage.size().await.unwrap(), 2);
        assert_eq!(storage.top_sorted_by("kills", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reads_agree_with_in_memory_backend() {
        let reference = InMemoryStorage::new();
        let cached = CacheFirstStorage::new(Arc::new(LocalListCache::new()), "kills");

        for (i, score) in [4, 9, 4, 0, 9, 2].into_iter().enumerate() {
            let entry = kills(&format!("p{i}"), score);
            reference.save(entry.clone()).await.unwrap();
            cached.save(entry).await.unwrap();
        }

        assert_eq!(
            reference.top_sorted_by("kills", 4).await.unwrap(),
            cached.top_sorted_by("kills", 4).await.unwrap()
        );
        assert_eq!(
            reference.find_by("kills", &FieldValue::Int(4)).await.unwrap(),
            cached.find_by("kills", &FieldValue::Int(4)).await.unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_from_separate_backends_are_not_lost() {
        let cache: Arc<dyn ListCache> = Arc::new(LocalListCache::new());

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let storage = CacheFirstStorage::new(cache.clone(), "kills");
                tokio::spawn(async move { storage.save(kills(&format!("p{i}"), i)).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let storage = CacheFirstStorage::new(cache, "kills");
        assert_eq!(storage.size().await.unwrap(), 64);
    }
}
