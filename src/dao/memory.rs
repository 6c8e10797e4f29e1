//! Process-local storage backend, the default for every leaderboard.

use std::sync::{Arc, PoisonError, RwLock};

use futures::future::{BoxFuture, FutureExt, ready};

use crate::dao::{
    entry::{Entry, FieldValue},
    storage::{StorageBackend, StorageResult, sort_top},
};

/// Unsorted, copy-on-write entry list.
///
/// Readers grab the current snapshot and release the lock before sorting, so
/// a concurrent write never exposes a partially updated list.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<Arc<Vec<Entry>>>>,
}

impl InMemoryStorage {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<Vec<Entry>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn update(&self, mutate: impl FnOnce(&mut Vec<Entry>)) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        mutate(Arc::make_mut(&mut guard));
    }
}

impl StorageBackend for InMemoryStorage {
    fn save(&self, entry: Entry) -> BoxFuture<'static, StorageResult<()>> {
        self.update(|entries| entries.push(entry));
        ready(Ok(())).boxed()
    }

    fn top_sorted_by(
        &self,
        score_field: &str,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<Entry>>> {
        let snapshot = self.snapshot();
        ready(Ok(sort_top(snapshot.iter().cloned(), score_field, limit))).boxed()
    }

    fn find_by(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> BoxFuture<'static, StorageResult<Option<Entry>>> {
        let found = self
            .snapshot()
            .iter()
            .find(|entry| entry.matches(field, value))
            .cloned();
        ready(Ok(found)).boxed()
    }

    fn remove_by(&self, field: &str, value: &FieldValue) -> BoxFuture<'static, StorageResult<()>> {
        self.update(|entries| entries.retain(|entry| !entry.matches(field, value)));
        ready(Ok(())).boxed()
    }

    fn size(&self) -> BoxFuture<'static, StorageResult<u64>> {
        ready(Ok(self.snapshot().len() as u64)).boxed()
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.update(Vec::clear);
        ready(Ok(())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kills(player: &str, kills: i64) -> Entry {
        Entry::builder()
            .field("player", player)
            .field("kills", kills)
            .build()
    }

    #[tokio::test]
    async fn save_appends_without_dedup() {
        let storage = InMemoryStorage::new();
        storage.save(kills("Steve", 1)).await.unwrap();
        storage.save(kills("Steve", 2)).await.unwrap();

        assert_eq!(storage.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn top_sorts_descending_with_stable_ties() {
        let storage = InMemoryStorage::new();
        for (player, score) in [("a", 5), ("b", 9), ("c", 5), ("d", 1)] {
            storage.save(kills(player, score)).await.unwrap();
        }

        let top = storage.top_sorted_by("kills", 3).await.unwrap();
        let players: Vec<_> = top
            .iter()
            .map(|e| e.get_as::<String>("player").unwrap().unwrap())
            .collect();
        assert_eq!(players, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn find_by_matches_across_numeric_types() {
        let storage = InMemoryStorage::new();
        storage.save(kills("Steve", 5)).await.unwrap();

        let found = storage
            .find_by("kills", &FieldValue::Float(5.0))
            .await
            .unwrap();
        assert_eq!(found, Some(kills("Steve", 5)));
        assert!(
            storage
                .find_by("player", &"Alex".into())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn remove_by_drops_every_match() {
        let storage = InMemoryStorage::new();
        storage.save(kills("Steve", 1)).await.unwrap();
        storage.save(kills("Alex", 2)).await.unwrap();
        storage.save(kills("Steve", 3)).await.unwrap();

        storage.remove_by("player", &"Steve".into()).await.unwrap();

        assert_eq!(storage.size().await.unwrap(), 1);
        assert!(
            storage
                .find_by("player", &"Steve".into())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn clear_empties_everything() {
        let storage = InMemoryStorage::new();
        storage.save(kills("Steve", 1)).await.unwrap();
        storage.clear().await.unwrap();

        assert_eq!(storage.size().await.unwrap(), 0);
        assert!(storage.top_sorted_by("kills", 10).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_during_writes_see_whole_snapshots() {
        let storage = InMemoryStorage::new();

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    storage.save(kills("p", i)).await.unwrap();
                }
            })
        };

        let mut last = 0;
        while last < 200 {
            let top = storage.top_sorted_by("kills", usize::MAX).await.unwrap();
            assert!(top.len() >= last);
            last = top.len();
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
