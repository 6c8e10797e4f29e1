use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::dao::entry::{Entry, FieldValue};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Persistence strategy behind a single leaderboard.
///
/// Backends only store and query; upsert policy lives in
/// [`Leaderboard`](crate::leaderboard::Leaderboard).
pub trait StorageBackend: Send + Sync {
    /// Append `entry` without any deduplication.
    fn save(&self, entry: Entry) -> BoxFuture<'static, StorageResult<()>>;

    /// Entries ordered by descending `score_field`, truncated to `limit`.
    ///
    /// Missing or non-numeric scores rank as zero and ties keep insertion order.
    fn top_sorted_by(
        &self,
        score_field: &str,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<Entry>>>;

    /// First entry, in storage order, whose `field` equals `value`.
    fn find_by(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> BoxFuture<'static, StorageResult<Option<Entry>>>;

    /// Remove every entry whose `field` equals `value`.
    fn remove_by(&self, field: &str, value: &FieldValue) -> BoxFuture<'static, StorageResult<()>>;

    /// Total number of stored entries.
    fn size(&self) -> BoxFuture<'static, StorageResult<u64>>;

    /// Remove every entry, durable state included.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Sort `entries` by descending score and keep the first `limit`.
///
/// `sort_by` is stable, so equal scores keep their relative order.
pub fn sort_top<I>(entries: I, score_field: &str, limit: usize) -> Vec<Entry>
where
    I: IntoIterator<Item = Entry>,
{
    let mut scored: Vec<(f64, Entry)> = entries
        .into_iter()
        .map(|entry| (entry.score(score_field), entry))
        .collect();
    scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, entry)| entry)
        .collect()
}
