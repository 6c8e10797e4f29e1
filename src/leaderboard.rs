//! Ranking engine: upsert-by-identity, score mutation and rank lookups on top
//! of a [`StorageBackend`].

use std::fmt;

use tracing::debug;

use crate::{
    dao::{
        entry::{Entry, EntryBuilder, FieldValue},
        memory::InMemoryStorage,
        storage::StorageBackend,
    },
    error::LeaderboardError,
};

/// Score field used when the builder does not set one.
pub const DEFAULT_SCORE_FIELD: &str = "score";

/// A named, ranked collection of entries.
///
/// ```ignore
/// let kills = Leaderboard::builder("kills")
///     .score_field("kills")
///     .identity_field("player")
///     .build();
///
/// kills.submit_with(|e| e.field("player", "Steve").field("kills", 150)).await?;
/// kills.add_score("Steve", 10.0).await?;
/// let rank = kills.rank_of("player", &"Steve".into()).await?;
/// ```
pub struct Leaderboard {
    name: String,
    score_field: String,
    identity_field: Option<String>,
    storage: Box<dyn StorageBackend>,
}

impl fmt::Debug for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaderboard")
            .field("name", &self.name)
            .field("score_field", &self.score_field)
            .field("identity_field", &self.identity_field)
            .finish_non_exhaustive()
    }
}

impl Leaderboard {
    /// Start configuring a leaderboard called `name`.
    pub fn builder(name: impl Into<String>) -> LeaderboardBuilder {
        LeaderboardBuilder {
            name: name.into(),
            score_field: DEFAULT_SCORE_FIELD.to_owned(),
            identity_field: None,
            storage: None,
        }
    }

    /// Registry name, also used as the storage collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field entries are ranked by.
    pub fn score_field(&self) -> &str {
        &self.score_field
    }

    /// Field identifying a logical record, if upserts are enabled.
    pub fn identity_field(&self) -> Option<&str> {
        self.identity_field.as_deref()
    }

    /// Store `entry`, replacing any entry with the same identity value.
    ///
    /// Without an identity field, or when `entry` lacks it, this is a plain append.
    ///
    /// The removal and the append are two separate backend calls. Concurrent
    /// submits for the same identity may interleave and leave more than one
    /// entry for it; callers needing strict uniqueness must serialize them.
    pub async fn submit(&self, entry: Entry) -> Result<(), LeaderboardError> {
        if let Some(identity) = &self.identity_field
            && let Some(value) = entry.get(identity)
        {
            debug!(leaderboard = %self.name, %identity, %value, "upserting entry");
            self.storage.remove_by(identity, value).await?;
        }

        self.storage.save(entry).await?;
        Ok(())
    }

    /// Build an entry with `configure` and [`submit`](Self::submit) it.
    pub async fn submit_with<F>(&self, configure: F) -> Result<(), LeaderboardError>
    where
        F: FnOnce(EntryBuilder) -> EntryBuilder,
    {
        self.submit(configure(Entry::builder()).build()).await
    }

    /// Add `delta` to the score of the entry identified by `identity_value`,
    /// creating it when missing.
    pub async fn add_score(
        &self,
        identity_value: impl Into<FieldValue>,
        delta: f64,
    ) -> Result<(), LeaderboardError> {
        self.mutate_score("add_score", identity_value.into(), |current| {
            current + delta
        })
        .await
    }

    /// Overwrite the score of the entry identified by `identity_value`,
    /// creating it when missing.
    pub async fn set_score(
        &self,
        identity_value: impl Into<FieldValue>,
        score: f64,
    ) -> Result<(), LeaderboardError> {
        self.mutate_score("set_score", identity_value.into(), |_| score)
            .await
    }

    async fn mutate_score(
        &self,
        operation: &'static str,
        identity_value: FieldValue,
        next_score: impl FnOnce(f64) -> f64,
    ) -> Result<(), LeaderboardError> {
        let identity = self
            .identity_field
            .as_deref()
            .ok_or(LeaderboardError::MissingIdentityField {
                leaderboard: self.name.clone(),
                operation,
            })?;

        let existing = self.storage.find_by(identity, &identity_value).await?;
        let (builder, current) = match existing {
            Some(entry) => {
                let current = entry.score(&self.score_field);
                (entry.to_builder(), current)
            }
            None => (Entry::builder().field(identity, identity_value), 0.0),
        };

        let entry = builder
            .field(self.score_field.as_str(), next_score(current))
            .build();
        self.submit(entry).await
    }

    /// Remove every entry whose `field` equals `value`.
    pub async fn remove(&self, field: &str, value: &FieldValue) -> Result<(), LeaderboardError> {
        self.storage.remove_by(field, value).await?;
        Ok(())
    }

    /// Remove every entry.
    pub async fn clear(&self) -> Result<(), LeaderboardError> {
        self.storage.clear().await?;
        Ok(())
    }

    /// Highest ranked entries, best first.
    pub async fn top(&self, limit: usize) -> Result<Vec<Entry>, LeaderboardError> {
        Ok(self.storage.top_sorted_by(&self.score_field, limit).await?)
    }

    /// First entry, in storage order, whose `field` equals `value`.
    pub async fn find_by(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> Result<Option<Entry>, LeaderboardError> {
        Ok(self.storage.find_by(field, value).await?)
    }

    /// 1-based rank of the first entry whose `field` equals `value`.
    ///
    /// Always computed from a fresh full sort; `None` when nothing matches.
    pub async fn rank_of(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> Result<Option<usize>, LeaderboardError> {
        let ranked = self
            .storage
            .top_sorted_by(&self.score_field, usize::MAX)
            .await?;
        Ok(ranked
            .iter()
            .position(|entry| entry.matches(field, value))
            .map(|index| index + 1))
    }

    /// Number of stored entries.
    pub async fn size(&self) -> Result<u64, LeaderboardError> {
        Ok(self.storage.size().await?)
    }
}

/// Configuration collected before a [`Leaderboard`] is created.
pub struct LeaderboardBuilder {
    name: String,
    score_field: String,
    identity_field: Option<String>,
    storage: Option<Box<dyn StorageBackend>>,
}

impl LeaderboardBuilder {
    /// Numeric field used for ranking. Defaults to [`DEFAULT_SCORE_FIELD`].
    pub fn score_field(mut self, field: impl Into<String>) -> Self {
        self.score_field = field.into();
        self
    }

    /// Field identifying a logical record; enables upsert semantics.
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    /// Storage backend; defaults to [`InMemoryStorage`].
    pub fn storage(mut self, storage: impl StorageBackend + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// Create the leaderboard.
    pub fn build(self) -> Leaderboard {
        Leaderboard {
            name: self.name,
            score_field: self.score_field,
            identity_field: self.identity_field,
            storage: self
                .storage
                .unwrap_or_else(|| Box::new(InMemoryStorage::new())),
        }
    }
}
