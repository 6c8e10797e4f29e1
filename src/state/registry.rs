use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry as MapEntry};
use tracing::{info, warn};

use crate::leaderboard::Leaderboard;

/// Leaderboards served by this process, keyed by name.
#[derive(Default)]
pub struct LeaderboardRegistry {
    boards: DashMap<String, Arc<Leaderboard>>,
}

impl LeaderboardRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `leaderboard` under its name.
    ///
    /// Returns `false` and keeps the existing one when the name is taken.
    pub fn register(&self, leaderboard: Leaderboard) -> bool {
        match self.boards.entry(leaderboard.name().to_owned()) {
            MapEntry::Occupied(existing) => {
                warn!(name = %existing.key(), "leaderboard already registered; ignoring duplicate");
                false
            }
            MapEntry::Vacant(slot) => {
                info!(
                    name = %leaderboard.name(),
                    score_field = %leaderboard.score_field(),
                    identity_field = ?leaderboard.identity_field(),
                    "registered leaderboard"
                );
                slot.insert(Arc::new(leaderboard));
                true
            }
        }
    }

    /// Remove the leaderboard called `name`, returning it if present.
    pub fn unregister(&self, name: &str) -> Option<Arc<Leaderboard>> {
        self.boards.remove(name).map(|(_, board)| board)
    }

    /// Leaderboard called `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Leaderboard>> {
        self.boards.get(name).map(|board| board.value().clone())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.boards.contains_key(name)
    }

    /// Every registered leaderboard, ordered by name.
    pub fn all(&self) -> Vec<Arc<Leaderboard>> {
        let mut boards: Vec<_> = self.boards.iter().map(|board| board.value().clone()).collect();
        boards.sort_by(|a, b| a.name().cmp(b.name()));
        boards
    }

    /// Number of registered leaderboards.
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = LeaderboardRegistry::new();
        assert!(registry.register(Leaderboard::builder("kills").score_field("kills").build()));
        assert!(!registry.register(Leaderboard::builder("kills").build()));

        assert_eq!(registry.len(), 1);
        let kills = registry.get("kills").unwrap();
        assert_eq!(kills.score_field(), "kills");
    }

    #[test]
    fn all_is_sorted_by_name() {
        let registry = LeaderboardRegistry::new();
        for name in ["wins", "deaths", "kills"] {
            registry.register(Leaderboard::builder(name).build());
        }

        let names: Vec<_> = registry.all().iter().map(|b| b.name().to_owned()).collect();
        assert_eq!(names, vec!["deaths", "kills", "wins"]);
    }

    #[test]
    fn unregister_removes_board() {
        let registry = LeaderboardRegistry::new();
        registry.register(Leaderboard::builder("kills").build());

        assert!(registry.unregister("kills").is_some());
        assert!(!registry.contains("kills"));
        assert!(registry.unregister("kills").is_none());
        assert!(registry.is_empty());
    }
}
