/// Name to leaderboard registry.
pub mod registry;

use std::sync::Arc;

use crate::dao::durable::DurableStore;

pub use self::registry::LeaderboardRegistry;

/// Handle passed to every handler.
pub type SharedState = Arc<AppState>;

/// Central application state shared by every request handler.
pub struct AppState {
    registry: LeaderboardRegistry,
    durable: Option<Arc<dyn DurableStore>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(registry: LeaderboardRegistry) -> SharedState {
        Arc::new(Self {
            registry,
            durable: None,
        })
    }

    /// Same as [`AppState::new`] with a durable store probed by the health check.
    pub fn with_durable(
        registry: LeaderboardRegistry,
        durable: Arc<dyn DurableStore>,
    ) -> SharedState {
        Arc::new(Self {
            registry,
            durable: Some(durable),
        })
    }

    /// Registered leaderboards.
    pub fn registry(&self) -> &LeaderboardRegistry {
        &self.registry
    }

    /// Durable store behind the leaderboards, if any.
    pub fn durable(&self) -> Option<Arc<dyn DurableStore>> {
        self.durable.clone()
    }
}
