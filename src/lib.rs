//! Library crate for the leaderboards server, exposing modules for binaries and integration tests.

/// Configuration file loading.
pub mod config;
/// Entries, storage backends and durable stores.
pub mod dao;
/// HTTP payloads.
pub mod dto;
/// Error types of every layer.
pub mod error;
/// Ranking engine.
pub mod leaderboard;
/// axum routers.
pub mod routes;
/// Request handling logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;

pub use dao::entry::{Entry, EntryBuilder, FieldValue};
pub use leaderboard::{Leaderboard, LeaderboardBuilder};
