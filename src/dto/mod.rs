/// Health check payloads.
pub mod health;
/// Leaderboard query payloads.
pub mod leaderboard;
