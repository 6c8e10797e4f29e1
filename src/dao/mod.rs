/// In-process list cache used by the cache-first backend.
pub mod cache;
/// Cache-first backend over an optional durable store.
pub mod cached;
/// Durable store abstraction and its database implementations.
pub mod durable;
/// Entry record and field values.
pub mod entry;
/// Pure in-memory backend.
pub mod memory;
/// Storage backend contract shared by every leaderboard.
pub mod storage;
