/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Leaderboard lookups exposed over HTTP.
pub mod leaderboard_service;
