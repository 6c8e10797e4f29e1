use axum::Router;

use crate::state::SharedState;

/// Swagger UI.
pub mod docs;
/// Health check route.
pub mod health;
/// Leaderboard query routes.
pub mod leaderboard;

/// Compose all route trees, nesting leaderboard queries under `base_path`.
pub fn router(state: SharedState, base_path: &str) -> Router<()> {
    let base_path = base_path.trim_matches('/');
    let leaderboards = if base_path.is_empty() {
        leaderboard::router()
    } else {
        Router::new().nest(&format!("/{base_path}"), leaderboard::router())
    };

    let docs_router = docs::router(state.clone());

    health::router()
        .merge(leaderboards)
        .merge(docs_router)
        .with_state(state)
}
