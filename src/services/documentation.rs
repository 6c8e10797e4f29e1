use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the leaderboard server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::leaderboard::list_leaderboards,
        crate::routes::leaderboard::get_top,
        crate::routes::leaderboard::get_entry,
        crate::routes::leaderboard::get_rank,
        crate::routes::leaderboard::get_size,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::leaderboard::EntryBody,
            crate::dto::leaderboard::RankResponse,
            crate::dto::leaderboard::SizeResponse,
            crate::dto::leaderboard::LeaderboardSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "leaderboards", description = "Ranking queries"),
    )
)]
/// OpenAPI document of every route.
pub struct ApiDoc;
