use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::leaderboard::{EntryBody, LeaderboardSummary, RankResponse, SizeResponse, TopQuery},
    error::AppError,
    services::leaderboard_service,
    state::SharedState,
};

/// Read-only leaderboard queries.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/leaderboards", get(list_leaderboards))
        .route("/{name}/top", get(get_top))
        .route("/{name}/entry", get(get_entry))
        .route("/{name}/rank", get(get_rank))
        .route("/{name}/size", get(get_size))
}

#[utoipa::path(
    get,
    path = "/leaderboards",
    tag = "leaderboards",
    responses((status = 200, description = "Registered leaderboards", body = [LeaderboardSummary]))
)]
/// List every registered leaderboard with its ranking configuration.
pub async fn list_leaderboards(State(state): State<SharedState>) -> Json<Vec<LeaderboardSummary>> {
    Json(leaderboard_service::list(&state))
}

#[utoipa::path(
    get,
    path = "/{name}/top",
    tag = "leaderboards",
    params(("name" = String, Path, description = "Leaderboard name"), TopQuery),
    responses(
        (status = 200, description = "Best entries first", body = [EntryBody]),
        (status = 404, description = "Unknown leaderboard")
    )
)]
/// Return the highest ranked entries.
pub async fn get_top(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<EntryBody>>, AppError> {
    let entries = leaderboard_service::top(&state, &name, query.effective_limit()).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/{name}/entry",
    tag = "leaderboards",
    params(("name" = String, Path, description = "Leaderboard name")),
    responses(
        (status = 200, description = "First entry whose field matches", body = EntryBody),
        (status = 400, description = "No `field=value` query pair"),
        (status = 404, description = "Unknown leaderboard or no match")
    )
)]
/// Look an entry up by the first `field=value` query pair.
pub async fn get_entry(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<EntryBody>, AppError> {
    let entry = leaderboard_service::entry(&state, &name, &query).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    get,
    path = "/{name}/rank",
    tag = "leaderboards",
    params(("name" = String, Path, description = "Leaderboard name")),
    responses(
        (status = 200, description = "1-based rank of the first match", body = RankResponse),
        (status = 400, description = "No `field=value` query pair"),
        (status = 404, description = "Unknown leaderboard or no match")
    )
)]
/// Return the rank of the entry selected by the first `field=value` query pair.
pub async fn get_rank(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<RankResponse>, AppError> {
    let rank = leaderboard_service::rank(&state, &name, &query).await?;
    Ok(Json(rank))
}

#[utoipa::path(
    get,
    path = "/{name}/size",
    tag = "leaderboards",
    params(("name" = String, Path, description = "Leaderboard name")),
    responses(
        (status = 200, description = "Number of stored entries", body = SizeResponse),
        (status = 404, description = "Unknown leaderboard")
    )
)]
/// Return the number of stored entries.
pub async fn get_size(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<SizeResponse>, AppError> {
    let size = leaderboard_service::size(&state, &name).await?;
    Ok(Json(size))
}
