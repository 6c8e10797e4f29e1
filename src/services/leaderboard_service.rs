//! Read-only projections of registered leaderboards for the HTTP layer.

use std::sync::Arc;

use crate::{
    dao::entry::FieldValue,
    dto::leaderboard::{EntryBody, LeaderboardSummary, RankResponse, SizeResponse},
    error::ServiceError,
    leaderboard::Leaderboard,
    state::SharedState,
};

/// Describe every registered leaderboard.
pub fn list(state: &SharedState) -> Vec<LeaderboardSummary> {
    state
        .registry()
        .all()
        .iter()
        .map(|board| LeaderboardSummary::from(board.as_ref()))
        .collect()
}

/// Best `limit` entries of leaderboard `name`.
pub async fn top(
    state: &SharedState,
    name: &str,
    limit: usize,
) -> Result<Vec<EntryBody>, ServiceError> {
    let board = require_board(state, name)?;
    let entries = board.top(limit).await?;
    Ok(entries.into_iter().map(EntryBody::from).collect())
}

/// First entry matching the first query pair.
pub async fn entry(
    state: &SharedState,
    name: &str,
    query: &[(String, String)],
) -> Result<EntryBody, ServiceError> {
    let board = require_board(state, name)?;
    let (field, raw) = lookup_pair(query)?;

    for value in lookup_candidates(raw) {
        if let Some(entry) = board.find_by(field, &value).await? {
            return Ok(entry.into());
        }
    }

    Err(ServiceError::NotFound(format!(
        "no entry with {field}={raw} in `{name}`"
    )))
}

/// Rank of the first entry matching the first query pair.
pub async fn rank(
    state: &SharedState,
    name: &str,
    query: &[(String, String)],
) -> Result<RankResponse, ServiceError> {
    let board = require_board(state, name)?;
    let (field, raw) = lookup_pair(query)?;

    for value in lookup_candidates(raw) {
        if let Some(rank) = board.rank_of(field, &value).await? {
            return Ok(RankResponse { rank });
        }
    }

    Err(ServiceError::NotFound(format!(
        "no entry with {field}={raw} in `{name}`"
    )))
}

/// Number of entries of leaderboard `name`.
pub async fn size(state: &SharedState, name: &str) -> Result<SizeResponse, ServiceError> {
    let board = require_board(state, name)?;
    Ok(SizeResponse {
        size: board.size().await?,
    })
}

fn require_board(state: &SharedState, name: &str) -> Result<Arc<Leaderboard>, ServiceError> {
    state
        .registry()
        .get(name)
        .ok_or_else(|| ServiceError::NotFound(format!("unknown leaderboard `{name}`")))
}

/// First pair with both a field and a value; `?player` and `?player=` are ignored.
fn lookup_pair(query: &[(String, String)]) -> Result<(&str, &str), ServiceError> {
    query
        .iter()
        .find(|(field, value)| !field.is_empty() && !value.is_empty())
        .map(|(field, value)| (field.as_str(), value.as_str()))
        .ok_or_else(|| ServiceError::InvalidInput("missing query parameter".into()))
}

/// Values a textual query parameter may stand for, most literal first.
fn lookup_candidates(raw: &str) -> Vec<FieldValue> {
    let mut candidates = vec![FieldValue::from(raw)];
    if let Ok(int) = raw.parse::<i64>() {
        candidates.push(FieldValue::Int(int));
    } else if let Ok(float) = raw.parse::<f64>()
        && float.is_finite()
    {
        candidates.push(FieldValue::Float(float));
    }
    candidates
}
