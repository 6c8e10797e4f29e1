use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{dao::entry::Entry, leaderboard::Leaderboard};

/// Number of entries returned by `/top` when no usable `limit` is given.
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Query string accepted by the `/top` route.
///
/// `limit` stays textual so that garbage falls back to the default instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopQuery {
    /// Maximum number of entries; missing, invalid or non-positive means 10.
    pub limit: Option<String>,
}

impl TopQuery {
    /// Requested limit, or [`DEFAULT_TOP_LIMIT`] when unusable.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .and_then(|limit| usize::try_from(limit).ok())
            .unwrap_or(DEFAULT_TOP_LIMIT)
    }
}

/// A stored entry rendered as a flat JSON object.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct EntryBody(pub Entry);

impl From<Entry> for EntryBody {
    fn from(entry: Entry) -> Self {
        Self(entry)
    }
}

/// Payload of the `/rank` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankResponse {
    /// 1-based position in the descending ranking.
    pub rank: usize,
}

/// Payload of the `/size` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct SizeResponse {
    /// Number of stored entries.
    pub size: u64,
}

/// Public description of a registered leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardSummary {
    /// Leaderboard name.
    pub name: String,
    /// Field entries are ranked by.
    pub score_field: String,
    /// Field enabling upserts, if any.
    pub identity_field: Option<String>,
}

impl From<&Leaderboard> for LeaderboardSummary {
    fn from(board: &Leaderboard) -> Self {
        Self {
            name: board.name().to_owned(),
            score_field: board.score_field().to_owned(),
            identity_field: board.identity_field().map(str::to_owned),
        }
    }
}
