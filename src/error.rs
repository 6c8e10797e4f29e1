use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Errors raised by [`Leaderboard`](crate::leaderboard::Leaderboard) operations.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// A score mutation was attempted on a leaderboard without identity field.
    #[error("leaderboard `{leaderboard}` has no identity field, `{operation}` is unsupported")]
    MissingIdentityField {
        /// Leaderboard the operation targeted.
        leaderboard: String,
        /// Rejected operation.
        operation: &'static str,
    },
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation is not supported by the target leaderboard.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<LeaderboardError> for ServiceError {
    fn from(err: LeaderboardError) -> Self {
        match err {
            LeaderboardError::Storage(source) => ServiceError::Unavailable(source),
            other @ LeaderboardError::MissingIdentityField { .. } => {
                ServiceError::Unsupported(other.to_string())
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation not supported in the current configuration.
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Unsupported(message) => AppError::Unprocessable(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_identity_maps_to_unprocessable() {
        let err = LeaderboardError::MissingIdentityField {
            leaderboard: "runs".into(),
            operation: "add_score",
        };
        let app: AppError = ServiceError::from(err).into();

        assert!(matches!(app, AppError::Unprocessable(ref msg) if msg.contains("add_score")));
        assert_eq!(app.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn storage_failure_maps_to_unavailable() {
        let io = std::io::Error::other("connection reset");
        let err = LeaderboardError::from(StorageError::unavailable("down".into(), io));
        let app: AppError = ServiceError::from(err).into();

        assert_eq!(app.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
