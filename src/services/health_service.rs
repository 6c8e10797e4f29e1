use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Ping the durable store, if any, and report the outcome.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let status = match state.durable() {
        Some(store) => match store.health_check().await {
            Ok(()) => HealthStatus::Ok,
            Err(err) => {
                warn!(error = %err, "durable store health check failed");
                HealthStatus::Degraded
            }
        },
        None => HealthStatus::Ok,
    };

    HealthResponse {
        status,
        leaderboards: state.registry().len(),
    }
}
