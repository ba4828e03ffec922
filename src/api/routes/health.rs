//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (both collections loaded)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{HealthResponse, StoreHealth};
use crate::api::state::AppState;
use crate::model::Entity;
use crate::realtime::{FeedState, Liveness};
use crate::store::{LoadState, SyncedCollection};

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once both collections have finished their initial load.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    let ready = state.tokens.snapshot().load_state.is_ready()
        && state.tweets.snapshot().load_state.is_ready();

    if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with per-collection details.
/// A failed load, a disposed store, or an ended change feed is "degraded".
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let tokens = store_health(&state.tokens, &state.token_feed);
    let tweets = store_health(&state.tweets, &state.tweet_feed);

    let failed = |h: &StoreHealth| {
        matches!(h.load_state, LoadState::Failed(_))
            || !h.live
            || h.realtime == FeedState::Ended
    };
    let status = if failed(&tokens) || failed(&tweets) {
        "degraded"
    } else if tokens.load_state.is_ready() && tweets.load_state.is_ready() {
        "healthy"
    } else {
        "loading"
    };

    Json(HealthResponse {
        status: status.to_string(),
        tokens,
        tweets,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn store_health<E: Entity>(store: &SyncedCollection<E>, feed: &Liveness) -> StoreHealth {
    let snapshot = store.snapshot();
    StoreHealth {
        load_state: snapshot.load_state.clone(),
        count: snapshot.len(),
        version: snapshot.version,
        live: store.is_alive(),
        realtime: feed.state(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Token;
    use crate::store::TokenPolicy;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_store_health() {
        let store = SyncedCollection::<Token>::new(TokenPolicy);
        store.seed(vec![Token::new("PEPE")]).await;

        let health = store_health(&store, &Liveness::off());
        assert_eq!(health.count, 1);
        assert!(health.load_state.is_ready());
        assert!(health.live);
        assert_eq!(health.realtime, FeedState::Off);

        let health = store_health(&store, &Liveness::ended());
        assert_eq!(health.realtime, FeedState::Ended);
    }
}
