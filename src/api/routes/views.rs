//! View Routes
//!
//! Derived dashboard views.
//!
//! - GET /api/v1/leaderboard?field=&limit= - Tokens ranked by a numeric field
//! - GET /api/v1/trending?limit=&hours= - Tokens ranked by tweet volume
//! - GET /api/v1/distribution - Per-token sentiment box plots
//! - GET /api/v1/dashboard - Every view from one recomputation

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    DistributionResponse, LeaderboardQuery, LeaderboardResponse, TrendingQuery, TrendingResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::check_hours;
use crate::api::state::AppState;
use crate::model::{TokenField, TrailingWindow};
use crate::views::{filter_trailing_window, top_by_field, top_by_tweet_volume, DashboardViews};

const MAX_LIMIT: usize = 500;
const DEFAULT_TRENDING: usize = 5;

fn check_limit(limit: usize) -> ApiResult<usize> {
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// GET /api/v1/leaderboard
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let field = match query.field.as_deref() {
        Some(raw) => raw.parse::<TokenField>().map_err(ApiError::Validation)?,
        None => state.settings.leaderboard_field,
    };
    let limit = check_limit(query.limit.unwrap_or(state.settings.leaderboard_size))?;

    let snapshot = state.tokens.snapshot();
    Ok(Json(LeaderboardResponse {
        field: field.as_str().to_string(),
        tokens: top_by_field(&snapshot.items, field, limit),
    }))
}

/// GET /api/v1/trending
pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendingQuery>,
) -> ApiResult<Json<TrendingResponse>> {
    let limit = check_limit(query.limit.unwrap_or(DEFAULT_TRENDING))?;
    let hours = check_hours(query.hours.unwrap_or(state.settings.trending_window_hours))?;

    let now = state.clock.now();
    let tokens = state.tokens.snapshot();
    let tweets = state.tweets.snapshot();
    let recent = filter_trailing_window(&tweets.items, hours, |t| t.created_at, now);

    Ok(Json(TrendingResponse {
        hours,
        tokens: top_by_tweet_volume(
            &tokens.items,
            &recent,
            limit,
            TrailingWindow::hours(hours),
            now,
        ),
    }))
}

/// GET /api/v1/distribution
pub async fn distribution(State(state): State<Arc<AppState>>) -> Json<DistributionResponse> {
    let views = state.current_views();
    Json(DistributionResponse {
        computed_at: views.computed_at,
        tokens: views.distribution.clone(),
    })
}

/// GET /api/v1/dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardViews> {
    Json(state.current_views().as_ref().clone())
}
