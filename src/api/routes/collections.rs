//! Collection Routes
//!
//! Read-only access to the live snapshots.
//!
//! - GET /api/v1/tokens - All held tokens
//! - GET /api/v1/tokens/:symbol - One token by symbol
//! - GET /api/v1/tweets?hours=&token= - Tweets in a trailing window

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{TokenListResponse, TweetListResponse, TweetsQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::check_hours;
use crate::api::state::AppState;
use crate::model::{IdentityKey, Token};
use crate::views::filter_trailing_window;

/// GET /api/v1/tokens
pub async fn list_tokens(State(state): State<Arc<AppState>>) -> Json<TokenListResponse> {
    let snapshot = state.tokens.snapshot();

    Json(TokenListResponse {
        total: snapshot.len(),
        load_state: snapshot.load_state.clone(),
        tokens: snapshot.items.clone(),
    })
}

/// GET /api/v1/tokens/:symbol
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Token>> {
    state
        .tokens
        .snapshot()
        .get(&symbol)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Token '{}' not found", symbol)))
}

/// GET /api/v1/tweets
pub async fn list_tweets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TweetsQuery>,
) -> ApiResult<Json<TweetListResponse>> {
    let hours = check_hours(query.hours.unwrap_or(state.settings.trending_window_hours))?;

    let snapshot = state.tweets.snapshot();
    let now = state.clock.now();
    let mut tweets = filter_trailing_window(&snapshot.items, hours, |t| t.created_at, now);

    if let Some(token) = query.token.as_deref() {
        let key = IdentityKey::new(token);
        tweets.retain(|t| t.token_key() == key);
    }

    Ok(Json(TweetListResponse {
        total: tweets.len(),
        hours,
        load_state: snapshot.load_state.clone(),
        tweets,
    }))
}
