//! Search Routes
//!
//! - GET /api/v1/search?q= - Token lookup by symbol or address

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{SearchQuery, SearchResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/search
///
/// Proxies to the enrichment API; not part of the synchronized data path.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::Validation("q must not be empty".to_string()));
    }

    let client = state
        .search
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("search is not configured".to_string()))?;

    let results = client.search_token(q).await?;
    tracing::debug!(query = %q, results = results.len(), "Token search");

    Ok(Json(SearchResponse {
        query: q.to_string(),
        results,
    }))
}
