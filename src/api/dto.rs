//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Token, Tweet};
use crate::realtime::FeedState;
use crate::source::TokenProfile;
use crate::store::LoadState;
use crate::views::{TokenDistribution, TokenVolume};

// ============================================
// COLLECTION DTOs
// ============================================

/// Token list response
#[derive(Debug, Serialize)]
pub struct TokenListResponse {
    pub total: usize,
    pub load_state: LoadState,
    pub tokens: Vec<Token>,
}

/// Tweet list query parameters
#[derive(Debug, Deserialize)]
pub struct TweetsQuery {
    /// Trailing window in hours (default: the trending window)
    pub hours: Option<i64>,
    /// Restrict to one token symbol
    pub token: Option<String>,
}

/// Tweet list response
#[derive(Debug, Serialize)]
pub struct TweetListResponse {
    pub total: usize,
    pub hours: i64,
    pub load_state: LoadState,
    pub tweets: Vec<Tweet>,
}

// ============================================
// VIEW DTOs
// ============================================

/// Leaderboard query parameters
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Ranking field (e.g. "market_cap")
    pub field: Option<String>,
    pub limit: Option<usize>,
}

/// Leaderboard response
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub field: String,
    pub tokens: Vec<Token>,
}

/// Trending query parameters
#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<usize>,
    pub hours: Option<i64>,
}

/// Trending response
#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub hours: i64,
    pub tokens: Vec<TokenVolume>,
}

/// Sentiment distribution response
#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    pub computed_at: DateTime<Utc>,
    pub tokens: Vec<TokenDistribution>,
}

// ============================================
// SEARCH DTOs
// ============================================

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Symbol or address
    pub q: String,
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<TokenProfile>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, loading, degraded
    pub status: String,
    pub tokens: StoreHealth,
    pub tweets: StoreHealth,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Per-collection health
#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub load_state: LoadState,
    pub count: usize,
    pub version: u64,
    /// The collection still accepts changes
    pub live: bool,
    pub realtime: FeedState,
}
