//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::model::{Clock, SystemClock, Token, Tweet};
use crate::realtime::Liveness;
use crate::source::SourceClient;
use crate::store::SyncedCollection;
use crate::views::{DashboardViews, ViewSettings};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Live token collection
    pub tokens: Arc<SyncedCollection<Token>>,
    /// Live tweet collection
    pub tweets: Arc<SyncedCollection<Tweet>>,
    /// Change feed state per collection
    pub token_feed: Liveness,
    pub tweet_feed: Liveness,
    /// Latest dashboard views
    pub views: watch::Receiver<Arc<DashboardViews>>,
    /// Defaults for ad-hoc view queries
    pub settings: Arc<ViewSettings>,
    /// Search / enrichment client (optional)
    pub search: Option<Arc<SourceClient>>,
    pub clock: Arc<dyn Clock>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        tokens: Arc<SyncedCollection<Token>>,
        tweets: Arc<SyncedCollection<Tweet>>,
        views: watch::Receiver<Arc<DashboardViews>>,
        settings: ViewSettings,
        config: ApiConfig,
    ) -> Self {
        Self {
            tokens,
            tweets,
            token_feed: Liveness::off(),
            tweet_feed: Liveness::off(),
            views,
            settings: Arc::new(settings),
            search: None,
            clock: Arc::new(SystemClock),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Enable the search endpoint
    pub fn with_search(mut self, client: Arc<SourceClient>) -> Self {
        self.search = Some(client);
        self
    }

    /// Report the sessions' change feeds in health checks
    pub fn with_feeds(mut self, tokens: Liveness, tweets: Liveness) -> Self {
        self.token_feed = tokens;
        self.tweet_feed = tweets;
        self
    }

    /// Use a different clock for windowed queries
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Latest dashboard views
    pub fn current_views(&self) -> Arc<DashboardViews> {
        self.views.borrow().clone()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr() {
        assert_eq!(ApiConfig::new("127.0.0.1", 9000).addr(), "127.0.0.1:9000");
        assert_eq!(ApiConfig::default().addr(), "0.0.0.0:8090");
    }
}
