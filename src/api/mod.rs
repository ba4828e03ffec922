//! TokenPulse REST API
//!
//! Read-only HTTP surface over the synchronized collections, built with Axum.
//!
//! # Endpoints
//!
//! ## Collections
//! - `GET /api/v1/tokens` - All held tokens
//! - `GET /api/v1/tokens/:symbol` - One token
//! - `GET /api/v1/tweets?hours=&token=` - Tweets in a trailing window
//!
//! ## Views
//! - `GET /api/v1/leaderboard?field=&limit=` - Ranked by a numeric field
//! - `GET /api/v1/trending?limit=&hours=` - Ranked by tweet volume
//! - `GET /api/v1/distribution` - Sentiment box plots
//! - `GET /api/v1/dashboard` - Every dashboard view
//!
//! ## Search
//! - `GET /api/v1/search?q=` - Token enrichment lookup
//!
//! ## WebSocket
//! - `GET /api/v1/stream` - Live dashboard views and new-token notices
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Collection routes
        .route("/tokens", get(routes::collections::list_tokens))
        .route("/tokens/:symbol", get(routes::collections::get_token))
        .route("/tweets", get(routes::collections::list_tweets))
        // View routes
        .route("/leaderboard", get(routes::views::leaderboard))
        .route("/trending", get(routes::views::trending))
        .route("/distribution", get(routes::views::distribution))
        .route("/dashboard", get(routes::views::dashboard))
        // Search routes
        .route("/search", get(routes::search::search))
        // Push stream
        .route("/stream", get(routes::stream::stream_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    }
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("TokenPulse API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("TokenPulse API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixedClock, Token, Tweet};
    use crate::realtime::{ChangeHub, Subscriber};
    use crate::store::{SyncSession, SyncedCollection, TokenPolicy, TweetPolicy};
    use crate::views::{ViewSettings, ViewWatcher};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Value;
    use std::time::Duration as StdDuration;
    use tower::util::ServiceExt;

    struct TestApp {
        router: Router,
        tokens: Arc<SyncedCollection<Token>>,
        tweets: Arc<SyncedCollection<Tweet>>,
        watcher: ViewWatcher,
    }

    fn create_test_app() -> TestApp {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let tokens = Arc::new(SyncedCollection::<Token>::new(TokenPolicy));
        let tweets = Arc::new(SyncedCollection::<Tweet>::with_clock(
            TweetPolicy::default(),
            clock.clone(),
        ));

        let watcher = ViewWatcher::spawn(
            &tokens,
            &tweets,
            ViewSettings::default(),
            StdDuration::from_secs(3600),
            clock.clone(),
        );
        let state = AppState::new(
            Arc::clone(&tokens),
            Arc::clone(&tweets),
            watcher.subscribe(),
            ViewSettings::default(),
            ApiConfig::default(),
        )
        .with_clock(clock);

        TestApp {
            router: build_router(state),
            tokens,
            tweets,
            watcher,
        }
    }

    async fn seeded_app() -> TestApp {
        let app = create_test_app();
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

        app.tokens
            .seed(vec![
                Token::new("PEPE").sentiment(40.0).market_cap(1_000.0),
                Token::new("WIF").sentiment(90.0).market_cap(5_000.0),
                Token::new("BONK").sentiment(65.0).market_cap(3_000.0),
            ])
            .await;
        app.tweets
            .seed(vec![
                Tweet::new("1", "bonk", now - Duration::hours(1)).sentiment(70.0),
                Tweet::new("2", "bonk", now - Duration::hours(2)).sentiment(50.0),
                Tweet::new("3", "pepe", now - Duration::hours(3)).sentiment(20.0),
                Tweet::new("4", "wif", now - Duration::hours(30)).sentiment(99.0),
            ])
            .await;
        app
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app();
        let (status, _) = get(&app.router, "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_after_load() {
        let app = create_test_app();

        let (status, _) = get(&app.router, "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        app.tokens.seed(Vec::new()).await;
        app.tweets.seed(Vec::new()).await;

        let (status, _) = get(&app.router, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let app = seeded_app().await;

        let (status, body) = get(&app.router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tokens"]["count"], 3);
    }

    #[tokio::test]
    async fn test_health_degraded_when_feed_ends() {
        let app = seeded_app().await;
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());
        let token_session = SyncSession::open(Arc::clone(&app.tokens), &subscriber)
            .await
            .unwrap();
        let tweet_session = SyncSession::open(Arc::clone(&app.tweets), &subscriber)
            .await
            .unwrap();

        let state = AppState::new(
            Arc::clone(&app.tokens),
            Arc::clone(&app.tweets),
            app.watcher.subscribe(),
            ViewSettings::default(),
            ApiConfig::default(),
        )
        .with_feeds(token_session.liveness(), tweet_session.liveness());
        let router = build_router(state);

        let (_, body) = get(&router, "/health").await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tokens"]["realtime"], "live");

        // Token feed disappears underneath a still-loaded store
        let id = token_session.subscription_id().unwrap().to_string();
        hub.unregister(&id).await;
        tokio::time::sleep(StdDuration::from_millis(30)).await;

        let (status, body) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["tokens"]["realtime"], "ended");
        assert_eq!(body["tokens"]["live"], true);
        assert_eq!(body["tweets"]["realtime"], "live");

        drop(tweet_session);
    }

    #[tokio::test]
    async fn test_list_and_get_tokens() {
        let app = seeded_app().await;

        let (status, body) = get(&app.router, "/api/v1/tokens").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["load_state"]["state"], "ready");

        let (status, body) = get(&app.router, "/api/v1/tokens/wif").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "WIF");

        let (status, body) = get(&app.router, "/api/v1/tokens/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_tweets_window() {
        let app = seeded_app().await;

        let (status, body) = get(&app.router, "/api/v1/tweets?hours=24").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);

        let (_, body) = get(&app.router, "/api/v1/tweets?hours=48&token=WIF").await;
        assert_eq!(body["total"], 1);

        let (status, _) = get(&app.router, "/api/v1/tweets?hours=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let app = seeded_app().await;

        let (status, body) = get(&app.router, "/api/v1/leaderboard?field=mcap&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["field"], "market_cap");
        let symbols: Vec<_> = body["tokens"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["symbol"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(symbols, vec!["WIF", "BONK"]);

        let (status, body) = get(&app.router, "/api/v1/leaderboard?field=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_trending() {
        let app = seeded_app().await;

        let (status, body) = get(&app.router, "/api/v1/trending?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        let tokens = body["tokens"].as_array().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0]["symbol"], "BONK");
        assert_eq!(tokens[0]["tweet_count"], 2);

        let (status, _) = get(&app.router, "/api/v1/trending?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_hours_rejected() {
        let app = seeded_app().await;

        for uri in [
            "/api/v1/trending?hours=9223372036854775807",
            "/api/v1/trending?hours=-3",
            "/api/v1/tweets?hours=9223372036854775807",
        ] {
            let (status, body) = get(&app.router, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }

        let (status, body) = get(&app.router, "/api/v1/trending?hours=720").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hours"], 720);
    }

    #[tokio::test]
    async fn test_distribution_and_dashboard() {
        let app = seeded_app().await;
        app.watcher
            .subscribe()
            .wait_for(|views| views.is_ready())
            .await
            .unwrap();

        let (status, body) = get(&app.router, "/api/v1/distribution").await;
        assert_eq!(status, StatusCode::OK);
        let symbols: Vec<_> = body["tokens"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["symbol"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(symbols, vec!["PEPE", "BONK"]);

        let (status, body) = get(&app.router, "/api/v1/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["podium"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_requires_client() {
        let app = create_test_app();

        let (status, _) = get(&app.router, "/api/v1/search?q=pepe").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get(&app.router, "/api/v1/search?q=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
