//! # TokenPulse
//!
//! Realtime data synchronization core for a crypto-sentiment dashboard: bulk
//! loads token and tweet collections, keeps them current from a database
//! change feed, and derives rankings and sentiment distributions from them.
//!
//! ## Features
//!
//! - **Paginated bulk loading**: sequential offset/limit pages until an empty page
//! - **Change feed**: Phoenix-channel websocket or in-process hub
//! - **Merge authority**: one deduplicating writer per entity type
//! - **Derived views**: leaderboards, tweet-volume trending, box plots
//!
//! ## Modules
//!
//! - [`model`]: Tokens, tweets, identity keys, trailing windows
//! - [`source`]: REST client and paginated loader
//! - [`realtime`]: Change feed transports and subscriber
//! - [`store`]: Synchronized collections and sync sessions
//! - [`views`]: Ranking, windowing, and quartile views
//! - [`api`]: Read-only REST API with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokenpulse::model::Token;
//! use tokenpulse::realtime::{ChangeHub, Subscriber};
//! use tokenpulse::source::{PaginatedLoader, SourceClient, SourceConfig, TableSource};
//! use tokenpulse::store::{SyncSession, SyncedCollection, TokenPolicy};
//! use tokenpulse::views::top_by_field;
//! use tokenpulse::model::TokenField;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(SourceClient::new(SourceConfig::default())?);
//!     let feed = Arc::new(ChangeHub::default());
//!
//!     // Subscribe first, then load
//!     let tokens = Arc::new(SyncedCollection::<Token>::new(TokenPolicy));
//!     let session = SyncSession::open(Arc::clone(&tokens), &Subscriber::new(feed)).await?;
//!     session
//!         .load(&TableSource::active_tokens(client), &PaginatedLoader::new(1000)?)
//!         .await?;
//!
//!     let snapshot = tokens.snapshot();
//!     for token in top_by_field(&snapshot.items, TokenField::SentimentScore, 10) {
//!         println!("{} {:?}", token.symbol, token.sentiment_score);
//!     }
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod model;
pub mod realtime;
pub mod source;
pub mod store;
pub mod views;

// Re-export top-level types for convenience
pub use model::{Clock, Entity, IdentityKey, Token, TokenField, TrailingWindow, Tweet};

pub use source::{PageSource, PaginatedLoader, SourceClient, SourceConfig, SourceError};

pub use realtime::{
    ChangeEvent, ChangeFeed, ChangeHub, ChangeKind, FeedError, FeedState, Liveness,
    RealtimeConfig, RealtimeFeed, Subscriber, Subscription,
};

pub use store::{
    LoadState, Snapshot, StoreNotice, SyncError, SyncSession, SyncedCollection, TokenPolicy,
    TweetPolicy,
};

pub use views::{BoxPlot, DashboardViews, ViewSettings, ViewWatcher};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
