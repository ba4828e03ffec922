//! Realtime Change Feed
//!
//! Delivers row-level insert/update/delete events from the database to the
//! synchronized stores.
//!
//! ## Architecture
//!
//! - **Feed**: transport trait and the owned channel it hands out
//! - **Ws**: Phoenix-channel websocket transport (production)
//! - **Hub**: in-process transport for replay, demos, and tests
//! - **Subscriber**: decodes raw changes and dispatches them to a handler
//! - **Messages**: wire payloads and typed change events
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokenpulse::model::Token;
//! use tokenpulse::realtime::{ChangeKind, RealtimeConfig, RealtimeFeed, Subscriber};
//! use tokenpulse::store::{SyncedCollection, TokenPolicy};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let feed = Arc::new(RealtimeFeed::new(RealtimeConfig::default()));
//! let store = Arc::new(SyncedCollection::<Token>::new(TokenPolicy));
//!
//! let subscription = Subscriber::new(feed)
//!     .subscribe::<Token, _>(ChangeKind::all(), Arc::clone(&store))
//!     .await?;
//!
//! // ... later, when the consumer goes away
//! subscription.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod feed;
mod hub;
mod messages;
mod subscriber;
mod ws;

pub use feed::{ChangeFeed, FeedChannel, FeedError};
pub use hub::{ChangeHub, HubConfig};
pub use messages::{ChangeEvent, ChangeKind, ChannelMessage, DecodeError, RawChange};
pub use subscriber::{ChangeHandler, FeedState, Liveness, Subscriber, Subscription};
pub use ws::{RealtimeConfig, RealtimeFeed};
