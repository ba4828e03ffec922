//! TokenPulse Daemon
//!
//! Keeps the token and tweet collections in sync and serves the read-only API.
//!
//! Run with: cargo run --bin tokenpulse -- --config config.toml
//!
//! Startup order per collection: subscribe to the change feed, then bulk
//! load. A failed subscription degrades to a bulk-only (stale) view; a failed
//! load leaves the collection marked failed. Neither stops the server.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokenpulse::config::{Config, LoggingConfig};
use tokenpulse::model::{Clock, Entity, SystemClock, Token, TrailingWindow, Tweet};
use tokenpulse::realtime::{RealtimeFeed, Subscriber};
use tokenpulse::source::{PaginatedLoader, SourceClient, TableSource};
use tokenpulse::store::{StoreNotice, SyncSession, SyncedCollection, TokenPolicy, TweetPolicy};
use tokenpulse::views::ViewWatcher;
use tokenpulse::{serve, ApiConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tokenpulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Realtime token sentiment sync daemon")]
struct Args {
    /// Config file (default: standard locations, then environment)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging);
    tracing::info!("Starting TokenPulse v{}", env!("CARGO_PKG_VERSION"));

    let client = Arc::new(
        SourceClient::new(config.source_config()).context("invalid source configuration")?,
    );
    match client.health_check().await {
        Ok(()) => tracing::info!(url = %config.source.base_url, "Source API reachable"),
        Err(e) => tracing::warn!(url = %config.source.base_url, error = %e, "Source API not reachable"),
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = Arc::new(SyncedCollection::<Token>::new(TokenPolicy));
    let tweets = Arc::new(SyncedCollection::<Tweet>::with_clock(
        TweetPolicy::new(config.sync.tweet_retention_hours),
        Arc::clone(&clock),
    ));

    let subscriber = if config.realtime.enabled {
        let feed = Arc::new(RealtimeFeed::new(config.realtime_config()));
        Some(Subscriber::new(feed))
    } else {
        tracing::info!("Realtime disabled, serving bulk snapshots only");
        None
    };

    let token_session = Arc::new(open_session(Arc::clone(&tokens), subscriber.as_ref()).await);
    let tweet_session = Arc::new(open_session(Arc::clone(&tweets), subscriber.as_ref()).await);
    let feeds = (token_session.liveness(), tweet_session.liveness());

    // Bulk loads run in the background so probes answer immediately
    let token_loader = PaginatedLoader::new(config.sync.token_page_size)?;
    let tweet_loader = PaginatedLoader::new(config.sync.tweet_page_size)?;
    let history = TrailingWindow::hours(config.sync.tweet_history_hours);
    let load_task = {
        let client = Arc::clone(&client);
        let token_session = Arc::clone(&token_session);
        let tweet_session = Arc::clone(&tweet_session);
        let (since, _) = history.bounds(clock.now());
        tokio::spawn(async move {
            let token_source = TableSource::<Token>::active_tokens(Arc::clone(&client));
            let tweet_source = TableSource::<Tweet>::tweets_since(client, since);
            let (tokens, tweets) = tokio::join!(
                token_session.load(&token_source, &token_loader),
                tweet_session.load(&tweet_source, &tweet_loader),
            );
            if let (Ok(tokens), Ok(tweets)) = (tokens, tweets) {
                tracing::info!(tokens, tweets, "Initial load complete");
            }
        })
    };

    let notice_task = {
        let mut notices = tokens.notices();
        tokio::spawn(async move {
            loop {
                match notices.recv().await {
                    Ok(StoreNotice::Added(token)) => {
                        tracing::info!(symbol = %token.symbol, name = %token.name, "New token listed");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "New-token notices dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    let watcher = ViewWatcher::spawn(
        &tokens,
        &tweets,
        config.view_settings(),
        Duration::from_secs(config.views.refresh_secs.max(1)),
        Arc::clone(&clock),
    );

    let api_config = ApiConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        cors_origins: config.server.cors_origins.clone(),
    };
    let state = AppState::new(
        Arc::clone(&tokens),
        Arc::clone(&tweets),
        watcher.subscribe(),
        config.view_settings(),
        api_config,
    )
    .with_search(Arc::clone(&client))
    .with_feeds(feeds.0, feeds.1)
    .with_clock(clock);

    serve(state).await?;

    tracing::info!("Stopping sync sessions...");
    stop_tasks(vec![load_task, notice_task]).await;
    drop(watcher);
    drop(token_session);
    drop(tweet_session);

    tracing::info!("TokenPulse stopped");
    Ok(())
}

/// Abort background tasks and wait until each has actually stopped
///
/// Tasks hold session clones; the sessions only unsubscribe once those are gone.
async fn stop_tasks(tasks: Vec<JoinHandle<()>>) {
    for task in &tasks {
        task.abort();
    }
    for task in tasks {
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, "Background task failed");
            }
        }
    }
}

/// Subscribe when realtime is enabled, falling back to bulk-only
async fn open_session<E: Entity>(
    store: Arc<SyncedCollection<E>>,
    subscriber: Option<&Subscriber>,
) -> SyncSession<E> {
    let Some(subscriber) = subscriber else {
        return SyncSession::detached(store);
    };

    match SyncSession::open(Arc::clone(&store), subscriber).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(table = E::TABLE, error = %e, "Realtime subscription failed, view will be stale");
            SyncSession::stale(store)
        }
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tokenpulse={},tower_http=info", config.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
