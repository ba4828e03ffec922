//! View Watcher
//!
//! Recomputes [`DashboardViews`] whenever either collection publishes a new
//! snapshot, and on a fixed refresh tick so windowed views age out even when
//! no events arrive.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::dashboard::{DashboardViews, ViewSettings};
use crate::model::{Clock, Token, Tweet};
use crate::store::SyncedCollection;

/// Background task keeping dashboard views current
pub struct ViewWatcher {
    views: watch::Receiver<Arc<DashboardViews>>,
    task: JoinHandle<()>,
}

impl ViewWatcher {
    pub fn spawn(
        tokens: &SyncedCollection<Token>,
        tweets: &SyncedCollection<Tweet>,
        settings: ViewSettings,
        refresh: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut tokens_rx = tokens.watch();
        let mut tweets_rx = tweets.watch();

        let initial = DashboardViews::compute(
            &tokens_rx.borrow_and_update(),
            &tweets_rx.borrow_and_update(),
            &settings,
            clock.now(),
        );
        let (tx, views) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh.max(Duration::from_millis(10)));
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = tokens_rx.changed() => if changed.is_err() { break },
                    changed = tweets_rx.changed() => if changed.is_err() { break },
                    _ = ticker.tick() => {}
                }

                let tokens = tokens_rx.borrow_and_update().clone();
                let tweets = tweets_rx.borrow_and_update().clone();
                let views = DashboardViews::compute(&tokens, &tweets, &settings, clock.now());
                tracing::trace!(
                    tokens_version = tokens.version,
                    tweets_version = tweets.version,
                    "Dashboard views recomputed"
                );

                if tx.send(Arc::new(views)).is_err() {
                    break;
                }
            }
            tracing::debug!("View watcher stopped");
        });

        Self { views, task }
    }

    /// Latest computed views
    pub fn current(&self) -> Arc<DashboardViews> {
        self.views.borrow().clone()
    }

    /// Receiver notified on every recomputation
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardViews>> {
        self.views.clone()
    }
}

impl Drop for ViewWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
