//! Change-Stream Subscriber
//!
//! Opens one feed channel per (table, change kinds) pair and dispatches each
//! decoded event to a [`ChangeHandler`]. Events are relayed in arrival order
//! with no extra ordering or delivery guarantees. Payloads that fail to
//! decode are logged and dropped.
//!
//! The returned [`Subscription`] owns the channel: unsubscribing (or dropping
//! the handle) stops dispatch, and no handler call starts afterwards.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::feed::{ChangeFeed, FeedChannel, FeedError};
use super::messages::{ChangeEvent, ChangeKind};
use crate::model::Entity;

/// Receives typed change events for one entity type
#[async_trait]
pub trait ChangeHandler<E>: Send + Sync {
    async fn on_change(&self, event: ChangeEvent<E>);
}

/// Opens subscriptions against a change feed
#[derive(Clone)]
pub struct Subscriber {
    feed: Arc<dyn ChangeFeed>,
}

impl Subscriber {
    pub fn new(feed: Arc<dyn ChangeFeed>) -> Self {
        Self { feed }
    }

    /// Subscribe to `kinds` changes on `E`'s table
    ///
    /// Setup failures are returned once; there is no internal retry.
    pub async fn subscribe<E, H>(
        &self,
        kinds: &[ChangeKind],
        handler: Arc<H>,
    ) -> Result<Subscription, FeedError>
    where
        E: Entity,
        H: ChangeHandler<E> + ?Sized + 'static,
    {
        let channel = self.feed.open(E::TABLE, kinds).await?;
        let id = channel.id().to_string();
        let active = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(dispatch::<E, H>(
            channel,
            kinds.to_vec(),
            handler,
            Arc::clone(&active),
            stop_rx,
        ));

        tracing::info!(subscription_id = %id, table = E::TABLE, kinds = ?kinds, "Subscribed to change feed");

        Ok(Subscription {
            id,
            table: E::TABLE,
            active,
            stop: Some(stop_tx),
            task: Some(task),
        })
    }
}

async fn dispatch<E, H>(
    mut channel: FeedChannel,
    kinds: Vec<ChangeKind>,
    handler: Arc<H>,
    active: Arc<AtomicBool>,
    mut stop: oneshot::Receiver<()>,
) where
    E: Entity,
    H: ChangeHandler<E> + ?Sized,
{
    loop {
        let raw = tokio::select! {
            _ = &mut stop => break,
            raw = channel.recv() => match raw {
                Some(raw) => raw,
                None => {
                    tracing::warn!(table = E::TABLE, "Change feed ended");
                    break;
                }
            },
        };

        if !kinds.contains(&raw.kind) {
            continue;
        }

        let event = match ChangeEvent::<E>::decode(&raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(table = E::TABLE, kind = %raw.kind, error = %e, "Dropping malformed change event");
                continue;
            }
        };

        if !active.load(Ordering::SeqCst) {
            break;
        }
        handler.on_change(event).await;
    }

    active.store(false, Ordering::SeqCst);
    channel.close();
}

/// Realtime state of a synchronized collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    /// Not subscribed on purpose (bulk-only)
    Off,
    Live,
    /// The subscription failed or its feed went away; the view is stale
    Ended,
}

/// Read-only view of whether a subscription is still dispatching
///
/// Cloned into whoever reports on sync health; it never keeps the
/// subscription alive.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    active: Option<Arc<AtomicBool>>,
}

impl Liveness {
    /// No subscription was ever wanted
    pub fn off() -> Self {
        Self { active: None }
    }

    /// A subscription was wanted but could not be established
    pub fn ended() -> Self {
        Self {
            active: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn state(&self) -> FeedState {
        match &self.active {
            None => FeedState::Off,
            Some(active) if active.load(Ordering::SeqCst) => FeedState::Live,
            Some(_) => FeedState::Ended,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state() == FeedState::Live
    }
}

/// Owned handle for a live subscription
pub struct Subscription {
    id: String,
    table: &'static str,
    active: Arc<AtomicBool>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &str {
        self.table
    }

    /// Whether events are still being dispatched
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Liveness handle that outlives borrows of this subscription
    pub fn liveness(&self) -> Liveness {
        Liveness {
            active: Some(Arc::clone(&self.active)),
        }
    }

    /// Stop dispatching and release the feed channel
    ///
    /// Idempotent, and safe after the feed has already gone away.
    pub fn unsubscribe(&mut self) {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        // The dispatch task exits on its own once it sees the stop signal
        self.task.take();

        if was_active {
            tracing::info!(subscription_id = %self.id, table = self.table, "Unsubscribed from change feed");
        }
    }

    /// Unsubscribe and wait for the dispatch task to finish
    pub async fn shutdown(mut self) {
        let task = self.task.take();
        self.unsubscribe();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Token;
    use crate::realtime::hub::ChangeHub;
    use crate::realtime::messages::RawChange;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ChangeEvent<Token>>>,
    }

    #[async_trait]
    impl ChangeHandler<Token> for Recorder {
        async fn on_change(&self, event: ChangeEvent<Token>) {
            self.events.lock().await.push(event);
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_events_dispatched_in_arrival_order() {
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());
        let recorder = Arc::new(Recorder::default());

        let _sub = subscriber
            .subscribe::<Token, _>(ChangeKind::all(), Arc::clone(&recorder))
            .await
            .unwrap();

        hub.publish(RawChange::insert("tokens", &Token::new("PEPE"))).await;
        hub.publish(RawChange::update("tokens", &Token::new("PEPE").sentiment(60.0)))
            .await;
        hub.publish(RawChange::delete("tokens", "symbol", "PEPE")).await;
        settle().await;

        let events = recorder.events.lock().await;
        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );
    }

    #[tokio::test]
    async fn test_malformed_event_dropped() {
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());
        let recorder = Arc::new(Recorder::default());

        let sub = subscriber
            .subscribe::<Token, _>(ChangeKind::all(), Arc::clone(&recorder))
            .await
            .unwrap();

        hub.publish(RawChange::insert("tokens", &json!({ "symbol": "" }))).await;
        hub.publish(RawChange::insert("tokens", &json!({ "name": "no symbol" })))
            .await;
        hub.publish(RawChange::insert("tokens", &Token::new("WIF"))).await;
        settle().await;

        assert_eq!(recorder.events.lock().await.len(), 1);
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn test_no_dispatch_after_unsubscribe() {
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());
        let recorder = Arc::new(Recorder::default());

        let mut sub = subscriber
            .subscribe::<Token, _>(ChangeKind::all(), Arc::clone(&recorder))
            .await
            .unwrap();

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        settle().await;

        hub.publish(RawChange::insert("tokens", &Token::new("PEPE"))).await;
        settle().await;

        assert!(recorder.events.lock().await.is_empty());
        assert_eq!(hub.subscriber_count("tokens").await, 0);
    }

    #[tokio::test]
    async fn test_drop_releases_channel() {
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());
        let recorder = Arc::new(Recorder::default());

        let sub = subscriber
            .subscribe::<Token, _>(&[ChangeKind::Insert], recorder)
            .await
            .unwrap();
        assert_eq!(hub.subscriber_count("tokens").await, 1);

        drop(sub);
        settle().await;

        assert_eq!(hub.subscriber_count("tokens").await, 0);
    }

    #[tokio::test]
    async fn test_liveness_ends_with_feed() {
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());
        let recorder = Arc::new(Recorder::default());

        let sub = subscriber
            .subscribe::<Token, _>(ChangeKind::all(), Arc::clone(&recorder))
            .await
            .unwrap();
        let liveness = sub.liveness();
        assert_eq!(liveness.state(), FeedState::Live);

        // Feed side goes away without the subscriber asking
        hub.unregister(sub.id()).await;
        settle().await;

        assert_eq!(liveness.state(), FeedState::Ended);
        assert!(!sub.is_active());
        assert!(recorder.events.lock().await.is_empty());
    }

    #[test]
    fn test_liveness_without_subscription() {
        assert_eq!(Liveness::off().state(), FeedState::Off);
        assert_eq!(Liveness::default().state(), FeedState::Off);
        assert_eq!(Liveness::ended().state(), FeedState::Ended);
        assert!(!Liveness::ended().is_live());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_task() {
        let hub = Arc::new(ChangeHub::default());
        let subscriber = Subscriber::new(hub.clone());

        let sub = subscriber
            .subscribe::<Token, _>(ChangeKind::all(), Arc::new(Recorder::default()))
            .await
            .unwrap();

        sub.shutdown().await;
        settle().await;
        assert_eq!(hub.channel_count().await, 0);
    }
}
