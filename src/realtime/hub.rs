//! In-process Change Hub
//!
//! A [`ChangeFeed`] that fans published row changes out to every open channel
//! for the change's table. Used for local replay, demos, and tests; the
//! websocket feed is the production transport.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use uuid::Uuid;

use super::feed::{ChangeFeed, FeedChannel, FeedError};
use super::messages::{ChangeKind, RawChange};

/// Unique identifier for an open channel
pub type ChannelId = String;

/// Configuration for the change hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrently open channels
    pub max_subscribers: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 256,
        }
    }
}

struct ChannelHandle {
    sender: mpsc::UnboundedSender<RawChange>,
    table: String,
    kinds: HashSet<ChangeKind>,
}

/// Routes published changes to open channels by table
#[derive(Clone)]
pub struct ChangeHub {
    /// Open channels: ChannelId → handle
    channels: Arc<RwLock<HashMap<ChannelId, ChannelHandle>>>,
    /// Table subscriptions: table → channel ids
    tables: Arc<RwLock<HashMap<String, HashSet<ChannelId>>>>,
    config: HubConfig,
}

impl ChangeHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            tables: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Deliver a change to every matching channel
    ///
    /// Returns the number of channels the change was handed to. Channels whose
    /// receiver is gone are pruned.
    pub async fn publish(&self, change: RawChange) -> usize {
        let ids = self
            .tables
            .read()
            .await
            .get(&change.table)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let channels = self.channels.read().await;
            for id in &ids {
                let Some(handle) = channels.get(id) else {
                    continue;
                };
                if !handle.kinds.contains(&change.kind) {
                    continue;
                }
                if handle.sender.send(change.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(id.clone());
                }
            }
        }

        for id in dead {
            self.unregister(&id).await;
        }

        tracing::trace!(
            table = %change.table,
            kind = %change.kind,
            channels = delivered,
            "Published change"
        );

        delivered
    }

    /// Remove a channel and its table registration
    pub async fn unregister(&self, id: &str) {
        let handle = self.channels.write().await.remove(id);

        if let Some(handle) = handle {
            let mut tables = self.tables.write().await;
            if let Some(ids) = tables.get_mut(&handle.table) {
                ids.remove(id);
                if ids.is_empty() {
                    tables.remove(&handle.table);
                }
            }
            tracing::debug!(channel_id = %id, table = %handle.table, "Change channel closed");
        }
    }

    /// Number of open channels
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Number of open channels for a table
    pub async fn subscriber_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[async_trait]
impl ChangeFeed for ChangeHub {
    async fn open(&self, table: &str, kinds: &[ChangeKind]) -> Result<FeedChannel, FeedError> {
        let mut channels = self.channels.write().await;
        if channels.len() >= self.config.max_subscribers {
            return Err(FeedError::TooManySubscribers(self.config.max_subscribers));
        }

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        channels.insert(
            id.clone(),
            ChannelHandle {
                sender: tx,
                table: table.to_string(),
                kinds: kinds.iter().copied().collect(),
            },
        );
        drop(channels);

        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(id.clone());

        // Unregister as soon as the channel is released or dropped
        let hub = self.clone();
        let release_id = id.clone();
        tokio::spawn(async move {
            let _ = release_rx.await;
            hub.unregister(&release_id).await;
        });

        tracing::debug!(channel_id = %id, table = %table, "Change channel opened");
        Ok(FeedChannel::new(id, table, rx, release_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Token;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_subscribers, 256);
    }

    #[tokio::test]
    async fn test_open_and_release() {
        let hub = ChangeHub::default();

        let mut channel = hub.open("tokens", ChangeKind::all()).await.unwrap();
        assert_eq!(hub.channel_count().await, 1);
        assert_eq!(hub.subscriber_count("tokens").await, 1);

        channel.close();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(hub.channel_count().await, 0);
        assert_eq!(hub.subscriber_count("tokens").await, 0);
    }

    #[tokio::test]
    async fn test_publish_routes_by_table() {
        let hub = ChangeHub::default();

        let mut tokens = hub.open("tokens", ChangeKind::all()).await.unwrap();
        let mut tweets = hub.open("tweets", ChangeKind::all()).await.unwrap();

        let delivered = hub
            .publish(RawChange::insert("tokens", &Token::new("PEPE")))
            .await;
        assert_eq!(delivered, 1);

        let change = tokens.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);

        let nothing = tokio::time::timeout(Duration::from_millis(20), tweets.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_publish_filters_by_kind() {
        let hub = ChangeHub::default();

        let mut inserts_only = hub.open("tokens", &[ChangeKind::Insert]).await.unwrap();

        let delivered = hub
            .publish(RawChange::delete("tokens", "symbol", "PEPE"))
            .await;
        assert_eq!(delivered, 0);

        hub.publish(RawChange::insert("tokens", &Token::new("WIF")))
            .await;
        let change = inserts_only.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
    }

    #[tokio::test]
    async fn test_subscriber_limit() {
        let hub = ChangeHub::new(HubConfig { max_subscribers: 1 });

        let _first = hub.open("tokens", ChangeKind::all()).await.unwrap();
        let second = hub.open("tokens", ChangeKind::all()).await;

        assert!(matches!(second, Err(FeedError::TooManySubscribers(1))));
    }

    #[tokio::test]
    async fn test_dropped_channel_pruned_on_publish() {
        let hub = ChangeHub::default();

        let channel = hub.open("tokens", ChangeKind::all()).await.unwrap();
        drop(channel);

        let delivered = hub
            .publish(RawChange::insert("tokens", &Token::new("BONK")))
            .await;
        assert_eq!(delivered, 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hub.channel_count().await, 0);
    }
}
