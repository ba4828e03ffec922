//! Websocket Change Feed
//!
//! Streams row changes from the database realtime service over a Phoenix
//! channel websocket. One socket is opened per table subscription; the
//! connection task keeps a heartbeat, relays `postgres_changes` pushes, and
//! leaves the topic when the channel is released.
//!
//! Reconnection is not attempted here: a dropped socket ends the channel and
//! the owner decides whether to resubscribe.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::feed::{ChangeFeed, FeedChannel, FeedError};
use super::messages::{ChangeKind, ChannelMessage, RawChange};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the websocket feed
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Realtime base URL (e.g. "wss://project.supabase.co")
    pub url: String,
    /// API key passed as a query parameter
    pub api_key: Option<String>,
    /// Database schema the tables live in
    pub schema: String,
    /// Seconds between heartbeats
    pub heartbeat_interval_secs: u64,
    /// Seconds to wait for the join reply
    pub join_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:54321".to_string(),
            api_key: None,
            schema: "public".to_string(),
            heartbeat_interval_secs: 30,
            join_timeout_secs: 10,
        }
    }
}

impl RealtimeConfig {
    /// Full websocket endpoint URL
    pub fn endpoint(&self) -> String {
        let mut url = format!(
            "{}/realtime/v1/websocket?vsn=1.0.0",
            self.url.trim_end_matches('/')
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&apikey={}", urlencoding::encode(key)));
        }
        url
    }
}

/// Change feed backed by the realtime websocket service
pub struct RealtimeFeed {
    config: RealtimeConfig,
}

impl RealtimeFeed {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    async fn join(
        &self,
        stream: &mut WsStream,
        table: &str,
        kinds: &[ChangeKind],
    ) -> Result<String, FeedError> {
        let join_ref = "1";
        let join = ChannelMessage::join(&self.config.schema, table, kinds, join_ref);
        let topic = join.topic.clone();

        send_message(stream, &join).await?;

        let wait = async {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => return Err(FeedError::Closed),
                    Ok(_) => continue,
                    Err(e) => return Err(FeedError::from(e)),
                };
                let Ok(msg) = serde_json::from_str::<ChannelMessage>(&text) else {
                    continue;
                };
                if msg.is_ok_reply(join_ref) {
                    return Ok(());
                }
                if msg.event == "phx_reply" && msg.reference.as_deref() == Some(join_ref) {
                    return Err(FeedError::JoinRejected {
                        topic: topic.clone(),
                        reason: msg.payload.to_string(),
                    });
                }
            }
            Err(FeedError::Closed)
        };

        tokio::time::timeout(Duration::from_secs(self.config.join_timeout_secs), wait)
            .await
            .map_err(|_| FeedError::JoinTimeout(topic.clone()))??;

        Ok(topic)
    }
}

#[async_trait]
impl ChangeFeed for RealtimeFeed {
    async fn open(&self, table: &str, kinds: &[ChangeKind]) -> Result<FeedChannel, FeedError> {
        let endpoint = self.config.endpoint();
        let (mut stream, _) = connect_async(endpoint.as_str()).await?;

        let topic = self.join(&mut stream, table, kinds).await?;
        tracing::info!(topic = %topic, "Joined realtime channel");

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = oneshot::channel();
        let heartbeat = Duration::from_secs(self.config.heartbeat_interval_secs.max(1));

        tokio::spawn(run_connection(stream, topic, tx, release_rx, heartbeat));

        Ok(FeedChannel::new(id, table, rx, release_tx))
    }
}

/// Connection task: relay changes until released or disconnected
async fn run_connection(
    mut stream: WsStream,
    topic: String,
    tx: mpsc::UnboundedSender<RawChange>,
    mut release: oneshot::Receiver<()>,
    heartbeat: Duration,
) {
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await;
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            _ = &mut release => {
                let leave = ChannelMessage::leave(&topic, &next_ref.to_string());
                let _ = send_message(&mut stream, &leave).await;
                let _ = stream.close(None).await;
                tracing::debug!(topic = %topic, "Left realtime channel");
                break;
            }
            _ = ticker.tick() => {
                let beat = ChannelMessage::heartbeat(&next_ref.to_string());
                next_ref += 1;
                if let Err(e) = send_message(&mut stream, &beat).await {
                    tracing::warn!(topic = %topic, error = %e, "Heartbeat failed, closing channel");
                    break;
                }
            }
            frame = stream.next() => {
                let Some(frame) = frame else {
                    tracing::warn!(topic = %topic, "Realtime socket closed by peer");
                    break;
                };
                match frame {
                    Ok(Message::Text(text)) => {
                        if !relay_text(&topic, &text, &tx) {
                            break;
                        }
                    }
                    Ok(Message::Ping(payload)) => {
                        if stream.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::warn!(topic = %topic, "Realtime socket closed by peer");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "Realtime socket error");
                        break;
                    }
                }
            }
        }
    }
}

/// Handle one text frame; returns false when the channel should end
fn relay_text(topic: &str, text: &str, tx: &mpsc::UnboundedSender<RawChange>) -> bool {
    let msg = match serde_json::from_str::<ChannelMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(topic = %topic, error = %e, "Dropping unparseable realtime frame");
            return true;
        }
    };

    if (msg.event == "phx_error" || msg.event == "phx_close") && msg.topic == topic {
        tracing::warn!(topic = %topic, event = %msg.event, "Realtime channel ended by server");
        return false;
    }
    if msg.event != "postgres_changes" {
        return true;
    }

    match msg.into_change() {
        // Receiver gone means the subscriber was torn down
        Some(change) => tx.send(change).is_ok(),
        None => {
            tracing::warn!(topic = %topic, "Dropping malformed change payload");
            true
        }
    }
}

async fn send_message(stream: &mut WsStream, msg: &ChannelMessage) -> Result<(), FeedError> {
    let text = serde_json::to_string(msg).map_err(|e| FeedError::Connect(e.to_string()))?;
    stream.send(Message::Text(text)).await?;
    Ok(())
}
