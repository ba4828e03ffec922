//! Change feed transport abstraction
//!
//! A [`ChangeFeed`] opens one raw change stream per table. The stream is
//! handed out as a [`FeedChannel`]; closing or dropping the channel releases
//! the transport-side subscription.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::messages::{ChangeKind, RawChange};

/// A transport able to stream row changes for a table
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a change stream for `table`, limited to `kinds`
    async fn open(&self, table: &str, kinds: &[ChangeKind]) -> Result<FeedChannel, FeedError>;
}

/// Receiving end of one opened change stream
pub struct FeedChannel {
    id: String,
    table: String,
    events: mpsc::UnboundedReceiver<RawChange>,
    release: Option<oneshot::Sender<()>>,
}

impl FeedChannel {
    /// Wrap a receiver; `release` is signalled once when the channel closes
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        events: mpsc::UnboundedReceiver<RawChange>,
        release: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            events,
            release: Some(release),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Next change, or `None` once the transport side is gone
    pub async fn recv(&mut self) -> Option<RawChange> {
        self.events.recv().await
    }

    /// Release the transport subscription; safe to call repeatedly
    pub fn close(&mut self) {
        if let Some(release) = self.release.take() {
            // The transport may already be gone
            let _ = release.send(());
        }
        self.events.close();
    }
}

impl Drop for FeedChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Errors raised while opening a change stream
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Join rejected for {topic}: {reason}")]
    JoinRejected { topic: String, reason: String },

    #[error("Join timed out for {0}")]
    JoinTimeout(String),

    #[error("Too many subscribers (limit: {0})")]
    TooManySubscribers(usize),

    #[error("Feed closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Connect(err.to_string())
    }
}
