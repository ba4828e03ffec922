//! Stream Route
//!
//! - GET /api/v1/stream - WebSocket push of dashboard views and new-token notices
//!
//! The current views are sent on connect, then again after every
//! recomputation. Client frames other than close are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::api::state::AppState;
use crate::model::Token;
use crate::store::StoreNotice;
use crate::views::DashboardViews;

/// Messages pushed to stream clients
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Views { views: DashboardViews },
    NewToken { token: Token },
    Lagged { skipped: u64 },
}

/// WebSocket upgrade handler
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut views = state.views.clone();
    let mut notices = state.tokens.notices();
    let connection_id = uuid::Uuid::new_v4().to_string();

    tracing::debug!(connection_id = %connection_id, "Stream client connected");

    let initial = StreamMessage::Views {
        views: views.borrow_and_update().as_ref().clone(),
    };
    if send(&mut sender, &initial).await.is_err() {
        return;
    }

    loop {
        let message = tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                StreamMessage::Views { views: views.borrow_and_update().as_ref().clone() }
            }
            notice = notices.recv() => match notice {
                Ok(StoreNotice::Added(token)) => StreamMessage::NewToken { token },
                Err(RecvError::Lagged(skipped)) => StreamMessage::Lagged { skipped },
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        };

        if send(&mut sender, &message).await.is_err() {
            break;
        }
    }

    tracing::debug!(connection_id = %connection_id, "Stream client disconnected");
}

async fn send<S>(sender: &mut S, message: &StreamMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = serde_json::to_string(message).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize stream message");
    })?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shape() {
        let msg = StreamMessage::NewToken {
            token: Token::new("PEPE"),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "new_token");
        assert_eq!(json["token"]["symbol"], "PEPE");

        let lagged = serde_json::to_value(StreamMessage::Lagged { skipped: 3 }).unwrap();
        assert_eq!(lagged["type"], "lagged");
        assert_eq!(lagged["skipped"], 3);
    }
}
