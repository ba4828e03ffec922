//! Change Feed Message Types
//!
//! Wire formats for the realtime change feed and the typed events decoded
//! from them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::{Entity, IdentityKey};

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// All change kinds, for "subscribe to everything"
    pub fn all() -> &'static [ChangeKind] {
        &[ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped change payload as relayed by a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    pub table: String,
    #[serde(rename = "type", alias = "eventType")]
    pub kind: ChangeKind,
    /// Row after the change (insert/update)
    #[serde(default, alias = "new")]
    pub record: Option<Value>,
    /// Row before the change (update/delete)
    #[serde(default, alias = "old")]
    pub old_record: Option<Value>,
}

impl RawChange {
    /// Build an insert payload from any serializable row
    pub fn insert<T: Serialize>(table: &str, row: &T) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            record: serde_json::to_value(row).ok(),
            old_record: None,
        }
    }

    /// Build an update payload from any serializable row
    pub fn update<T: Serialize>(table: &str, row: &T) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Update,
            record: serde_json::to_value(row).ok(),
            old_record: None,
        }
    }

    /// Build a delete payload carrying only the identity column
    pub fn delete(table: &str, identity_field: &str, identity: &str) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Delete,
            record: None,
            old_record: Some(json!({ identity_field: identity })),
        }
    }
}

/// A typed change event, ready to merge
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<E> {
    Insert(E),
    Update(E),
    Delete(IdentityKey),
}

impl<E: Entity> ChangeEvent<E> {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert(_) => ChangeKind::Insert,
            ChangeEvent::Update(_) => ChangeKind::Update,
            ChangeEvent::Delete(_) => ChangeKind::Delete,
        }
    }

    /// Identity key the event refers to
    pub fn key(&self) -> IdentityKey {
        match self {
            ChangeEvent::Insert(e) | ChangeEvent::Update(e) => e.identity_key(),
            ChangeEvent::Delete(key) => key.clone(),
        }
    }

    /// Decode a raw payload against the entity schema
    ///
    /// Unknown shapes and payloads without an identity key are rejected.
    pub fn decode(raw: &RawChange) -> Result<Self, DecodeError> {
        match raw.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let record = raw.record.as_ref().ok_or(DecodeError::MissingRecord)?;
                let entity: E = serde_json::from_value(record.clone())
                    .map_err(|e| DecodeError::Schema(e.to_string()))?;
                if entity.identity_key().is_empty() {
                    return Err(DecodeError::MissingIdentity);
                }
                Ok(if raw.kind == ChangeKind::Insert {
                    ChangeEvent::Insert(entity)
                } else {
                    ChangeEvent::Update(entity)
                })
            }
            ChangeKind::Delete => {
                let old = raw.old_record.as_ref().ok_or(DecodeError::MissingRecord)?;
                let key = identity_from_row(old, E::IDENTITY_FIELD)
                    .ok_or(DecodeError::MissingIdentity)?;
                Ok(ChangeEvent::Delete(key))
            }
        }
    }
}

fn identity_from_row(row: &Value, field: &str) -> Option<IdentityKey> {
    let key = match row.get(field)? {
        Value::String(s) => IdentityKey::new(s),
        Value::Number(n) => IdentityKey::new(&n.to_string()),
        _ => return None,
    };
    (!key.is_empty()).then_some(key)
}

/// Reasons a raw change could not be decoded
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("payload has no record")]
    MissingRecord,

    #[error("payload does not match schema: {0}")]
    Schema(String),

    #[error("payload has no identity key")]
    MissingIdentity,
}

// ============================================
// Phoenix channel protocol
// ============================================

/// Envelope used by the realtime websocket (Phoenix channels)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl ChannelMessage {
    /// Join a table's change topic
    pub fn join(schema: &str, table: &str, kinds: &[ChangeKind], reference: &str) -> Self {
        let changes: Vec<Value> = kinds
            .iter()
            .map(|kind| json!({ "event": kind.as_str(), "schema": schema, "table": table }))
            .collect();

        Self {
            topic: Self::table_topic(schema, table),
            event: "phx_join".to_string(),
            payload: json!({ "config": { "postgres_changes": changes } }),
            reference: Some(reference.to_string()),
        }
    }

    /// Leave a joined topic
    pub fn leave(topic: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_leave".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Connection keepalive
    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn table_topic(schema: &str, table: &str) -> String {
        format!("realtime:{}:{}", schema, table)
    }

    /// Whether this is an `ok` reply to the given request ref
    pub fn is_ok_reply(&self, reference: &str) -> bool {
        self.event == "phx_reply"
            && self.reference.as_deref() == Some(reference)
            && self.payload.get("status").and_then(Value::as_str) == Some("ok")
    }

    /// Extract a row change from a `postgres_changes` push
    pub fn into_change(self) -> Option<RawChange> {
        if self.event != "postgres_changes" {
            return None;
        }
        let data = self.payload.get("data")?.clone();
        serde_json::from_value(data).ok()
    }
}
