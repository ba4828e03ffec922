//! Observed social-media posts about a token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::identity::{Entity, IdentityKey};

/// A tweet as stored in the `tweets` table
///
/// Tweets are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tweet {
    /// Tweet id; numeric ids are accepted and kept as strings
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Symbol of the token this tweet mentions (lower-cased at source)
    pub token_symbol: String,
    pub created_at: DateTime<Utc>,
    /// Per-tweet sentiment score
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub author_username: String,
    #[serde(default)]
    pub author_followers: u64,
    #[serde(default)]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl Tweet {
    pub fn new(
        id: impl Into<String>,
        token_symbol: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            token_symbol: token_symbol.into(),
            created_at,
            sentiment_score: None,
            author_username: String::new(),
            author_followers: 0,
            author_avatar: None,
            url: String::new(),
        }
    }

    /// Builder: set sentiment score
    pub fn sentiment(mut self, score: f64) -> Self {
        self.sentiment_score = Some(score);
        self
    }

    /// Identity key of the token this tweet belongs to
    pub fn token_key(&self) -> IdentityKey {
        IdentityKey::new(&self.token_symbol)
    }
}

impl Entity for Tweet {
    const TABLE: &'static str = "tweets";
    const IDENTITY_FIELD: &'static str = "id";

    fn raw_identity(&self) -> &str {
        &self.id
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweet_numeric_id() {
        let json = r#"{"id": 1790000000000000001, "token_symbol": "pepe",
                       "created_at": "2024-05-01T12:00:00Z", "sentiment_score": 0.8}"#;
        let tweet: Tweet = serde_json::from_str(json).unwrap();
        assert_eq!(tweet.id, "1790000000000000001");
        assert_eq!(tweet.sentiment_score, Some(0.8));
        assert_eq!(tweet.author_followers, 0);
    }

    #[test]
    fn test_tweet_rejects_object_id() {
        let json = r#"{"id": {"x": 1}, "token_symbol": "pepe", "created_at": "2024-05-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<Tweet>(json).is_err());
    }

    #[test]
    fn test_tweet_token_key() {
        let tweet = Tweet::new("1", " PEPE", Utc::now());
        assert_eq!(tweet.token_key(), IdentityKey::new("pepe"));
    }
}
