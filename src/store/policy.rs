//! Per-entity merge rules

use chrono::{DateTime, Utc};

use crate::model::{Token, TrailingWindow, Tweet};

/// Entity-specific rules applied by a synchronized collection
pub trait MergePolicy<E>: Send + Sync {
    /// Whether a realtime insert arriving at `now` is accepted
    fn admit(&self, _entity: &E, _now: DateTime<Utc>) -> bool {
        true
    }

    /// Whether an entity belongs in the live collection at all
    fn is_live(&self, _entity: &E) -> bool {
        true
    }

    /// Whether a held entity has aged out at `now`
    fn expired(&self, _entity: &E, _now: DateTime<Utc>) -> bool {
        false
    }

    /// Whether first-time inserts broadcast a "new entity" notice
    fn announces_new(&self) -> bool {
        false
    }
}

/// Tokens: inactive tokens leave the collection; new tokens are announced
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenPolicy;

impl MergePolicy<Token> for TokenPolicy {
    fn is_live(&self, token: &Token) -> bool {
        token.is_active
    }

    fn announces_new(&self) -> bool {
        true
    }
}

/// Tweets: realtime inserts must fall inside the retention window, and held
/// tweets older than it are pruned
#[derive(Debug, Clone, Copy)]
pub struct TweetPolicy {
    retention: TrailingWindow,
}

impl TweetPolicy {
    pub fn new(retention_hours: i64) -> Self {
        Self {
            retention: TrailingWindow::hours(retention_hours),
        }
    }

    pub fn retention(&self) -> TrailingWindow {
        self.retention
    }
}

impl Default for TweetPolicy {
    fn default() -> Self {
        Self::new(24)
    }
}

impl MergePolicy<Tweet> for TweetPolicy {
    fn admit(&self, tweet: &Tweet, now: DateTime<Utc>) -> bool {
        self.retention.contains(tweet.created_at, now)
    }

    fn expired(&self, tweet: &Tweet, now: DateTime<Utc>) -> bool {
        let (start, _) = self.retention.bounds(now);
        tweet.created_at < start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_policy() {
        let policy = TokenPolicy;
        assert!(policy.is_live(&Token::new("PEPE")));
        assert!(!policy.is_live(&Token::new("PEPE").active(false)));
        assert!(policy.announces_new());
        assert!(policy.admit(&Token::new("PEPE"), Utc::now()));
    }

    #[test]
    fn test_tweet_policy_retention() {
        let now = Utc::now();
        let policy = TweetPolicy::default();

        let fresh = Tweet::new("1", "pepe", now - Duration::hours(3));
        let stale = Tweet::new("2", "pepe", now - Duration::hours(25));
        let future = Tweet::new("3", "pepe", now + Duration::minutes(5));

        assert!(policy.admit(&fresh, now));
        assert!(!policy.admit(&stale, now));
        assert!(!policy.admit(&future, now));
        assert!(!policy.announces_new());

        assert!(policy.expired(&stale, now));
        assert!(!policy.expired(&fresh, now));
        assert!(!policy.expired(&future, now));
        assert!(!TokenPolicy.expired(&Token::new("PEPE"), now));
    }
}
