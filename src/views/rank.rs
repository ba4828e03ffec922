//! Ranking & Windowing
//!
//! Pure functions over snapshot slices. Every sort here is stable, so equal
//! keys keep the relative order they had in the collection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{Entity, IdentityKey, Token, TokenField, TrailingWindow, Tweet};

/// A token with the number of tweets seen for it in a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenVolume {
    #[serde(flatten)]
    pub token: Token,
    pub tweet_count: usize,
}

/// Missing and non-finite values rank as zero
fn rank_value(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// First `n` records by descending `key`
pub fn top_by<T, F>(records: &[T], key: F, n: usize) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<f64>,
{
    let mut ranked: Vec<(f64, &T)> = records.iter().map(|r| (rank_value(key(r)), r)).collect();
    ranked.sort_by(|a, b| descending(a.0, b.0));
    ranked.into_iter().take(n).map(|(_, r)| r.clone()).collect()
}

/// First `n` tokens by descending `field`
pub fn top_by_field(tokens: &[Token], field: TokenField, n: usize) -> Vec<Token> {
    top_by(tokens, |t| field.value(t), n)
}

/// First `n` tokens by tweet count inside the trailing `window`
///
/// Tweets are matched to tokens by identity key. Tokens without tweets stay
/// eligible and rank after every token that has at least one.
pub fn top_by_tweet_volume(
    tokens: &[Token],
    tweets: &[Tweet],
    n: usize,
    window: TrailingWindow,
    now: DateTime<Utc>,
) -> Vec<TokenVolume> {
    let mut counts: HashMap<IdentityKey, usize> = HashMap::new();
    for tweet in tweets.iter().filter(|t| window.contains(t.created_at, now)) {
        *counts.entry(tweet.token_key()).or_default() += 1;
    }

    let mut ranked: Vec<TokenVolume> = tokens
        .iter()
        .map(|token| TokenVolume {
            tweet_count: counts.get(&token.identity_key()).copied().unwrap_or(0),
            token: token.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| b.tweet_count.cmp(&a.tweet_count));
    ranked.truncate(n);
    ranked
}

/// Records whose timestamp falls in `[now - hours, now]`
pub fn filter_trailing_window<T, F>(
    records: &[T],
    hours: i64,
    time_of: F,
    now: DateTime<Utc>,
) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> DateTime<Utc>,
{
    let window = TrailingWindow::hours(hours);
    records
        .iter()
        .filter(|r| window.contains(time_of(r), now))
        .cloned()
        .collect()
}
