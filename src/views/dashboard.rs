//! Dashboard views derived from the token and tweet snapshots

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::quartile::{sentiment_distribution, TokenDistribution};
use super::rank::{filter_trailing_window, top_by_field, top_by_tweet_volume, TokenVolume};
use crate::model::{Token, TokenField, TrailingWindow, Tweet};
use crate::store::{LoadState, Snapshot};

/// Parameters for recomputing dashboard views
#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Field the leaderboard is ordered by
    pub leaderboard_field: TokenField,
    pub leaderboard_size: usize,
    /// Trailing window for trending and distribution, in hours
    pub trending_window_hours: i64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            leaderboard_field: TokenField::SentimentScore,
            leaderboard_size: 50,
            trending_window_hours: 24,
        }
    }
}

/// One consistent set of derived views
///
/// Replaced wholesale on every recomputation; never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardViews {
    pub leaderboard: Vec<Token>,
    /// Top-3 podium by tweet volume
    pub podium: Vec<TokenVolume>,
    /// Top-5 trending by tweet volume
    pub trending: Vec<TokenVolume>,
    pub distribution: Vec<TokenDistribution>,
    pub tweets_in_window: usize,
    pub tokens_state: LoadState,
    pub tweets_state: LoadState,
    pub computed_at: DateTime<Utc>,
}

impl DashboardViews {
    /// Views over empty collections
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            leaderboard: Vec::new(),
            podium: Vec::new(),
            trending: Vec::new(),
            distribution: Vec::new(),
            tweets_in_window: 0,
            tokens_state: LoadState::Idle,
            tweets_state: LoadState::Idle,
            computed_at: now,
        }
    }

    pub fn compute(
        tokens: &Snapshot<Token>,
        tweets: &Snapshot<Tweet>,
        settings: &ViewSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let window = TrailingWindow::hours(settings.trending_window_hours);
        let recent = filter_trailing_window(
            &tweets.items,
            settings.trending_window_hours,
            |t| t.created_at,
            now,
        );

        let trending = top_by_tweet_volume(&tokens.items, &recent, 5, window, now);
        let podium = trending.iter().take(3).cloned().collect();

        Self {
            leaderboard: top_by_field(
                &tokens.items,
                settings.leaderboard_field,
                settings.leaderboard_size,
            ),
            podium,
            trending,
            distribution: sentiment_distribution(&tokens.items, &recent),
            tweets_in_window: recent.len(),
            tokens_state: tokens.load_state.clone(),
            tweets_state: tweets.load_state.clone(),
            computed_at: now,
        }
    }

    /// Both collections finished their initial load
    pub fn is_ready(&self) -> bool {
        self.tokens_state.is_ready() && self.tweets_state.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn snapshot<E>(items: Vec<E>) -> Snapshot<E> {
        Snapshot {
            items,
            load_state: LoadState::Ready,
            version: 1,
        }
    }

    #[test]
    fn test_compute_views() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let tokens = snapshot(vec![
            Token::new("PEPE").sentiment(40.0),
            Token::new("WIF").sentiment(90.0),
            Token::new("BONK").sentiment(65.0),
            Token::new("POPCAT"),
        ]);
        let tweets = snapshot(vec![
            Tweet::new("1", "bonk", now - Duration::hours(1)).sentiment(70.0),
            Tweet::new("2", "bonk", now - Duration::hours(2)).sentiment(50.0),
            Tweet::new("3", "pepe", now - Duration::hours(3)).sentiment(20.0),
            Tweet::new("4", "wif", now - Duration::hours(48)).sentiment(99.0),
        ]);

        let views = DashboardViews::compute(&tokens, &tweets, &ViewSettings::default(), now);

        let leaders: Vec<_> = views.leaderboard.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(leaders, vec!["WIF", "BONK", "PEPE", "POPCAT"]);

        let trending: Vec<_> = views
            .trending
            .iter()
            .map(|v| (v.token.symbol.as_str(), v.tweet_count))
            .collect();
        assert_eq!(
            trending,
            vec![("BONK", 2), ("PEPE", 1), ("WIF", 0), ("POPCAT", 0)]
        );
        assert_eq!(views.podium.len(), 3);

        // WIF's only tweet is outside the window
        let distributed: Vec<_> = views.distribution.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(distributed, vec!["PEPE", "BONK"]);
        assert_eq!(views.tweets_in_window, 3);
        assert!(views.is_ready());
    }

    #[test]
    fn test_oversized_window_setting_saturates() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let tokens = snapshot(vec![Token::new("WIF")]);
        let tweets = snapshot(vec![
            Tweet::new("1", "wif", now - Duration::days(3650)).sentiment(80.0),
        ]);
        let settings = ViewSettings {
            trending_window_hours: i64::MAX,
            ..ViewSettings::default()
        };

        let views = DashboardViews::compute(&tokens, &tweets, &settings, now);

        assert_eq!(views.tweets_in_window, 1);
        assert_eq!(views.trending[0].tweet_count, 1);
    }

    #[test]
    fn test_empty_views_not_ready() {
        let views = DashboardViews::empty(Utc::now());
        assert!(views.leaderboard.is_empty());
        assert!(!views.is_ready());
    }
}
