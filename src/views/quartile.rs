//! Quartile Bucketing
//!
//! Five-number summaries for box-plot rendering. Quartiles are read at fixed
//! floor indices of the sorted sample (`n/4`, `n/2`, `3n/4`) with no
//! interpolation, so results line up with previously rendered charts.

use serde::Serialize;
use std::collections::HashMap;

use crate::model::{Entity, IdentityKey, Token, Tweet};

/// Box-plot summary of one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlot {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Values beyond 1.5 IQR of the quartiles, ascending
    pub outliers: Vec<f64>,
    /// Sample size
    pub count: usize,
}

impl BoxPlot {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Summarize a sample; `None` when it has no finite values
pub fn box_plot(values: &[f64]) -> Option<BoxPlot> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let q1 = sorted[n / 4];
    let median = sorted[n / 2];
    let q3 = sorted[(3 * n) / 4];
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    Some(BoxPlot {
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[n - 1],
        outliers: sorted.iter().copied().filter(|v| *v < low || *v > high).collect(),
        count: n,
    })
}

/// Sentiment box plot for one token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenDistribution {
    pub symbol: String,
    pub name: String,
    #[serde(flatten)]
    pub plot: BoxPlot,
}

/// Per-token distribution of tweet sentiment scores
///
/// Follows the order of `tokens`. Tokens with no scored tweets are left out.
pub fn sentiment_distribution(tokens: &[Token], tweets: &[Tweet]) -> Vec<TokenDistribution> {
    let mut scores: HashMap<IdentityKey, Vec<f64>> = HashMap::new();
    for tweet in tweets {
        if let Some(score) = tweet.sentiment_score {
            scores.entry(tweet.token_key()).or_default().push(score);
        }
    }

    tokens
        .iter()
        .filter_map(|token| {
            let plot = box_plot(scores.get(&token.identity_key())?)?;
            Some(TokenDistribution {
                symbol: token.symbol.clone(),
                name: token.name.clone(),
                plot,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_outlier_and_median() {
        let plot = box_plot(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 100.0]).unwrap();

        assert_eq!(plot.median, 5.0);
        assert_eq!(plot.q1, 3.0);
        assert_eq!(plot.q3, 7.0);
        assert_eq!(plot.outliers, vec![100.0]);
        assert_eq!(plot.min, 1.0);
        assert_eq!(plot.max, 100.0);
        assert_eq!(plot.count, 9);
    }

    #[test]
    fn test_unsorted_input() {
        let plot = box_plot(&[8.0, 1.0, 4.0, 2.0]).unwrap();
        // n = 4: indices 1, 2, 3
        assert_eq!(plot.q1, 2.0);
        assert_eq!(plot.median, 4.0);
        assert_eq!(plot.q3, 8.0);
        assert!(plot.outliers.is_empty());
    }

    #[test]
    fn test_single_value() {
        let plot = box_plot(&[42.0]).unwrap();
        assert_eq!(plot.min, 42.0);
        assert_eq!(plot.median, 42.0);
        assert_eq!(plot.max, 42.0);
        assert_eq!(plot.iqr(), 0.0);
    }

    #[test]
    fn test_empty_and_non_finite() {
        assert!(box_plot(&[]).is_none());
        assert!(box_plot(&[f64::NAN, f64::INFINITY]).is_none());
        assert_eq!(box_plot(&[f64::NAN, 3.0]).unwrap().count, 1);
    }

    #[test]
    fn test_distribution_excludes_unscored_tokens() {
        let now = Utc::now();
        let tokens = vec![
            Token::new("PEPE").name("Pepe"),
            Token::new("WIF"),
            Token::new("BONK"),
        ];
        let tweets = vec![
            Tweet::new("1", "pepe", now).sentiment(60.0),
            Tweet::new("2", "PEPE", now).sentiment(80.0),
            Tweet::new("3", "bonk", now).sentiment(10.0),
            // Unscored tweet does not make WIF eligible
            Tweet::new("4", "wif", now),
        ];

        let distribution = sentiment_distribution(&tokens, &tweets);

        let symbols: Vec<_> = distribution.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["PEPE", "BONK"]);
        assert_eq!(distribution[0].name, "Pepe");
        assert_eq!(distribution[0].plot.count, 2);
        assert_eq!(distribution[0].plot.median, 80.0);
    }
}
