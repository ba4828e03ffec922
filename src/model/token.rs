//! Tracked token records

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::identity::Entity;

/// A tracked asset as stored in the `tokens` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// Ticker symbol; identity key after normalization
    pub symbol: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Mint / contract address
    #[serde(default)]
    pub address: String,
    /// Aggregated sentiment score (0-100), absent until scored
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
    /// Number of distinct makers
    #[serde(default)]
    pub makers: Option<u64>,
    /// Hours since the token was first seen
    #[serde(default)]
    pub age_hours: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Token {
    /// Create a token with only a symbol set
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: String::new(),
            address: String::new(),
            sentiment_score: None,
            market_cap: None,
            volume: None,
            liquidity: None,
            makers: None,
            age_hours: None,
            is_active: true,
        }
    }

    /// Builder: set display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set sentiment score
    pub fn sentiment(mut self, score: f64) -> Self {
        self.sentiment_score = Some(score);
        self
    }

    /// Builder: set market cap
    pub fn market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    /// Builder: set volume
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Builder: set active flag
    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

impl Entity for Token {
    const TABLE: &'static str = "tokens";
    const IDENTITY_FIELD: &'static str = "symbol";

    fn raw_identity(&self) -> &str {
        &self.symbol
    }
}

/// Numeric token field usable as a ranking key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenField {
    SentimentScore,
    MarketCap,
    Volume,
    Liquidity,
    Makers,
    AgeHours,
}

impl TokenField {
    /// Read the field from a token; `None` when absent
    pub fn value(&self, token: &Token) -> Option<f64> {
        match self {
            TokenField::SentimentScore => token.sentiment_score,
            TokenField::MarketCap => token.market_cap,
            TokenField::Volume => token.volume,
            TokenField::Liquidity => token.liquidity,
            TokenField::Makers => token.makers.map(|m| m as f64),
            TokenField::AgeHours => token.age_hours,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenField::SentimentScore => "sentiment_score",
            TokenField::MarketCap => "market_cap",
            TokenField::Volume => "volume",
            TokenField::Liquidity => "liquidity",
            TokenField::Makers => "makers",
            TokenField::AgeHours => "age_hours",
        }
    }
}

impl FromStr for TokenField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentiment_score" | "sentiment" | "score" => Ok(TokenField::SentimentScore),
            "market_cap" | "marketcap" | "mcap" => Ok(TokenField::MarketCap),
            "volume" => Ok(TokenField::Volume),
            "liquidity" => Ok(TokenField::Liquidity),
            "makers" => Ok(TokenField::Makers),
            "age_hours" | "age" => Ok(TokenField::AgeHours),
            other => Err(format!("unknown token field: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IdentityKey;

    #[test]
    fn test_token_deserialize_minimal() {
        let token: Token = serde_json::from_str(r#"{"symbol": "PEPE"}"#).unwrap();
        assert_eq!(token.symbol, "PEPE");
        assert!(token.is_active);
        assert!(token.sentiment_score.is_none());
    }

    #[test]
    fn test_token_deserialize_full_row() {
        let json = r#"{
            "symbol": "wif", "name": "dogwifhat", "address": "EKpQ",
            "sentiment_score": 71.5, "market_cap": 2500000000.0, "volume": 1.0e8,
            "liquidity": 3.2e7, "makers": 1200, "age_hours": 4000.0, "is_active": false
        }"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.makers, Some(1200));
        assert!(!token.is_active);
        assert_eq!(TokenField::MarketCap.value(&token), Some(2.5e9));
    }

    #[test]
    fn test_token_identity_is_case_insensitive() {
        let a = Token::new("BONK");
        let b = Token::new(" bonk ");
        assert!(a.same_identity(&b));
        assert_eq!(a.identity_key(), IdentityKey::new("bonk"));
    }

    #[test]
    fn test_token_field_parse() {
        assert_eq!("mcap".parse::<TokenField>().unwrap(), TokenField::MarketCap);
        assert_eq!(
            "Sentiment".parse::<TokenField>().unwrap(),
            TokenField::SentimentScore
        );
        assert!("price".parse::<TokenField>().is_err());
    }
}
