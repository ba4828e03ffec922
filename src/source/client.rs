//! Bulk/Search API Client
//!
//! HTTP client for the dashboard backend. Table reads follow PostgREST
//! conventions (`/rest/v1/{table}?select=*&offset=..&limit=..`); token search
//! hits the enrichment endpoint.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

use super::error::{SourceError, SourceResult};
use super::loader::PageSource;
use crate::model::{Entity, Token, Tweet};

/// Configuration for the source client
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the backend (e.g. "https://project.supabase.co")
    pub base_url: String,
    /// Anonymous API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: None,
            request_timeout_ms: 10_000,
        }
    }
}

/// Row filter and ordering for a table read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    /// PostgREST filters as (column, "op.value")
    pub filters: Vec<(String, String)>,
    /// Ordering clause, e.g. "created_at.asc"
    pub order: Option<String>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add `column=eq.value`
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Builder: add `column=gte.value`
    pub fn gte(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("gte.{}", value)));
        self
    }

    /// Builder: add `column=lte.value`
    pub fn lte(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("lte.{}", value)));
        self
    }

    /// Builder: set ordering
    pub fn order(mut self, order: &str) -> Self {
        self.order = Some(order.to_string());
        self
    }
}

/// HTTP client for table reads and token search
pub struct SourceClient {
    client: Client,
    config: SourceConfig,
}

impl SourceClient {
    /// Create a new client with the given configuration
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Build the URL for one page of a table read
    pub fn table_url(&self, table: &str, query: &TableQuery, offset: usize, limit: usize) -> String {
        let mut url = format!(
            "{}/rest/v1/{}?select=*",
            self.config.base_url.trim_end_matches('/'),
            table
        );

        for (column, filter) in &query.filters {
            url.push_str(&format!(
                "&{}={}",
                urlencoding::encode(column),
                urlencoding::encode(filter)
            ));
        }
        if let Some(order) = &query.order {
            url.push_str(&format!("&order={}", urlencoding::encode(order)));
        }
        url.push_str(&format!("&offset={}&limit={}", offset, limit));
        url
    }

    /// Build the URL for a token search
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/api/search?query={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(query.trim())
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    /// Check if the backend answers at all
    pub async fn health_check(&self) -> SourceResult<()> {
        let url = format!("{}/rest/v1/", self.config.base_url.trim_end_matches('/'));

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(SourceError::from_transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SourceError::Unavailable)
        }
    }

    /// Fetch one page of rows from a table
    pub async fn fetch_rows<E: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
        offset: usize,
        limit: usize,
    ) -> SourceResult<Vec<E>> {
        let url = self.table_url(table, query, offset, limit);
        self.get_json(&url).await
    }

    /// Look up enriched metadata for a symbol or address
    pub async fn search_token(&self, query: &str) -> SourceResult<Vec<TokenProfile>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = self.search_url(query);
        let response: SearchResponse = self.get_json(&url).await?;
        Ok(response.results)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(SourceError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.bytes().await.map_err(SourceError::from_transport)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// A paged view of one table through a [`SourceClient`]
pub struct TableSource<E> {
    client: Arc<SourceClient>,
    query: TableQuery,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> TableSource<E> {
    pub fn new(client: Arc<SourceClient>, query: TableQuery) -> Self {
        Self {
            client,
            query,
            _entity: PhantomData,
        }
    }

    pub fn query(&self) -> &TableQuery {
        &self.query
    }
}

impl TableSource<Token> {
    /// Active tokens only
    pub fn active_tokens(client: Arc<SourceClient>) -> Self {
        Self::new(client, TableQuery::new().eq("is_active", "true"))
    }
}

impl TableSource<Tweet> {
    /// Tweets created at or after `since`, oldest first
    pub fn tweets_since(client: Arc<SourceClient>, since: DateTime<Utc>) -> Self {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        Self::new(
            client,
            TableQuery::new()
                .gte("created_at", &since)
                .order("created_at.asc"),
        )
    }
}

#[async_trait]
impl<E: Entity> PageSource<E> for TableSource<E> {
    async fn fetch_page(&self, offset: usize, limit: usize) -> SourceResult<Vec<E>> {
        self.client
            .fetch_rows(E::TABLE, &self.query, offset, limit)
            .await
    }
}

// ============================================
// Search DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TokenProfile>,
}

/// Enriched token metadata from the search endpoint
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TokenProfile {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client(base_url: &str) -> SourceClient {
        SourceClient::new(SourceConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();
        assert_eq!(config.base_url, "http://localhost:54321");
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_table_url_plain() {
        let client = client("http://api.local/");
        let url = client.table_url("tokens", &TableQuery::new(), 0, 1000);
        assert_eq!(
            url,
            "http://api.local/rest/v1/tokens?select=*&offset=0&limit=1000"
        );
    }

    #[test]
    fn test_table_url_filters_encoded() {
        let client = client("http://api.local");
        let query = TableQuery::new()
            .gte("created_at", "2024-05-01T00:00:00+00:00")
            .order("created_at.asc");
        let url = client.table_url("tweets", &query, 200, 100);
        assert_eq!(
            url,
            "http://api.local/rest/v1/tweets?select=*\
             &created_at=gte.2024-05-01T00%3A00%3A00%2B00%3A00\
             &order=created_at.asc&offset=200&limit=100"
        );
    }

    #[test]
    fn test_active_tokens_query() {
        let source = TableSource::active_tokens(Arc::new(client("http://api.local")));
        assert_eq!(
            source.query().filters,
            vec![("is_active".to_string(), "eq.true".to_string())]
        );
    }

    #[test]
    fn test_tweets_since_query() {
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let source = TableSource::tweets_since(Arc::new(client("http://api.local")), since);
        assert_eq!(
            source.query().filters,
            vec![("created_at".to_string(), "gte.2024-05-01T00:00:00Z".to_string())]
        );
        assert_eq!(source.query().order.as_deref(), Some("created_at.asc"));
    }

    #[test]
    fn test_search_url() {
        let client = client("http://api.local");
        assert_eq!(
            client.search_url(" dog wif "),
            "http://api.local/api/search?query=dog%20wif"
        );
    }

    #[test]
    fn test_search_response_defaults() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());

        let response: SearchResponse =
            serde_json::from_str(r#"{"results": [{"symbol": "WIF", "price_usd": 2.1}]}"#)
                .unwrap();
        assert_eq!(response.results[0].price_usd, Some(2.1));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let client = SourceClient::new(SourceConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_ms: 500,
            ..Default::default()
        })
        .unwrap();

        let result: SourceResult<Vec<Token>> = client
            .fetch_rows("tokens", &TableQuery::new(), 0, 10)
            .await;
        assert!(result.is_err());
    }
}
