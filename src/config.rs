//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `TOKENPULSE_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::TokenField;
use crate::realtime::RealtimeConfig;
use crate::source::SourceConfig;
use crate::views::ViewSettings;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceSection,

    #[serde(default)]
    pub realtime: RealtimeSection,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub views: ViewsSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bulk/search API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Change feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeSection {
    #[serde(default = "default_realtime_url")]
    pub url: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_realtime_url() -> String {
    "ws://localhost:54321".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_heartbeat() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            url: default_realtime_url(),
            schema: default_schema(),
            heartbeat_interval_secs: default_heartbeat(),
            enabled: default_enabled(),
        }
    }
}

/// Bulk load and retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default = "default_token_page_size")]
    pub token_page_size: usize,

    #[serde(default = "default_tweet_page_size")]
    pub tweet_page_size: usize,

    /// Realtime tweets older than this are not admitted
    #[serde(default = "default_retention")]
    pub tweet_retention_hours: i64,

    /// How far back the initial tweet load reaches
    #[serde(default = "default_history")]
    pub tweet_history_hours: i64,
}

fn default_token_page_size() -> usize {
    1000
}

fn default_tweet_page_size() -> usize {
    1000
}

fn default_retention() -> i64 {
    24
}

fn default_history() -> i64 {
    24
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            token_page_size: default_token_page_size(),
            tweet_page_size: default_tweet_page_size(),
            tweet_retention_hours: default_retention(),
            tweet_history_hours: default_history(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Derived view configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewsSection {
    #[serde(default = "default_leaderboard_field")]
    pub leaderboard_field: TokenField,

    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    #[serde(default = "default_trending_window")]
    pub trending_window_hours: i64,

    /// Recompute interval when no events arrive
    #[serde(default = "default_refresh")]
    pub refresh_secs: u64,
}

fn default_leaderboard_field() -> TokenField {
    TokenField::SentimentScore
}

fn default_leaderboard_size() -> usize {
    50
}

fn default_trending_window() -> i64 {
    24
}

fn default_refresh() -> u64 {
    60
}

impl Default for ViewsSection {
    fn default() -> Self {
        Self {
            leaderboard_field: default_leaderboard_field(),
            leaderboard_size: default_leaderboard_size(),
            trending_window_hours: default_trending_window(),
            refresh_secs: default_refresh(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tokenpulse").join("config.toml")),
            Some(PathBuf::from("/etc/tokenpulse/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Source overrides
        if let Some(url) = var("TOKENPULSE_SOURCE_URL") {
            self.source.base_url = url;
        }
        if let Some(key) = var("TOKENPULSE_API_KEY") {
            self.source.api_key = Some(key);
        }

        // Realtime overrides
        if let Some(url) = var("TOKENPULSE_REALTIME_URL") {
            self.realtime.url = url;
        }
        if let Some(enabled) = var("TOKENPULSE_REALTIME_ENABLED") {
            if let Ok(enabled) = enabled.parse() {
                self.realtime.enabled = enabled;
            }
        }

        // Server overrides
        if let Some(host) = var("TOKENPULSE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("TOKENPULSE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        // Logging overrides
        if let Some(level) = var("TOKENPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TOKENPULSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// REST client settings
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            base_url: self.source.base_url.clone(),
            api_key: self.source.api_key.clone(),
            request_timeout_ms: self.source.request_timeout_ms,
        }
    }

    /// Websocket feed settings; the API key is shared with the source
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            url: self.realtime.url.clone(),
            api_key: self.source.api_key.clone(),
            schema: self.realtime.schema.clone(),
            heartbeat_interval_secs: self.realtime.heartbeat_interval_secs,
            ..RealtimeConfig::default()
        }
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            leaderboard_field: self.views.leaderboard_field,
            leaderboard_size: self.views.leaderboard_size,
            trending_window_hours: self.views.trending_window_hours,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# TokenPulse Configuration
#
# Environment variables override these settings:
# - TOKENPULSE_SOURCE_URL
# - TOKENPULSE_API_KEY
# - TOKENPULSE_REALTIME_URL
# - TOKENPULSE_REALTIME_ENABLED
# - TOKENPULSE_HOST
# - TOKENPULSE_PORT
# - TOKENPULSE_LOG_LEVEL
# - TOKENPULSE_LOG_FORMAT

[source]
# Base URL of the bulk fetch / search API
base_url = "http://localhost:54321"

# API key sent as `apikey` and bearer token
# api_key = ""

# Per-request timeout (ms)
request_timeout_ms = 10000

[realtime]
# Realtime websocket base URL
url = "ws://localhost:54321"

# Database schema of the synchronized tables
schema = "public"

# Heartbeat interval (seconds)
heartbeat_interval_secs = 30

# Disable to run on bulk snapshots only
enabled = true

[sync]
# Page sizes for the initial bulk load
token_page_size = 1000
tweet_page_size = 1000

# Realtime tweets older than this are dropped (hours)
tweet_retention_hours = 24

# How far back the initial tweet load reaches (hours)
tweet_history_hours = 24

[server]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

[views]
# Leaderboard order: sentiment_score, market_cap, volume, liquidity, makers, age_hours
leaderboard_field = "sentiment_score"
leaderboard_size = 50

# Trailing window for trending and distribution views (hours)
trending_window_hours = 24

# Recompute interval when no events arrive (seconds)
refresh_secs = 60

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
