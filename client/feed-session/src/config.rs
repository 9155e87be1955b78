//! Configuration management for the feed client
//!
//! Loads configuration from environment variables.

use crate::models::normalize::DEFAULT_PLACEHOLDER_THUMBNAIL;
use crate::services::{DEFAULT_AVATAR_BUCKET, DEFAULT_MEDIA_BUCKET};
use crate::session::{SessionOptions, DEFAULT_PAGE_SIZE};
use anyhow::{Context, Result};
use remote_store::{RestStoreConfig, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
}

/// Remote store connection
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project URL
    pub url: String,
    /// Public API key
    pub anon_key: String,
    /// Signed-in user's token
    pub access_token: Option<String>,
    /// Signed-in user's id; guest when unset
    pub user_id: Option<String>,
    pub media_bucket: String,
    pub avatar_bucket: String,
    /// Timeout for table queries, seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for object uploads, seconds
    #[serde(default = "default_storage_timeout_secs")]
    pub storage_timeout_secs: u64,
}

// Keys stay out of logs
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("media_bucket", &self.media_bucket)
            .field("avatar_bucket", &self.avatar_bucket)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("storage_timeout_secs", &self.storage_timeout_secs)
            .finish()
    }
}

/// Feed behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Rows per load, 1..=100
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    pub placeholder_thumbnail: String,
}

// Default values
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_storage_timeout_secs() -> u64 {
    120
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        let store = StoreConfig {
            url: env_non_empty("LIMEY_STORE_URL")
                .context("LIMEY_STORE_URL environment variable not set")?,
            anon_key: env_non_empty("LIMEY_STORE_ANON_KEY")
                .context("LIMEY_STORE_ANON_KEY environment variable not set")?,
            access_token: env_non_empty("LIMEY_ACCESS_TOKEN"),
            user_id: env_non_empty("LIMEY_USER_ID"),
            media_bucket: env_non_empty("LIMEY_MEDIA_BUCKET")
                .unwrap_or_else(|| DEFAULT_MEDIA_BUCKET.to_string()),
            avatar_bucket: env_non_empty("LIMEY_AVATAR_BUCKET")
                .unwrap_or_else(|| DEFAULT_AVATAR_BUCKET.to_string()),
            request_timeout_secs: env_parse::<u64>("STORE_REQUEST_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or_else(default_request_timeout_secs),
            storage_timeout_secs: env_parse::<u64>("STORAGE_REQUEST_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or_else(default_storage_timeout_secs),
        };

        let feed = FeedConfig {
            page_size: env_parse::<usize>("FEED_PAGE_SIZE")
                .unwrap_or_else(default_page_size)
                .clamp(1, MAX_PAGE_SIZE),
            placeholder_thumbnail: env_non_empty("LIMEY_PLACEHOLDER_THUMBNAIL")
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_THUMBNAIL.to_string()),
        };

        Ok(Config { app, store, feed })
    }

    pub fn rest_store_config(&self) -> RestStoreConfig {
        let mut config = RestStoreConfig::new(&self.store.url, &self.store.anon_key);
        config.query_timeout = Duration::from_secs(self.store.request_timeout_secs);
        config.storage_timeout = Duration::from_secs(self.store.storage_timeout_secs);
        if let Some(token) = &self.store.access_token {
            config = config.with_access_token(token);
        }
        config
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            page_size: self.feed.page_size,
            placeholder_thumbnail: self.feed.placeholder_thumbnail.clone(),
            ..Default::default()
        }
    }
}
