use std::{env, str::FromStr, time::Duration};

use booksync_core::events::{BackoffPolicy, PublishRetryPolicy};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Cache TTL in seconds (default: 60)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "booksync.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL for the cache (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
    /// Broker URL for the event bus (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub broker_url: String,
    /// Durable consumer group (default: "booksync-group")
    pub consumer_group: String,
    /// Consumer name inside the group (default: "booksync-consumer")
    #[allow(dead_code)]
    pub consumer_name: String,
    /// Resend attempts after an unknown-topic failure (default: 1)
    pub publish_retry_attempts: u32,
    /// Wait before each resend in milliseconds (default: 2000)
    pub publish_retry_backoff_ms: u64,
    /// Subscriber connection attempts (default: 8)
    pub connect_max_attempts: u32,
    /// First subscriber reconnect delay in milliseconds (default: 300)
    pub connect_initial_backoff_ms: u64,
    /// Cap on the subscriber reconnect delay in milliseconds (default: 30000)
    pub connect_max_backoff_ms: u64,
    /// Deadline for each cache and bus call in milliseconds (default: 2000)
    pub backend_timeout_ms: u64,
    /// Deadline for each repository call in milliseconds (default: 10000)
    pub store_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 60)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "booksync.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `BROKER_URL` - Event bus URL (default: "redis://localhost:6379")
    /// - `BUS_CONSUMER_GROUP` - Consumer group (default: "booksync-group")
    /// - `BUS_CONSUMER_NAME` - Consumer name (default: "booksync-consumer")
    /// - `PUBLISH_RETRY_ATTEMPTS` - Publish resends (default: 1)
    /// - `PUBLISH_RETRY_BACKOFF_MS` - Delay before a resend (default: 2000)
    /// - `CONNECT_MAX_ATTEMPTS` - Subscriber connect attempts (default: 8)
    /// - `CONNECT_INITIAL_BACKOFF_MS` - First reconnect delay (default: 300)
    /// - `CONNECT_MAX_BACKOFF_MS` - Reconnect delay cap (default: 30000)
    /// - `BACKEND_TIMEOUT_MS` - Cache and bus call deadline (default: 2000)
    /// - `STORE_TIMEOUT_MS` - Repository call deadline (default: 10000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            cache_ttl_seconds: parse_or(lookup("CACHE_TTL_SECONDS"), 60),
            cache_max_entries: parse_or(lookup("CACHE_MAX_ENTRIES"), 10_000),
            sqlite_path: text("SQLITE_PATH", "booksync.db"),
            redis_url: text("REDIS_URL", "redis://localhost:6379"),
            broker_url: text("BROKER_URL", "redis://localhost:6379"),
            consumer_group: text("BUS_CONSUMER_GROUP", "booksync-group"),
            consumer_name: text("BUS_CONSUMER_NAME", "booksync-consumer"),
            publish_retry_attempts: parse_or(lookup("PUBLISH_RETRY_ATTEMPTS"), 1),
            publish_retry_backoff_ms: parse_or(lookup("PUBLISH_RETRY_BACKOFF_MS"), 2_000),
            connect_max_attempts: parse_or(lookup("CONNECT_MAX_ATTEMPTS"), 8),
            connect_initial_backoff_ms: parse_or(lookup("CONNECT_INITIAL_BACKOFF_MS"), 300),
            connect_max_backoff_ms: parse_or(lookup("CONNECT_MAX_BACKOFF_MS"), 30_000),
            backend_timeout_ms: parse_or(lookup("BACKEND_TIMEOUT_MS"), 2_000),
            store_timeout_ms: parse_or(lookup("STORE_TIMEOUT_MS"), 10_000),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn publish_retry(&self) -> PublishRetryPolicy {
        PublishRetryPolicy::new(
            self.publish_retry_attempts,
            Duration::from_millis(self.publish_retry_backoff_ms),
        )
    }

    /// Subscriber connect backoff. Multiplier and jitter keep their defaults.
    pub fn connect_backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.connect_max_attempts.max(1),
            initial_delay: Duration::from_millis(self.connect_initial_backoff_ms),
            max_delay: Duration::from_millis(self.connect_max_backoff_ms),
            ..BackoffPolicy::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
