//! Configuration Module
//!
//! Loads cache configuration from environment variables once at startup.

use std::env;
use std::str::FromStr;

/// Cache and server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Use the Redis tier at all (false = memory only)
    pub redis_enabled: bool,
    /// Redis host
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Optional Redis password
    pub redis_password: Option<String>,
    /// Redis logical database
    pub redis_db: u32,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Per-command timeout in milliseconds
    pub operation_timeout_ms: u64,
    /// Seconds between reconnection probes while in fallback
    pub reconnect_interval: u64,
    /// Seconds between sweeps of expired memory entries
    pub sweep_interval: u64,
    /// Default product TTL in seconds
    pub product_ttl: u64,
    /// Default cart TTL in seconds
    pub cart_ttl: u64,
    /// Default query-result TTL in seconds
    pub query_ttl: u64,
    /// Default session TTL in seconds
    pub session_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_ENABLED` - Use Redis (default: true)
    /// - `REDIS_HOST` - Redis host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Redis port (default: 6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none)
    /// - `REDIS_DB` - Redis database index (default: 0)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 3000)
    /// - `REDIS_OPERATION_TIMEOUT_MS` - Command timeout (default: 1000)
    /// - `RECONNECT_INTERVAL` - Probe frequency in seconds (default: 10)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `PRODUCT_TTL`, `CART_TTL`, `QUERY_TTL`, `SESSION_TTL` - Entity TTLs
    ///   (defaults: 3600, 1800, 600, 7200)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            redis_enabled: env_or("REDIS_ENABLED", defaults.redis_enabled),
            redis_host: env::var("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: env_or("REDIS_PORT", defaults.redis_port),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            redis_db: env_or("REDIS_DB", defaults.redis_db),
            connect_timeout_ms: env_or("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            operation_timeout_ms: env_or(
                "REDIS_OPERATION_TIMEOUT_MS",
                defaults.operation_timeout_ms,
            ),
            reconnect_interval: env_or("RECONNECT_INTERVAL", defaults.reconnect_interval),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            product_ttl: env_or("PRODUCT_TTL", defaults.product_ttl),
            cart_ttl: env_or("CART_TTL", defaults.cart_ttl),
            query_ttl: env_or("QUERY_TTL", defaults.query_ttl),
            session_ttl: env_or("SESSION_TTL", defaults.session_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Connection URL for the Redis client, credentials included.
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis_host, self.redis_port, self.redis_db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis_host, self.redis_port, self.redis_db
            ),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_enabled: true,
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            redis_password: None,
            redis_db: 0,
            connect_timeout_ms: 3000,
            operation_timeout_ms: 1000,
            reconnect_interval: 10,
            sweep_interval: 60,
            product_ttl: 3600,
            cart_ttl: 1800,
            query_ttl: 600,
            session_ttl: 7200,
            server_port: 3000,
        }
    }
}
