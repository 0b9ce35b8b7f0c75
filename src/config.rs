use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAPBOX_API_URL: &str = "https://api.mapbox.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per client key inside one window. Zero disables limiting.
    pub max_requests: u64,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0 && !self.window.is_zero()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub mapbox_access_token: Option<String>,
    pub mapbox_api_url: String,
    pub directions_timeout: Duration,
    pub rate_limit: RateLimitConfig,
    pub redis_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_raw = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| Error::config(format!("BIND_ADDR '{bind_raw}': {e}")))?;

        let defaults = RateLimitConfig::default();

        Ok(Self {
            bind_addr,
            mapbox_access_token: env_non_empty("MAPBOX_ACCESS_TOKEN"),
            mapbox_api_url: env_non_empty("MAPBOX_API_URL")
                .unwrap_or_else(|| DEFAULT_MAPBOX_API_URL.to_string()),
            directions_timeout: Duration::from_millis(env_u64("DIRECTIONS_TIMEOUT_MS", 10_000)),
            rate_limit: RateLimitConfig {
                max_requests: env_u64("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
                window: Duration::from_secs(env_u64(
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.window.as_secs(),
                )),
            },
            redis_url: env_non_empty("REDIS_URL"),
        })
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
