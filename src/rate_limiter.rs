use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

/// Admission check for callers of the optimize endpoint.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one request against `key`; `false` means the caller is over its budget.
    async fn check_and_consume(&self, key: &str) -> bool;
}

pub struct NoopLimiter;

#[async_trait]
impl RateLimiter for NoopLimiter {
    async fn check_and_consume(&self, _key: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u64,
}

/// Fixed-window counter kept in process memory. Only suitable when a single instance
/// serves all traffic; use the redis-backed limiter otherwise.
pub struct FixedWindowLimiter {
    cfg: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            windows: Mutex::new(HashMap::new()),
        }
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut lock = self.windows.lock().await;
        // drop expired windows so the map does not grow with every client ever seen
        let window_len: Duration = self.cfg.window;
        lock.retain(|_, w| now.saturating_duration_since(w.started) < window_len);

        let window = lock.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if window.count >= self.cfg.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check_and_consume(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }
}

#[cfg(feature = "redis")]
pub use redis_backend::RedisFixedWindowLimiter;

#[cfg(feature = "redis")]
mod redis_backend {
    use super::*;
    use redis::AsyncCommands;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Fixed-window counter shared by every instance through redis `INCR`/`EXPIRE`.
    pub struct RedisFixedWindowLimiter {
        client: redis::Client,
        prefix: String,
        cfg: RateLimitConfig,
    }

    impl RedisFixedWindowLimiter {
        pub fn new(url: &str, prefix: &str, cfg: RateLimitConfig) -> crate::Result<Self> {
            Ok(Self {
                client: redis::Client::open(url)?,
                prefix: prefix.to_string(),
                cfg,
            })
        }

        async fn consume(&self, key: &str) -> crate::Result<bool> {
            let window_secs = self.cfg.window.as_secs().max(1);
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs();
            let bucket = format!("{}:{}:{}", self.prefix, key, now / window_secs);

            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let count: u64 = conn.incr(&bucket, 1u64).await?;
            if count == 1 {
                let _: () = conn.expire(&bucket, window_secs as i64).await?;
            }
            Ok(count <= self.cfg.max_requests)
        }
    }

    #[async_trait]
    impl RateLimiter for RedisFixedWindowLimiter {
        async fn check_and_consume(&self, key: &str) -> bool {
            match self.consume(key).await {
                Ok(allowed) => allowed,
                Err(e) => {
                    tracing::warn!(prefix = %self.prefix, "redis rate-limit unavailable, allowing request: {e}");
                    true
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u64, window_secs: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    }

    #[tokio::test]
    async fn allows_up_to_the_limit_then_denies() {
        let limiter = limiter(3, 60);
        for _ in 0..3 {
            assert!(limiter.check_and_consume("10.0.0.1").await);
        }
        assert!(!limiter.check_and_consume("10.0.0.1").await);
    }

    #[tokio::test]
    async fn keys_are_counted_separately() {
        let limiter = limiter(1, 60);
        assert!(limiter.check_and_consume("a").await);
        assert!(!limiter.check_and_consume("a").await);
        assert!(limiter.check_and_consume("b").await);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = limiter(1, 10);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).await);
        assert!(!limiter.check_at("k", start + Duration::from_secs(5)).await);
        assert!(limiter.check_at("k", start + Duration::from_secs(11)).await);
    }

    #[tokio::test]
    async fn noop_always_allows() {
        for _ in 0..100 {
            assert!(NoopLimiter.check_and_consume("any").await);
        }
    }
}
