//! Per-provider rate limiting.
//!
//! Limits are tracked as a counter per provider key with a window TTL,
//! matching the Redis INCR/EXPIRE/TTL idiom. An in-memory backend covers
//! single-process deployments and tests; the Redis backend (behind the
//! `redis-backend` feature) shares state across processes.
//!
//! A broken backend never blocks scraping: backend errors are logged and
//! the request proceeds.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::ScrapeError;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend error: {0}")]
    Backend(String),
}

/// Counter storage for rate limiting.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Increment the counter for `key`, returning the new value.
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError>;

    /// Set the expiry window on `key`. Called once, right after the first
    /// increment of a fresh window.
    async fn expire(&self, key: &str, window: Duration) -> Result<(), RateLimitError>;

    /// Seconds until `key` expires, or 0 when unknown.
    async fn ttl(&self, key: &str) -> Result<i64, RateLimitError>;
}

#[derive(Default)]
struct MemoryWindow {
    count: i64,
    expires_at: Option<Instant>,
}

/// Process-local rate limit state.
pub struct MemoryRateLimitBackend {
    windows: Mutex<HashMap<String, MemoryWindow>>,
}

impl MemoryRateLimitBackend {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn with_window<T>(&self, key: &str, f: impl FnOnce(&mut MemoryWindow) -> T) -> T {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(key.to_string()).or_default();
        if let Some(expires_at) = window.expires_at {
            if expires_at <= Instant::now() {
                *window = MemoryWindow::default();
            }
        }
        f(window)
    }
}

impl Default for MemoryRateLimitBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitBackend for MemoryRateLimitBackend {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        Ok(self.with_window(key, |w| {
            w.count += 1;
            w.count
        }))
    }

    async fn expire(&self, key: &str, window: Duration) -> Result<(), RateLimitError> {
        self.with_window(key, |w| {
            w.expires_at = Some(Instant::now() + window);
        });
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, RateLimitError> {
        Ok(self.with_window(key, |w| {
            w.expires_at
                .map(|e| e.saturating_duration_since(Instant::now()).as_secs() as i64)
                .unwrap_or(0)
        }))
    }
}

/// Shared rate limit state via Redis.
#[cfg(feature = "redis-backend")]
pub struct RedisRateLimitBackend {
    conn: redis::aio::ConnectionManager,
}

#[cfg(feature = "redis-backend")]
impl RedisRateLimitBackend {
    pub async fn connect(url: &str) -> Result<Self, RateLimitError> {
        let client =
            redis::Client::open(url).map_err(|e| RateLimitError::Backend(e.to_string()))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[cfg(feature = "redis-backend")]
#[async_trait]
impl RateLimitBackend for RedisRateLimitBackend {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        conn.incr(key, 1)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))
    }

    async fn expire(&self, key: &str, window: Duration) -> Result<(), RateLimitError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let _: bool = conn
            .expire(key, window.as_secs() as i64)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, RateLimitError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let ttl: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;
        Ok(ttl.max(0))
    }
}

/// Rate limiter shared by all scrapers.
///
/// Cloneable; a disabled limiter (no backend) allows everything.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Option<Arc<dyn RateLimitBackend>>,
}

impl RateLimiter {
    pub fn new(backend: Arc<dyn RateLimitBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Check and consume one request slot for `provider`.
    pub async fn check(
        &self,
        provider: &str,
        requests: u32,
        window: Duration,
    ) -> Result<(), ScrapeError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let key = format!("scraper:rate_limit:{provider}");
        match Self::consume(backend.as_ref(), &key, requests, window).await {
            Ok(None) => Ok(()),
            Ok(Some(retry_after_secs)) => Err(ScrapeError::RateLimited {
                provider: provider.to_string(),
                limit: requests,
                window_secs: window.as_secs(),
                retry_after_secs,
            }),
            Err(err) => {
                // An unreachable backend must not stop scraping
                warn!(provider, error = %err, "rate limit backend failed, allowing request");
                Ok(())
            }
        }
    }

    async fn consume(
        backend: &dyn RateLimitBackend,
        key: &str,
        requests: u32,
        window: Duration,
    ) -> Result<Option<i64>, RateLimitError> {
        let count = backend.incr(key).await?;
        if count == 1 {
            backend.expire(key, window).await?;
        }
        if count > i64::from(requests) {
            let ttl = backend.ttl(key).await?;
            let retry_after = if ttl > 0 { ttl } else { window.as_secs() as i64 };
            return Ok(Some(retry_after));
        }
        debug!(key, count, limit = requests, "rate limit slot consumed");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenBackend;

    #[async_trait]
    impl RateLimitBackend for BrokenBackend {
        async fn incr(&self, _key: &str) -> Result<i64, RateLimitError> {
            Err(RateLimitError::Backend("connection refused".to_string()))
        }

        async fn expire(&self, _key: &str, _window: Duration) -> Result<(), RateLimitError> {
            Err(RateLimitError::Backend("connection refused".to_string()))
        }

        async fn ttl(&self, _key: &str) -> Result<i64, RateLimitError> {
            Err(RateLimitError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_limit_enforced_after_threshold() {
        let limiter = RateLimiter::new(Arc::new(MemoryRateLimitBackend::new()));
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            limiter.check("google_flights", 3, window).await.unwrap();
        }

        let err = limiter
            .check("google_flights", 3, window)
            .await
            .unwrap_err();
        match err {
            ScrapeError::RateLimited {
                provider,
                limit,
                retry_after_secs,
                ..
            } => {
                assert_eq!(provider, "google_flights");
                assert_eq!(limit, 3);
                assert!(retry_after_secs > 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_providers_have_independent_windows() {
        let limiter = RateLimiter::new(Arc::new(MemoryRateLimitBackend::new()));
        let window = Duration::from_secs(60);

        limiter.check("a", 1, window).await.unwrap();
        assert!(limiter.check("a", 1, window).await.is_err());
        // Provider b is unaffected by a's exhausted window
        limiter.check("b", 1, window).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_window_resets_count() {
        let limiter = RateLimiter::new(Arc::new(MemoryRateLimitBackend::new()));
        let window = Duration::from_millis(20);

        limiter.check("a", 1, window).await.unwrap();
        assert!(limiter.check("a", 1, window).await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        limiter.check("a", 1, window).await.unwrap();
    }

    #[tokio::test]
    async fn test_broken_backend_allows_requests() {
        let limiter = RateLimiter::new(Arc::new(BrokenBackend));
        for _ in 0..5 {
            limiter
                .check("a", 1, Duration::from_secs(60))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let limiter = RateLimiter::disabled();
        for _ in 0..100 {
            limiter
                .check("a", 1, Duration::from_secs(60))
                .await
                .unwrap();
        }
    }
}
