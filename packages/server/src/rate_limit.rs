use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::config::RateLimitRule;
use crate::error::AppError;

struct Window {
    started: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.length
    }
}

/// In-memory fixed-window rate limiter.
///
/// Buckets are keyed by `(route, client)`. State is per process, so limits
/// are not shared between replicas. Expired windows are dropped by
/// [`RateLimiter::spawn_sweeper`].
pub struct RateLimiter {
    enabled: bool,
    windows: DashMap<(&'static str, String), Window>,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: DashMap::new(),
        }
    }

    /// Count one request against `rule` for `key` on `route`.
    pub fn check(
        &self,
        route: &'static str,
        rule: &RateLimitRule,
        key: &str,
    ) -> Result<(), AppError> {
        self.check_at(route, rule, key, Instant::now())
    }

    fn check_at(
        &self,
        route: &'static str,
        rule: &RateLimitRule,
        key: &str,
        now: Instant,
    ) -> Result<(), AppError> {
        if !self.enabled || rule.max_requests == 0 {
            return Ok(());
        }

        let window = Duration::from_secs(rule.window_secs);
        let mut entry = self
            .windows
            .entry((route, key.to_string()))
            .or_insert(Window {
                started: now,
                length: window,
                count: 0,
            });

        if entry.expired(now) {
            entry.started = now;
            entry.length = window;
            entry.count = 0;
        }

        if entry.count >= rule.max_requests {
            let remaining = window.saturating_sub(now.duration_since(entry.started));
            let retry_after = remaining.as_secs().max(1);
            tracing::debug!(route, key, retry_after, "Rate limit exceeded");
            return Err(AppError::RateLimited { retry_after });
        }

        entry.count += 1;
        Ok(())
    }

    /// Number of tracked `(route, client)` windows.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Drop windows that have run out. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| !window.expired(now));
        before.saturating_sub(self.windows.len())
    }

    /// Periodically evict expired windows so one-off clients do not pile up.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted expired rate limit windows");
                }
            }
        })
    }
}
