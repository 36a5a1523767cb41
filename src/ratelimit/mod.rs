//! Outgoing request throttling
//!
//! A greedy sliding-window limiter: bursts pass straight through until the
//! quota for the current window is used, after which each extra call waits
//! until the oldest call in the window ages out. Calls are delayed, never
//! rejected.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Longest window a limiter tracks; longer ones are clamped to it
pub const MAX_WINDOW: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Quota of `calls` per rolling `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls allowed inside one window
    pub calls: u32,
    /// Window length in seconds
    pub period_secs: u64,
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: 10_000,
            period_secs: 60 * 60,
        }
    }
}

/// Mutex-guarded sliding window over reserved call instants
#[derive(Debug)]
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    // Never holds more than `quota` entries, oldest first, non-decreasing.
    slots: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allow `calls` per `window`. A zero quota is treated as one call and
    /// windows above [`MAX_WINDOW`] are clamped.
    pub fn new(calls: u32, window: Duration) -> Self {
        let quota = calls.max(1) as usize;
        Self {
            quota,
            window: window.min(MAX_WINDOW),
            slots: Mutex::new(VecDeque::with_capacity(quota.min(1024))),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.calls, config.period())
    }

    pub fn per_hour(calls: u32) -> Self {
        Self::new(calls, Duration::from_secs(60 * 60))
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a call is allowed. Returns how long the caller was held back.
    pub async fn acquire(&self) -> Duration {
        let now = Instant::now();
        let slot = self.reserve(now);
        let delay = slot.saturating_duration_since(now);

        if !delay.is_zero() {
            debug!(
                "Rate limit of {} calls per {:?} reached, delaying call by {:?}",
                self.quota, self.window, delay
            );
            tokio::time::sleep_until(slot).await;
        }

        delay
    }

    /// Number of calls that could start at `now` without waiting
    pub fn available(&self) -> usize {
        let now = Instant::now();
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let in_window = slots
            .iter()
            .filter(|&&t| t.checked_add(self.window).map_or(true, |end| end > now))
            .count();
        self.quota.saturating_sub(in_window)
    }

    /// Book the earliest instant at or after `now` that keeps every window
    /// within quota. The lock is released before the caller sleeps.
    fn reserve(&self, now: Instant) -> Instant {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let slot = if slots.len() < self.quota {
            now
        } else {
            // `quota` calls back from here is the one that must age out first
            match slots.front() {
                Some(&oldest) => oldest
                    .checked_add(self.window)
                    .unwrap_or(oldest)
                    .max(now),
                None => now,
            }
        };

        slots.push_back(slot);
        if slots.len() > self.quota {
            slots.pop_front();
        }

        slot
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_passes_without_delay() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_excess_call_is_delayed_not_rejected() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::from_secs(10));
        assert!(Instant::now() - start >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_frees_capacity_gradually() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));

        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        limiter.acquire().await;

        // First call ages out at t=10, second at t=14
        assert_eq!(limiter.acquire().await, Duration::from_secs(6));
        assert_eq!(limiter.acquire().await, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_returns_after_idle_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.available(), 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(limiter.available(), 2);
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_overrun_window() {
        let window = Duration::from_secs(30);
        let limiter = Arc::new(RateLimiter::new(4, window));
        let start = Instant::now();

        let calls = (0..12).map(|_| {
            let limiter = limiter.clone();
            async move {
                limiter.acquire().await;
                Instant::now() - start
            }
        });
        let mut started: Vec<Duration> = futures::future::join_all(calls).await;
        started.sort();

        assert_eq!(started.len(), 12);
        for (i, at) in started.iter().enumerate() {
            let in_window = started
                .iter()
                .filter(|&&other| other >= *at && other < *at + window)
                .count();
            assert!(in_window <= 4, "call {} saw {} calls in one window", i, in_window);
        }
        assert_eq!(started[11], Duration::from_secs(60));
    }

    #[test]
    fn test_config_defaults_match_ipstack_quota() {
        let config = RateLimitConfig::default();
        assert_eq!(config.calls, 10_000);
        assert_eq!(config.period(), Duration::from_secs(3600));

        let limiter = RateLimiter::from_config(&config);
        assert_eq!(limiter.quota(), 10_000);
        assert_eq!(limiter.window(), Duration::from_secs(3600));
        assert_eq!(RateLimiter::per_hour(10_000).window(), limiter.window());
        assert_eq!(RateLimiter::default().quota(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_window_is_clamped() {
        let limiter = RateLimiter::new(1, Duration::from_secs(u64::MAX));
        assert_eq!(limiter.window(), MAX_WINDOW);

        assert_eq!(limiter.acquire().await, Duration::ZERO);
        assert_eq!(limiter.available(), 0);
        assert_eq!(limiter.acquire().await, MAX_WINDOW);
        assert_eq!(limiter.available(), 0);
    }

    #[test]
    fn test_zero_quota_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert_eq!(limiter.quota(), 1);
    }
}
