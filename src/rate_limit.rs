//! In-memory rate limiting for wall submissions.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<IpAddr, VecDeque<Instant>>`.
//! Each request prunes timestamps at least a window old, is rejected if the
//! remaining count is at the ceiling, and is otherwise recorded. Websocket
//! and HTTP submissions share one budget per address.
//!
//! State is process-local and resets on restart. A background sweep drops
//! addresses whose windows have fully drained.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded (max {limit} requests/{window_ms}ms)")]
    Exceeded { limit: usize, window_ms: u128 },
}

impl crate::frame::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), limit, window }
    }

    /// Check the sliding window for `ip`, then record the request.
    ///
    /// # Errors
    ///
    /// Returns `Exceeded` if `ip` already has `limit` requests in the window.
    pub fn check_and_record(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        self.check_and_record_at(ip, Instant::now())
    }

    pub(crate) fn check_and_record_at(&self, ip: IpAddr, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let deque = inner.entry(ip).or_default();
        prune_window(deque, now, self.window);
        if deque.len() >= self.limit {
            return Err(RateLimitError::Exceeded { limit: self.limit, window_ms: self.window.as_millis() });
        }
        deque.push_back(now);
        Ok(())
    }

    /// Drop addresses with no requests left in the window.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    pub(crate) fn sweep_at(&self, now: Instant) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.window;
        inner.retain(|_, deque| {
            prune_window(deque, now, window);
            !deque.is_empty()
        });
    }

    /// Number of addresses currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Spawn a task that sweeps drained addresses every `interval`.
pub fn spawn_sweep_task(limiter: RateLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.sweep();
            debug!(tracked = limiter.tracked(), "rate limiter swept");
        }
    })
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
