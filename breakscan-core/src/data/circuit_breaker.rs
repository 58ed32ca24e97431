//! Circuit breaker for upstream bans and repeated rate limiting.
//!
//! An HTTP 403 trips the breaker immediately. Rate limiting counts once per
//! batch attempt, and three consecutive rate-limited attempts trip it too.
//! Network errors and other HTTP failures never count: those are transient
//! and belong to the batch retry machine. While open, every request is
//! refused until the cooldown elapses, and the fetcher skips the remaining
//! batches.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::provider::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed.
    Closed,
    /// Requests are refused until `tripped_at + cooldown`.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if requests are currently allowed, closing an expired breaker.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Record the per-ticker errors of one batch attempt.
    ///
    /// Any rate limit counts as one failure for the whole attempt. A clean
    /// attempt (nothing but unknown symbols) resets the counter. Anything
    /// else leaves the breaker untouched.
    pub fn record_attempt<'a, I>(&self, errors: I)
    where
        I: IntoIterator<Item = &'a DataError>,
    {
        let mut rate_limited = false;
        let mut clean = true;
        for error in errors {
            match error {
                DataError::RateLimited { .. } => rate_limited = true,
                DataError::SymbolNotFound { .. } => {}
                _ => clean = false,
            }
        }
        if rate_limited {
            self.record_failure();
        } else if clean {
            self.record_success();
        }
    }

    /// Trip immediately (HTTP 403 / IP ban).
    pub fn trip(&self) {
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Remaining cooldown time (zero if closed).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => {
                self.cooldown.saturating_sub(tripped_at.elapsed())
            }
        }
    }
}
