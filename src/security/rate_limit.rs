//! Fixed-window rate limiting keyed by (client, method).
//!
//! # Algorithm
//! ```text
//! window = store.get(key)
//! absent or now > reset_at  → store {count: 1, reset_at: now + window}, allow
//! count >= limit            → deny, store untouched
//! otherwise                 → count += 1, allow
//! ```
//!
//! # Design Decisions
//! - The read-modify-write is an optimistic CAS loop, so concurrent requests
//!   for one key serialize without a global lock
//! - Rejected requests never write, so they cannot extend or corrupt a window

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::RateLimitConfig;
use crate::security::clock::Clock;
use crate::security::store::{ClientKey, RateWindow, StoreError, WindowStore};

/// Upper bound on CAS retries before the store is treated as faulty.
const MAX_CAS_ATTEMPTS: usize = 128;

/// Outcome of one `check_and_consume` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    /// Requests counted in the current window, including this one if allowed.
    pub count: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitStatus {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }

    /// Whole seconds until the window resets, never less than one.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }
}

/// Fixed-window limiter over an injectable store and clock.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    limit: u32,
    window: TimeDelta,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
        limit: u32,
        window: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            limit,
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn from_config(
        config: &RateLimitConfig,
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(store, clock, config.max_requests, config.window())
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window_secs(&self) -> i64 {
        self.window.num_seconds()
    }

    /// Count a request against `key` and report whether it is allowed.
    pub fn check_and_consume(&self, key: &ClientKey) -> Result<RateLimitStatus, StoreError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let now = self.clock.now();
            let current = self.store.get(key)?;

            let next = match current {
                Some(window) if !window.is_expired(now) => {
                    if window.count >= self.limit {
                        return Ok(self.status(false, window));
                    }
                    RateWindow {
                        count: window.count + 1,
                        reset_at: window.reset_at,
                    }
                }
                _ => RateWindow {
                    count: 1,
                    reset_at: self.window_end(now),
                },
            };

            if self.store.compare_and_swap(key, current.as_ref(), next)? {
                return Ok(self.status(true, next));
            }
            tracing::trace!(key = %key, "Rate window changed concurrently, retrying");
        }

        Err(StoreError::Contention(key.to_string()))
    }

    /// Start a fresh, empty window for `key`.
    pub fn reset(&self, key: ClientKey) -> Result<RateWindow, StoreError> {
        let now = self.clock.now();
        let window = RateWindow {
            count: 0,
            reset_at: self.window_end(now),
        };
        self.store.put(key, window, window.reset_at)?;
        Ok(window)
    }

    /// Reclaim expired windows.
    pub fn sweep(&self) -> Result<usize, StoreError> {
        self.store.purge_expired(self.clock.now())
    }

    pub fn tracked_windows(&self) -> usize {
        self.store.len()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn window_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn status(&self, allowed: bool, window: RateWindow) -> RateLimitStatus {
        RateLimitStatus {
            allowed,
            count: window.count,
            limit: self.limit,
            reset_at: window.reset_at,
        }
    }
}
