//! Per-client admission control.
//!
//! Each client may pass at most once per rate window. There is no burst
//! allowance and no queueing: a request arriving inside the window is
//! rejected outright and does not move the window.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Outcome of a single admission decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed; the client's record now points at `now`.
    Admitted,
    /// The request must be rejected. The record is left untouched.
    Rejected {
        /// Time left until the client's window closes.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Last admitted instant for every client seen since startup.
pub struct RateLimiter {
    records: Mutex<HashMap<String, Instant>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decides whether `client` may pass at `now`, recording the pass if so.
    ///
    /// The lookup, comparison and update run under one lock acquisition so
    /// concurrent requests from the same client cannot both be admitted.
    pub fn check(&self, client: &str, now: Instant) -> Admission {
        let mut records = self.lock();

        if let Some(last) = records.get(client) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.window {
                return Admission::Rejected {
                    retry_after: self.window - elapsed,
                };
            }
            // Only reachable with a zero window: an earlier instant must not
            // move the record backwards.
            if now < *last {
                return Admission::Admitted;
            }
        }

        records.insert(client.to_string(), now);
        Admission::Admitted
    }

    /// Last admitted instant for `client`, if any.
    pub fn last_seen(&self, client: &str) -> Option<Instant> {
        self.lock().get(client).copied()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Drops every record whose window has fully elapsed at `now`.
    ///
    /// A record at least one window old admits the next request exactly like
    /// a missing record, so eviction never changes admission outcomes.
    /// Returns the number of records removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before - records.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // The map only holds instants; a panic elsewhere cannot leave it inconsistent.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
