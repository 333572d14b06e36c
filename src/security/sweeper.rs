//! Background eviction of idle rate-limit records.
//!
//! Only runs when `rate_limit.sweep_interval_secs` is non-zero. Without it
//! the record grows by one entry per distinct client for the life of the
//! process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::security::rate_limit::RateLimiter;

/// Periodically drops records whose window has elapsed until `shutdown` fires.
pub async fn run_sweeper(
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    tracing::info!(interval = ?interval, "Rate limit sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = limiter.evict_idle(clock.now());
                if evicted > 0 {
                    tracing::debug!(
                        evicted,
                        remaining = limiter.tracked_clients(),
                        "Evicted idle client records"
                    );
                }
            }
            _ = shutdown.recv() => break,
        }
    }

    tracing::info!("Rate limit sweeper stopped");
}
