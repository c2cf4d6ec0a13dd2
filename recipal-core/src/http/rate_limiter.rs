//! Per-host request spacing.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::{sleep_until, Instant};

/// Keeps requests to the same host at least `min_delay` apart.
///
/// The next slot for a host is reserved before sleeping, so concurrent callers
/// queue up behind each other instead of all waking at once.
pub struct RateLimiter {
    min_delay: Duration,
    /// Earliest instant the next request to each host may start.
    next_slot: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: DashMap::new(),
        }
    }

    /// Wait for this host's next slot.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let start = {
            let mut slot = self.next_slot.entry(host.to_string()).or_insert(now);
            let start = (*slot).max(now);
            *slot = start + self.min_delay;
            start
        };

        if start > now {
            tracing::debug!(host, delay_ms = (start - now).as_millis() as u64, "rate limited");
            sleep_until(start).await;
        }
    }

    pub fn tracked_hosts(&self) -> usize {
        self.next_slot.len()
    }
}
