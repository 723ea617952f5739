use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Hands out permits evenly spaced `1/N` seconds apart.
///
/// Callers share one limiter through an `Arc`; every [`RateLimiter::acquire`]
/// reserves the next free slot under the lock and then sleeps until that slot
/// outside of it, so concurrent callers never receive the same slot.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn per_second(rate: u32) -> Self {
        let rate = rate.max(1);
        Self {
            interval: Duration::from_secs(1) / rate,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next permit is available.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };
        sleep_until(slot).await;
    }
}
