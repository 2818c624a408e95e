//! Minimum-interval rate limiting for external catalog calls
//!
//! One limiter per catalog. Callers queue FIFO behind the mutex and sleep
//! out the remainder of the interval while holding it, so bursts are
//! smoothed to exactly the minimum spacing. Deliberately not a token
//! bucket: catalogs that publish a request interval expect even spacing,
//! not burst credit.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum delay between consecutive calls
#[derive(Debug)]
pub struct RateLimiter {
    last_call: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_interval,
        }
    }

    pub fn from_millis(min_interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_interval_ms))
    }

    /// Wait until the minimum interval since the previous call has passed,
    /// then claim the current slot.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}
