/*!
 * Inter-call pacing shared by all in-flight translations.
 */

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces the start of consecutive model calls at least `delay` apart
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Create a pacer with the given minimum spacing
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_start: Mutex::new(None),
        }
    }

    /// The configured spacing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next call may start, then record it as started
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// behind each other instead of all waking at the same instant.
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            let ready_at = previous + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_start = Some(Instant::now());
    }
}
