use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum spacing between outbound generation calls, shared process-wide.
///
/// One instance is created at startup and handed to every generator as an
/// `Arc`, never an ambient global. Callers `wait_turn()` before a request and
/// `record_call()` once the request is on the wire. Tests substitute
/// [`RateLimiter::unthrottled`] for deterministic runs.
pub struct RateLimiter {
    min_interval: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the spacing floor since the previous call has elapsed.
    pub async fn wait_turn(&self) {
        let deadline = *self.next_allowed.lock().await;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                sleep(deadline - now).await;
            }
        }
    }

    /// Stamp the next allowed call time.
    pub async fn record_call(&self) {
        let mut slot = self.next_allowed.lock().await;
        *slot = Some(Instant::now() + self.min_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unthrottled_never_waits() {
        let limiter = RateLimiter::unthrottled();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait_turn().await;
            limiter.record_call().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_for_spacing() {
        let limiter = RateLimiter::new(Duration::from_millis(900));
        limiter.wait_turn().await;
        limiter.record_call().await;

        let before = Instant::now();
        limiter.wait_turn().await;
        // Paused tokio time auto-advances past the sleep.
        assert!(before.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let start = Instant::now();
        limiter.wait_turn().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
