//! Shared token-bucket rate limiter
//!
//! One bucket is shared by every worker in a session: tokens accrue at a
//! fixed rate up to a burst capacity, and each outbound fetch spends one.
//! Acquisition blocks only the calling worker.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token-bucket throttle bounding total outbound request rate
pub struct RateLimiter {
    /// Maximum tokens the bucket can hold (burst size)
    capacity: f64,

    /// Tokens added per second
    refill_rate: f64,

    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Creates a limiter granting `rate` permits per second with the given
    /// burst capacity. The bucket starts full.
    pub fn new(rate: f64, burst: u32) -> Self {
        let capacity = burst as f64;
        Self {
            capacity,
            refill_rate: rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Acquires one permit, sleeping until a token has accrued
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
            };

            // Lock released before sleeping so other workers can refill-check
            tokio::time::sleep(wait).await;
        }
    }
}
