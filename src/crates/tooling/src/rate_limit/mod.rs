//! Token bucket limiter for pacing upstream API calls

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket rate limiter
///
/// Tokens refill continuously up to the bucket capacity. The REST client
/// wrapper acquires one token per request so bursts against the tenant API
/// stay under the org-level rate limit.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<BucketState>>,
}

struct BucketState {
    capacity: usize,
    tokens: f64,
    refill_period: Duration,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let rate = self.capacity as f64 / self.refill_period.as_secs_f64();
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(self.capacity as f64);
        self.last_refill = Instant::now();
    }
}

impl RateLimiter {
    /// Allow `max_operations` per `period`
    pub fn new(max_operations: usize, period: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BucketState {
                capacity: max_operations,
                tokens: max_operations as f64,
                refill_period: period,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Take a token if one is available (non-blocking)
    pub async fn check(&self) -> bool {
        let mut state = self.state.lock().await;
        state.refill();
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Sleep until a token is available
    pub async fn acquire(&self) {
        loop {
            if self.check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Tokens currently available
    pub async fn available(&self) -> usize {
        let mut state = self.state.lock().await;
        state.refill();
        state.tokens.floor() as usize
    }
}
