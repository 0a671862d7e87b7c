//! Token-bucket rate limiting for room event processing.
//!
//! The limiter gates how fast a room *processes* events, not whether they are
//! accepted: a burst queues up in the room's inbound channel and drains at the
//! configured pace.

use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};

use super::error::RateLimitError;

/// Waits until the caller may process one more event
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimit: Send + Sync {
    async fn acquire(&self) -> Result<(), RateLimitError>;
}

/// Token bucket holding up to `burst` tokens, refilled by one token every
/// `interval`.
#[derive(Debug)]
pub struct TokenBucket {
    interval: Duration,
    burst: u32,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket that starts full
    pub fn new(interval: Duration, burst: u32) -> Self {
        Self {
            interval,
            burst,
            state: Mutex::new(BucketState {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if self.interval.is_zero() {
            state.tokens = f64::from(self.burst);
        } else {
            let elapsed = now.saturating_duration_since(state.last_refill);
            let earned = elapsed.as_secs_f64() / self.interval.as_secs_f64();
            state.tokens = (state.tokens + earned).min(f64::from(self.burst));
        }
        state.last_refill = now;
    }
}

#[async_trait]
impl RateLimit for TokenBucket {
    async fn acquire(&self) -> Result<(), RateLimitError> {
        if self.burst == 0 {
            return Err(RateLimitError::ZeroBurst);
        }

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state, Instant::now());
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                self.interval.mul_f64(1.0 - state.tokens)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
