//! Token-bucket rate limiter.
//!
//! Refill is lazy: tokens accrue on each [`RateLimiter::allow`] call from
//! the elapsed monotonic time, capped at the bucket capacity. There is no
//! background timer, and wall-clock jumps cannot produce negative refills
//! because the limiter only ever reads `Instant`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Poll interval used by [`RateLimiter::wait`].
const WAIT_BACKOFF: Duration = Duration::from_millis(10);

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket: `rate` tokens per second, burst up to `capacity`.
///
/// The bucket starts full, so a fresh limiter admits a full burst
/// immediately.
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rate: f64, capacity: f64) -> Self {
        Self {
            rate,
            capacity,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to consume one token. Returns `false` when the bucket is empty.
    pub fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Block until a token is available, polling with a short backoff.
    pub async fn wait(&self) {
        while !self.allow() {
            tokio::time::sleep(WAIT_BACKOFF).await;
        }
    }
}
