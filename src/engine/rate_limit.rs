//! Token-bucket request pacing.
//!
//! The bucket holds up to `capacity` permits and regains one every
//! `refill_every`. Callers await `acquire()` before each upstream request.
//! Clones share the same bucket, so one limiter can pace any number of
//! concurrent workers.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Shared token bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill_every: Duration,
    state: Arc<Mutex<BucketState>>,
}

impl TokenBucket {
    /// A full bucket. `capacity` is clamped to at least 1.
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_every,
            state: Arc::new(Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Wait for and consume one permit.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }
                (state.last_refill + self.refill_every).saturating_duration_since(Instant::now())
            };
            trace!(wait_ms = wait.as_millis() as u64, "Rate limiter waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a permit if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Permits currently available.
    pub async fn available(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        if self.refill_every.is_zero() {
            state.tokens = self.capacity;
            return;
        }
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        let periods = elapsed.as_nanos() / self.refill_every.as_nanos();
        if periods == 0 {
            return;
        }
        let periods = u32::try_from(periods).unwrap_or(u32::MAX);
        state.tokens = state.tokens.saturating_add(periods).min(self.capacity);
        if state.tokens == self.capacity {
            state.last_refill = now;
        } else {
            state.last_refill += self.refill_every * periods;
        }
    }
}
