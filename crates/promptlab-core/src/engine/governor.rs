//! Concurrency governor: a bounded-in-flight semaphore combined with a
//! pacing gate enforcing minimum spacing between permit grants.
//!
//! The two constraints are independent. A provider may cap simultaneous
//! connections and also require spacing between request starts, so the cap
//! alone is not enough. Sequential execution is the degenerate
//! configuration (limit 1), not a separate code path.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Duration, Instant};

pub struct Governor {
    slots: Arc<Semaphore>,
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

/// Held by a dispatched trial for the lifetime of its invocation. Dropping
/// the permit frees the in-flight slot.
pub struct GovernorPermit {
    _permit: OwnedSemaphorePermit,
}

impl Governor {
    pub fn new(limit: usize, interval: Duration) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(limit.max(1))),
            interval,
            last_grant: Mutex::new(None),
        }
    }

    /// Blocks until fewer than `limit` invocations are in flight and at
    /// least `interval` has elapsed since the previous grant. Safe for many
    /// simultaneous acquirers: the pacing gate serializes grant times, so
    /// spacing holds across all waiters, not just per caller.
    pub async fn acquire(&self) -> GovernorPermit {
        // The semaphore is never closed for the lifetime of the governor.
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("governor semaphore closed");

        if !self.interval.is_zero() {
            let mut last = self.last_grant.lock().await;
            if let Some(prev) = *last {
                let ready = prev + self.interval;
                if ready > Instant::now() {
                    sleep_until(ready).await;
                }
            }
            *last = Some(Instant::now());
        }

        GovernorPermit { _permit: permit }
    }

    #[cfg(test)]
    fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
