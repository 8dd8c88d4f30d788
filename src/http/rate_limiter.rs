//! Counter-based throttles.
//!
//! Rate limits here aren't expressed as calls/sec but as "pause for N ms
//! every M requests" floors, so this is a counter rather than a classic
//! token bucket. A `Throttle` is shared (`Arc`) across the worker pool that
//! hits a given host so the floor holds under bounded concurrency, not
//! just within a single task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;

pub struct Throttle {
    every: u64,
    pause: Duration,
    counter: AtomicU64,
}

impl Throttle {
    pub fn new(every: u64, pause: Duration) -> Self {
        Self {
            every,
            pause,
            counter: AtomicU64::new(0),
        }
    }

    /// Call once per unit of work (a detail fetch, a set-level fetch, a
    /// page of results). Sleeps when the running count crosses a multiple
    /// of `every`.
    pub async fn tick(&self) {
        if self.every == 0 {
            return;
        }
        let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count % self.every == 0 {
            sleep(self.pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_without_panicking() {
        let throttle = Throttle::new(3, Duration::from_millis(1));
        for _ in 0..10 {
            throttle.tick().await;
        }
    }

    #[tokio::test]
    async fn zero_every_never_sleeps_meaningfully() {
        let throttle = Throttle::new(0, Duration::from_secs(3600));
        let start = std::time::Instant::now();
        for _ in 0..5 {
            throttle.tick().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
