//! Source access policy: a bounded concurrency gate plus a pacing clock.
//!
//! One policy is built at startup and shared (`Arc`) by every fetcher that
//! talks to the same source. Scans of different tables therefore compete for
//! the same slots and the same minimum interval between dispatches.

use std::time::Duration;

use tabscan_core::{AppConfig, Error};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Default number of source operations allowed in flight.
pub const DEFAULT_CAPACITY: usize = 2;

/// Default minimum interval between two source dispatches.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Held for the duration of one source operation; dropping it frees the slot.
#[derive(Debug)]
pub struct SourcePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

/// Throttle gate and pacing clock guarding a source.
#[derive(Debug)]
pub struct SourceAccessPolicy {
    gate: Semaphore,
    capacity: usize,
    last_dispatch: Mutex<Instant>,
    min_interval: Duration,
}

impl Default for SourceAccessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_MIN_INTERVAL)
    }
}

impl SourceAccessPolicy {
    pub fn new(capacity: usize, min_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            gate: Semaphore::new(capacity),
            capacity,
            last_dispatch: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.throttle_capacity, config.pacing_interval())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.gate.available_permits()
    }

    /// Take a slot, then wait out the pacing interval.
    ///
    /// The returned permit must be held while the source call runs.
    pub async fn acquire(&self) -> Result<SourcePermit<'_>, Error> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::SourceUnavailable("source access gate closed".into()))?;

        self.pace().await;

        Ok(SourcePermit { _permit: permit })
    }

    /// Wait until `min_interval` has passed since the previous dispatch.
    async fn pace(&self) {
        let mut last = self.last_dispatch.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}
