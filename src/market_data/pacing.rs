// =============================================================================
// Request Pacer — bounded concurrency plus a minimum start interval
// =============================================================================
//
// Data providers throttle clients that fire requests back to back. Every
// HTTP request the KRX client sends first acquires a slot here:
//   - at most `max_concurrency` calls are in flight at once (semaphore);
//   - consecutive call starts are spaced by at least `min_interval`.
//
// The pacer runs on `tokio::time`, so tests drive it with a paused clock.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{AcquireError, Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::trace;

/// Concurrency and spacing gate in front of the price-history source.
pub struct RequestPacer {
    permits: Semaphore,
    max_concurrency: usize,
    min_interval: Duration,
    next_start: Mutex<Option<Instant>>,
    issued: AtomicU64,
}

/// Serialisable view of the pacer counters.
#[derive(Debug, Clone, Serialize)]
pub struct PacerSnapshot {
    pub issued: u64,
    pub in_flight: usize,
    pub max_concurrency: usize,
    pub min_interval_ms: u64,
}

impl RequestPacer {
    /// `max_concurrency` is clamped to at least one slot.
    pub fn new(max_concurrency: usize, min_interval: Duration) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            permits: Semaphore::new(max_concurrency),
            max_concurrency,
            min_interval,
            next_start: Mutex::new(None),
            issued: AtomicU64::new(0),
        }
    }

    /// Wait for a free slot and for the next start time. The returned permit
    /// holds the slot until dropped.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        let permit = self.permits.acquire().await?;

        let start = {
            let mut next = self.next_start.lock().await;
            let now = Instant::now();
            let start = match *next {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next = Some(start + self.min_interval);
            start
        };
        tokio::time::sleep_until(start).await;

        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(issued = n, "provider slot granted");
        Ok(permit)
    }

    pub fn snapshot(&self) -> PacerSnapshot {
        PacerSnapshot {
            issued: self.issued.load(Ordering::Relaxed),
            in_flight: self.max_concurrency - self.permits.available_permits(),
            max_concurrency: self.max_concurrency,
            min_interval_ms: self.min_interval.as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("max_concurrency", &self.max_concurrency)
            .field("min_interval", &self.min_interval)
            .field("issued", &self.issued.load(Ordering::Relaxed))
            .finish()
    }
}
