//! Debounce window between accepted scans.
//!
//! A scanner held over a barcode reports it many times a second; only the
//! first read in each window counts. Scans inside the window are dropped, not
//! queued. The gate is shared by every cart in a scanning session, so it
//! outlives individual orders.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_SCAN_WINDOW_MS: u64 = 5_000;
/// Largest accepted window (one hour).
pub const MAX_SCAN_WINDOW_MS: u64 = 60 * 60 * 1000;

/// Sentinel for "no scan accepted yet".
const NEVER: i64 = i64::MIN;

#[derive(Debug)]
pub struct ScanGate {
    window_ms: i64,
    origin: Instant,
    last_accepted_ms: AtomicI64,
}

/// Outcome of [`ScanGate::check`]: the observed timestamp to commit against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPermit {
    observed_ms: i64,
    now_ms: i64,
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_WINDOW_MS)
    }
}

impl ScanGate {
    /// Windows above [`MAX_SCAN_WINDOW_MS`] are clamped to it.
    pub fn new(window_ms: u64) -> Self {
        let clamped = window_ms.min(MAX_SCAN_WINDOW_MS);
        if clamped != window_ms {
            warn!(window_ms, max_ms = MAX_SCAN_WINDOW_MS, "Scan window clamped");
        }
        Self {
            window_ms: i64::try_from(clamped).unwrap_or(i64::MAX),
            origin: Instant::now(),
            last_accepted_ms: AtomicI64::new(NEVER),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms.unsigned_abs()
    }

    /// Milliseconds since the gate was created, on the monotonic clock, so
    /// wall-clock corrections never shift the window.
    pub fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }

    /// Check whether a scan at `now_ms` falls outside the window.
    ///
    /// Does not record anything; pass the permit to [`ScanGate::commit`] once
    /// the scan has been validated. `Err` carries the remaining wait in ms.
    pub fn check(&self, now_ms: i64) -> Result<ScanPermit, u64> {
        let last = self.last_accepted_ms.load(Ordering::SeqCst);
        if last != NEVER {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed <= self.window_ms {
                let remaining = self.window_ms.saturating_sub(elapsed).max(1);
                return Err(remaining.unsigned_abs());
            }
        }
        Ok(ScanPermit {
            observed_ms: last,
            now_ms,
        })
    }

    /// Record the scan. Fails if another scan was accepted after `check`,
    /// which makes check-then-set a single critical section.
    pub fn commit(&self, permit: ScanPermit) -> Result<(), u64> {
        match self.last_accepted_ms.compare_exchange(
            permit.observed_ms,
            permit.now_ms,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                debug!(at_ms = permit.now_ms, "Scan accepted");
                Ok(())
            }
            Err(_) => Err(self.window_ms()),
        }
    }

    /// Check and commit in one step.
    pub fn try_accept(&self, now_ms: i64) -> Result<(), u64> {
        let permit = self.check(now_ms)?;
        self.commit(permit)
    }

    /// Timestamp of the last accepted scan, if any.
    pub fn last_accepted_ms(&self) -> Option<i64> {
        match self.last_accepted_ms.load(Ordering::SeqCst) {
            NEVER => None,
            ms => Some(ms),
        }
    }
}
