//! Slot scheduler implementation.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

/// Result of waiting for the next slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The scheduled slot was reached.
    SlotReached,
    /// Shutdown was requested before the slot arrived.
    ShutdownRequested,
}

/// Tracks the next absolute instant at which a post is permitted.
#[derive(Debug)]
pub struct SlotScheduler {
    /// Grid interval in seconds (>= 1).
    interval_secs: u64,
    /// The next permitted posting instant.
    target: DateTime<Utc>,
}

impl SlotScheduler {
    /// Create a scheduler whose first target is the next grid slot at or
    /// after `now`.
    pub fn new(interval_secs: u64, now: DateTime<Utc>) -> Self {
        let interval_secs = interval_secs.max(1);
        let target = next_slot(interval_secs, now);
        info!(
            interval_secs,
            first_slot = %target,
            "slot scheduler initialized"
        );
        Self {
            interval_secs,
            target,
        }
    }

    /// The grid interval.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    /// The next permitted posting instant.
    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    /// Advance the target by exactly one interval.
    ///
    /// Called after each consumed slot. Deliberately `target += interval`,
    /// never recomputed from the current time.
    pub fn advance(&mut self) {
        self.target += Duration::seconds(self.interval_secs as i64);
        debug!(next_slot = %self.target, "advanced to next slot");
    }

    /// Snap the target back onto the grid if the process has fallen more
    /// than one full interval behind (e.g. after a long retry stall).
    ///
    /// Returns true if a resync happened. Without this, a stalled process
    /// would fire its missed slots back-to-back to "catch up".
    pub fn resync(&mut self, now: DateTime<Utc>) -> bool {
        let behind = now.signed_duration_since(self.target);
        if behind < Duration::seconds(self.interval_secs as i64) {
            return false;
        }

        let target = next_slot(self.interval_secs, now);
        info!(
            missed = %self.target,
            resynced = %target,
            "fell behind the slot grid, resynchronizing"
        );
        self.target = target;
        true
    }

    /// Suspend until the target slot is reached or shutdown is requested.
    ///
    /// A single timer sleep covers the remaining duration; an already-past
    /// target returns immediately. No busy-waiting.
    pub async fn wait_until_due(
        &self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> WaitOutcome {
        if *shutdown_rx.borrow() {
            return WaitOutcome::ShutdownRequested;
        }

        let now = Utc::now();
        let remaining = match (self.target - now).to_std() {
            Ok(remaining) => remaining,
            // Target already passed.
            Err(_) => return WaitOutcome::SlotReached,
        };

        debug!(
            slot = %self.target,
            remaining_secs = remaining.as_secs(),
            "waiting for next slot"
        );

        tokio::select! {
            _ = sleep(remaining) => WaitOutcome::SlotReached,
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    WaitOutcome::ShutdownRequested
                } else {
                    // Spurious change; treat the remaining wait as elapsed
                    // on the next cycle rather than looping here.
                    WaitOutcome::SlotReached
                }
            }
        }
    }
}

/// The next instant on the grid at or after `now`: the Unix timestamp
/// rounded up to the next multiple of `interval_secs`.
fn next_slot(interval_secs: u64, now: DateTime<Utc>) -> DateTime<Utc> {
    let interval = interval_secs as i64;
    let ts = now.timestamp();
    let rem = ts.rem_euclid(interval);
    let slot = if rem == 0 { ts } else { ts - rem + interval };
    DateTime::from_timestamp(slot, 0).unwrap_or(now)
}
