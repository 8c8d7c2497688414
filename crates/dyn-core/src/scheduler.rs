//! Fixed-period tick loop
//!
//! The scheduler knows nothing about DNS. It calls a "do one tick" closure
//! on a fixed period until the shutdown future resolves, which keeps the
//! timing policy testable with tokio's paused clock and the reconciliation
//! logic testable without any timer.
//!
//! ## Timing
//!
//! - The first tick fires immediately, then every `period`
//! - A tick body that overruns the period delays the next tick; missed ticks
//!   are skipped, never replayed in a burst
//! - The next timer wait only starts after the tick body has finished, so
//!   ticks never overlap
//! - No jitter, no backoff

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Drives a tick closure on a fixed period
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    /// Create a scheduler with the given tick period
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the period is zero
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::config("tick period must be greater than zero"));
        }
        Ok(Self { period })
    }

    /// The configured tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run `tick` every period until `shutdown` resolves
    ///
    /// The shutdown future is raced against both the timer wait and the
    /// running tick body; when it wins, the in-flight tick is dropped.
    ///
    /// `tick` decides which failures are fatal: an `Err` returned from it
    /// stops the loop and is returned to the caller. Per-tick failures that
    /// should not stop the loop must be handled inside the closure.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Shutdown requested
    /// - `Err(Error)`: A tick reported a fatal error
    pub async fn run<S, F, Fut>(&self, shutdown: S, mut tick: F) -> Result<()>
    where
        S: Future<Output = ()>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        tokio::pin!(shutdown);

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown signal received after {} tick(s)", ticks);
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            ticks += 1;
            debug!("Tick {} started", ticks);

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown signal received during tick {}, abandoning it", ticks);
                    return Ok(());
                }
                result = tick() => result?,
            }
        }
    }
}
