//! Periodic reclamation of expired rate-limit windows.
//!
//! Without it, every client that ever sent a request keeps a window in the
//! store. Expired windows are already ignored by the limiter; sweeping only
//! bounds memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::RateLimiter;

pub struct WindowSweeper {
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl WindowSweeper {
    pub fn new(limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Sweep on every tick until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Window sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing has expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Window sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One pass. Returns the number of windows removed.
    pub fn sweep_once(&self) -> usize {
        match self.limiter.sweep() {
            Ok(removed) => {
                let remaining = self.limiter.tracked_windows();
                metrics::record_rate_windows(remaining);
                if removed > 0 {
                    tracing::debug!(removed, remaining, "Swept expired rate windows");
                }
                removed
            }
            Err(e) => {
                tracing::error!(error = %e, "Rate window sweep failed");
                0
            }
        }
    }
}
