//! Long-running publishing loop

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::engine::Publisher;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Tick every `interval` until `shutdown` flips to `true`
///
/// The first tick runs immediately. Shutdown is only observed between ticks;
/// a tick in progress always runs to completion. A failed tick is retried at
/// the next interval with no extra backoff.
pub async fn run_worker(
    publisher: Arc<Publisher>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = interval.as_secs(), "Publishing worker started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = publisher.tick().await {
                    warn!(error = %e, "Publishing tick failed, retrying next interval");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Publishing worker stopped");
}
