//! # Expiry Sweep
//!
//! Background task that periodically drops expired session secrets.
//! Reads already evict lazily; the sweep only keeps idle entries from
//! accumulating.

use crate::state::ServiceCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Spawn the sweep loop. The first sweep runs one `period` after spawning.
pub fn spawn_expiry_sweep(cache: Arc<ServiceCache>, period: Duration) -> JoinHandle<()> {
    info!("Session cache sweep every {:?}", period);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() completes its first tick immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = cache.evict_expired();
            let stats = cache.stats();
            debug!(
                "Cache sweep removed {}, {} valid entries remain",
                removed, stats.valid
            );
        }
    })
}
