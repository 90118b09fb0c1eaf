use crate::store::ResultStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Run one expiry pass. Failures are logged and reported as zero deletions.
pub async fn sweep_once(store: &dyn ResultStore, retention: Duration) -> usize {
    match store.delete_expired(retention).await {
        Ok(0) => 0,
        Ok(removed) => {
            info!("Cleanup: {} artifacts deleted", removed);
            removed
        }
        Err(e) => {
            warn!("Cleanup error: {}", e);
            0
        }
    }
}

/// Periodically purge consumed and stale artifacts until the task is aborted.
pub fn spawn_sweeper(
    store: Arc<dyn ResultStore>,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so the first sweep waits a full interval.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(store.as_ref(), retention).await;
        }
    })
}
