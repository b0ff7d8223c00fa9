use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lapse_jobs::{ReaperConfig, SqliteStore, StatusOutcome, on_message_created, reap_expired_posts};
use lapse_storage::Storage;
use lapse_types::events::StoreEvent;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Record-created trigger: runs the status updater for every new message.
///
/// Failures are logged and dropped; nothing is retried.
pub async fn run_message_trigger(store: SqliteStore, mut events: mpsc::UnboundedReceiver<StoreEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            StoreEvent::MessageCreated(message) => {
                match on_message_created(&store, &message).await {
                    Ok(StatusOutcome::Delivered) => {}
                    Ok(outcome) => debug!("Status trigger for {}: {:?}", message.id, outcome),
                    Err(e) => error!("Status trigger failed: {}", e),
                }
            }
        }
    }

    info!("Message trigger stopped");
}

/// Timer trigger: runs the expired post reaper every `interval_secs`,
/// starting immediately.
pub async fn run_reaper_loop(
    store: SqliteStore,
    storage: Arc<Storage>,
    config: ReaperConfig,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match reap_expired_posts(&store, storage.as_ref(), Utc::now(), &config).await {
            Ok(report) => {
                if report.expired > 0 {
                    info!(
                        "Reaper: {} expired posts, {} deleted, {} media failures",
                        report.expired, report.records_deleted, report.blob_failures
                    );
                }
            }
            Err(e) => {
                error!("Reaper run failed: {}", e);
            }
        }
    }
}
