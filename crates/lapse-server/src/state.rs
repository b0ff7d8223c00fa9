use std::sync::{Arc, OnceLock};

use anyhow::{Result, anyhow};
use lapse_jobs::SqliteStore;
use lapse_storage::Storage;
use lapse_types::events::StoreEvent;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::Config;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: SqliteStore,
    pub storage: Arc<Storage>,
    pub config: Config,
    pub events: mpsc::UnboundedSender<StoreEvent>,
}

impl AppStateInner {
    /// Hand an event to the trigger worker.
    pub fn publish(&self, event: StoreEvent) {
        if self.events.send(event).is_err() {
            warn!("Trigger worker is gone, dropping store event");
        }
    }
}

static STATE: OnceLock<AppState> = OnceLock::new();

/// Install the process-wide state. Lives until exit; a second call fails and
/// leaves the installed state alone.
pub fn install(inner: AppStateInner) -> Result<AppState> {
    let state = Arc::new(inner);
    STATE
        .set(state.clone())
        .map_err(|_| anyhow!("application state is already initialized"))?;
    Ok(state)
}
