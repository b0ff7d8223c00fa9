use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events published by the record store towards trigger workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    /// A message was created; carries the snapshot as it was written.
    MessageCreated(Message),
}
