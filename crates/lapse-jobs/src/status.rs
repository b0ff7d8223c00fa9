use lapse_types::models::{Message, MessageStatus};
use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::store::MessageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The message was `sent` and has been marked `delivered`.
    Delivered,
    /// Status was anything but `sent`; nothing was written.
    Unchanged,
    /// The message was deleted before the update landed.
    Missing,
}

/// Record-created handler for chat messages.
///
/// Acts on the snapshot taken at creation time: only `sent` is promoted to
/// `delivered`, every other status is left alone. At most one write per call,
/// and running it again on a delivered message writes nothing.
pub async fn on_message_created<S>(store: &S, message: &Message) -> Result<StatusOutcome, JobError>
where
    S: MessageStore + ?Sized,
{
    if message.status != MessageStatus::Sent {
        debug!(
            "Message {}/{} has status {:?}, leaving it alone",
            message.chat_room_id,
            message.id,
            message.status.as_str()
        );
        return Ok(StatusOutcome::Unchanged);
    }

    let updated = store
        .set_message_status(&message.chat_room_id, message.id, MessageStatus::Delivered)
        .await
        .map_err(|error| JobError::StatusUpdate {
            chat_room_id: message.chat_room_id.clone(),
            message_id: message.id,
            error,
        })?;

    if updated {
        info!("Message {}/{} marked delivered", message.chat_room_id, message.id);
        Ok(StatusOutcome::Delivered)
    } else {
        warn!(
            "Message {}/{} disappeared before it could be marked delivered",
            message.chat_room_id, message.id
        );
        Ok(StatusOutcome::Missing)
    }
}
