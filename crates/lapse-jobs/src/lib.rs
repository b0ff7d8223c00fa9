//! Lapse jobs: the record-level handlers run by the service.
//!
//! - Status updater: moves a freshly created message from `sent` to `delivered`.
//! - Expired post reaper: deletes posts past the retention window together with
//!   the media blob each of them owns.
//!
//! Both handlers run against the traits in [`store`], so they can be driven by
//! the SQLite/on-disk backends in [`backends`] or by anything else.

pub mod backends;
pub mod error;
pub mod media;
pub mod reaper;
pub mod status;
pub mod store;

#[cfg(test)]
mod testing;

pub use backends::SqliteStore;
pub use error::{BlobError, JobError, MediaError};
pub use reaper::{ReapReport, ReaperConfig, reap_expired_posts};
pub use status::{StatusOutcome, on_message_created};
pub use store::{BlobStore, MessageStore, PostDeleteBatch, PostStore};
