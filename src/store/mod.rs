//! Message persistence
//!
//! A store keeps envelopes as opaque bytes next to the plaintext metadata
//! (sender, recipient, timestamp, read state). It never looks inside an
//! envelope and never sees a passphrase.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::envelope::Envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use chrono::{DateTime, Utc};
use std::fmt;

/// Identifier assigned by a store when a message is put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(i64);

impl MessageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An unread message as handed back to its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub sender: String,
    pub envelope: Envelope,
    pub sent_at: DateTime<Utc>,
}

/// Storage for sealed messages.
///
/// Implementations must be safe to share between threads and must return
/// envelope bytes exactly as they were put.
pub trait MessageStore: Send + Sync {
    /// Persist an envelope as unread. The message is listed by
    /// `list_unread` only once this returns `Ok`.
    fn put(
        &self,
        sender: &str,
        recipient: &str,
        envelope: &Envelope,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageId>;

    /// Unread messages for `recipient`, newest first. Messages with equal
    /// timestamps are ordered by descending id.
    fn list_unread(&self, recipient: &str) -> Result<Vec<StoredMessage>>;

    /// Mark a message read. Marking an already-read message again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::UnknownMessage` if no message has this id.
    fn mark_read(&self, id: MessageId) -> Result<()>;
}

fn unknown_message(id: MessageId) -> WhisperError {
    WhisperError::with_kind(
        ErrorCategory::User,
        ErrorKind::UnknownMessage,
        format!("no message with id {}", id),
    )
}

fn poisoned() -> WhisperError {
    WhisperError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::InternalInvariant,
        "message store lock poisoned by a panicked thread",
    )
}
