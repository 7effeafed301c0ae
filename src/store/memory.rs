use super::{MessageId, MessageStore, StoredMessage, poisoned, unknown_message};
use crate::envelope::Envelope;
use crate::error::Result;
use crate::logging::RedactedBytes;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::debug;

struct Record {
    id: MessageId,
    sender: String,
    recipient: String,
    envelope: Envelope,
    sent_at: DateTime<Utc>,
    read: bool,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    records: Vec<Record>,
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for MemoryStore {
    fn put(
        &self,
        sender: &str,
        recipient: &str,
        envelope: &Envelope,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageId> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.last_id += 1;
        let id = MessageId::new(inner.last_id);
        inner.records.push(Record {
            id,
            sender: sender.to_owned(),
            recipient: recipient.to_owned(),
            envelope: envelope.clone(),
            sent_at,
            read: false,
        });
        debug!(%id, sender, recipient, envelope = %RedactedBytes(envelope.as_bytes()), "stored message");
        Ok(id)
    }

    fn list_unread(&self, recipient: &str) -> Result<Vec<StoredMessage>> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        let mut unread: Vec<StoredMessage> = inner
            .records
            .iter()
            .filter(|r| !r.read && r.recipient == recipient)
            .map(|r| StoredMessage {
                id: r.id,
                sender: r.sender.clone(),
                envelope: r.envelope.clone(),
                sent_at: r.sent_at,
            })
            .collect();
        unread.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
        Ok(unread)
    }

    fn mark_read(&self, id: MessageId) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| unknown_message(id))?;
        record.read = true;
        debug!(%id, "marked message read");
        Ok(())
    }
}
