//! SQLite-backed message store.

use super::{MessageId, MessageStore, StoredMessage, poisoned, unknown_message};
use crate::envelope::Envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use crate::logging::RedactedBytes;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Schema version, stored in `PRAGMA user_version`.
const SCHEMA_VERSION: u32 = 1;

const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    recipient TEXT NOT NULL,
    envelope BLOB NOT NULL,
    -- microseconds since the Unix epoch, UTC
    sent_at INTEGER NOT NULL,
    read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_messages_unread ON messages(recipient, read, sent_at);
"#;

/// Persistent store in a single SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file, creating parent directories if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                WhisperError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to create directory {}", parent.display()),
                    e,
                )
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            storage_error(format!("failed to open database {}", path.display()), e)
        })?;
        info!(path = %path.display(), "opened message database");
        Self::init(conn)
    }

    /// A private database that lives as long as the store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| storage_error("failed to open in-memory database", e))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let version: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| storage_error("failed to read schema version", e))?;
        if version > SCHEMA_VERSION {
            return Err(WhisperError::with_kind(
                ErrorCategory::User,
                ErrorKind::Storage,
                format!(
                    "database schema version {} is newer than supported version {}",
                    version, SCHEMA_VERSION
                ),
            ));
        }

        conn.execute_batch(CREATE_SCHEMA)
            .map_err(|e| storage_error("failed to create schema", e))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| storage_error("failed to record schema version", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MessageStore for SqliteStore {
    fn put(
        &self,
        sender: &str,
        recipient: &str,
        envelope: &Envelope,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageId> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        conn.execute(
            "INSERT INTO messages (sender, recipient, envelope, sent_at, read) VALUES (?1, ?2, ?3, ?4, 0)",
            params![sender, recipient, envelope.as_bytes(), sent_at.timestamp_micros()],
        )
        .map_err(|e| storage_error("failed to store message", e))?;

        let id = MessageId::new(conn.last_insert_rowid());
        debug!(%id, sender, recipient, envelope = %RedactedBytes(envelope.as_bytes()), "stored message");
        Ok(id)
    }

    fn list_unread(&self, recipient: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, sender, envelope, sent_at FROM messages
                WHERE recipient = ?1 AND read = 0
                ORDER BY sent_at DESC, id DESC
                "#,
            )
            .map_err(|e| storage_error("failed to prepare unread query", e))?;

        let rows = stmt
            .query_map(params![recipient], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| storage_error("failed to query unread messages", e))?;

        let mut unread = Vec::new();
        for row in rows {
            let (id, sender, envelope, micros) =
                row.map_err(|e| storage_error("failed to load message row", e))?;
            let sent_at = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
                WhisperError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::Storage,
                    format!("message {} has out-of-range timestamp {}", id, micros),
                )
            })?;
            unread.push(StoredMessage {
                id: MessageId::new(id),
                sender,
                envelope: Envelope::from_bytes(envelope),
                sent_at,
            });
        }
        debug!(recipient, count = unread.len(), "listed unread messages");
        Ok(unread)
    }

    fn mark_read(&self, id: MessageId) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        // SQLite counts every row matched by the WHERE clause, so an
        // already-read message still reports one change.
        let changed = conn
            .execute("UPDATE messages SET read = 1 WHERE id = ?1", params![id.get()])
            .map_err(|e| storage_error("failed to mark message read", e))?;
        if changed == 0 {
            return Err(unknown_message(id));
        }
        debug!(%id, "marked message read");
        Ok(())
    }
}

fn storage_error(msg: impl Into<String>, err: rusqlite::Error) -> WhisperError {
    WhisperError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Storage, msg, err)
}
