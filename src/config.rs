//! Runtime configuration

use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use crate::kdf::KdfParams;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "whisperbox.db";

/// Shortest message text accepted, in characters.
pub const MIN_MESSAGE_CHARS: usize = 50;

/// Longest message text accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database holding the envelopes.
    pub db_path: PathBuf,
    /// Work factor for the password stretch. Not recorded in envelopes, so
    /// every reader of a database must use the same value.
    pub kdf: KdfParams,
    /// Accepted message length in characters (not bytes).
    pub message_chars: RangeInclusive<usize>,
}

impl Config {
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Apply the message length policy. Runs before anything is encrypted.
    pub fn check_message(&self, text: &str) -> Result<()> {
        let chars = text.chars().count();
        if self.message_chars.contains(&chars) {
            Ok(())
        } else {
            Err(WhisperError::with_kind(
                ErrorCategory::User,
                ErrorKind::MessageLength,
                format!(
                    "message must be between {} and {} characters, got {}",
                    self.message_chars.start(),
                    self.message_chars.end(),
                    chars
                ),
            ))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            kdf: KdfParams::default(),
            message_chars: MIN_MESSAGE_CHARS..=MAX_MESSAGE_CHARS,
        }
    }
}
