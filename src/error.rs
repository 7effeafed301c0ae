//! Error type shared by the codec, the stores and the front end

use std::error::Error as StdError;

use thiserror::Error;

/// Who is most likely responsible for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// A bug, an environment problem, or anything not clearly caused by the
    /// person using whisperbox. A user mistake can still end up here when it
    /// cannot be told apart.
    Internal,

    /// Bad input from the person at the keyboard: a wrong secret key, a
    /// message of the wrong length, a missing file.
    User,
}

/// What went wrong, for callers that react differently per failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Key derivation was handed a salt of the wrong length.
    KdfInput,
    /// The envelope is too short to contain a salt and a sealed box.
    MalformedEnvelope,
    /// The sealed box did not open: wrong secret key, or the envelope was
    /// altered after sealing.
    AuthenticationFailed,
    /// The secretbox refused to seal a message.
    SecretboxFailure,
    /// The envelope authenticated but its content is not UTF-8 text.
    PlaintextEncoding,
    /// No secret key could be read from the terminal or stdin.
    PassphraseUnavailable,
    /// Message text is outside the accepted length bounds.
    MessageLength,
    /// No stored message has the requested id.
    UnknownMessage,
    /// The message store failed to persist or load data.
    Storage,
    /// A state the code assumes can never happen, such as a poisoned lock.
    InternalInvariant,
    /// Reading a message file or talking to the console failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct WhisperError {
    pub category: ErrorCategory,
    /// Absent for one-off failures; match on it with a fallback arm.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl WhisperError {
    /// Untagged error.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Error tagged with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Tagged error wrapping a lower-level cause, usually I/O or SQLite.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Message without the cause chain.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Put `msg` in front of this error, which becomes the source. Category
    /// and kind stay the same.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// True when a wrong passphrase or a modified envelope was detected.
    pub fn is_authentication_failure(&self) -> bool {
        self.kind == Some(ErrorKind::AuthenticationFailed)
    }

    /// True when the envelope could not even be split into its parts.
    pub fn is_malformed_envelope(&self) -> bool {
        self.kind == Some(ErrorKind::MalformedEnvelope)
    }
}

pub type Result<T> = std::result::Result<T, WhisperError>;
