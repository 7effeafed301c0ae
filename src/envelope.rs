//! Envelope framing
//!
//! An envelope is the only thing ever stored for a message body:
//! - salt: 16 bytes
//! - sealed box: variable length, opaque here (see `sealedbox`)
//!
//! There is no version field and no length field. Everything after the salt
//! belongs to the sealed box.

use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use crate::logging::RedactedBytes;
use std::fmt;

pub use crate::kdf::SALT_LEN;
pub use crate::sealedbox::MIN_SEALED_LEN;

/// Shortest envelope that can possibly authenticate.
pub const MIN_ENVELOPE_LEN: usize = SALT_LEN + MIN_SEALED_LEN;

/// Opaque `salt || sealed box` bytes for a single message.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope(Vec<u8>);

impl Envelope {
    /// Wrap bytes loaded from storage. No validation happens until decryption.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub(crate) fn assemble(salt: &[u8; SALT_LEN], sealed: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(SALT_LEN + sealed.len());
        bytes.extend_from_slice(salt);
        bytes.extend_from_slice(sealed);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The salt prefix, if the envelope is long enough to have one.
    pub fn salt(&self) -> Option<&[u8]> {
        self.0.get(..SALT_LEN)
    }
}

impl From<Vec<u8>> for Envelope {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Envelope {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Envelope")
            .field(&RedactedBytes(&self.0))
            .finish()
    }
}

/// The parts of an envelope, borrowed from its bytes.
pub(crate) struct Parts<'a> {
    pub salt: &'a [u8; SALT_LEN],
    pub sealed: &'a [u8],
}

/// Split raw envelope bytes into the salt and the sealed box.
pub(crate) fn split(bytes: &[u8]) -> Result<Parts<'_>> {
    if bytes.len() < MIN_ENVELOPE_LEN {
        return Err(WhisperError::with_kind(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            format!(
                "envelope is {} bytes, shorter than the minimum of {}; likely truncated",
                bytes.len(),
                MIN_ENVELOPE_LEN
            ),
        ));
    }

    let (salt, sealed) = bytes.split_at(SALT_LEN);
    let salt = salt.try_into().map_err(|_| {
        WhisperError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to slice salt out of envelope",
        )
    })?;

    Ok(Parts { salt, sealed })
}
