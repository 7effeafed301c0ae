//! whisperbox - person-to-person messages sealed with a shared passphrase
//!
//! Each message body is sealed into an [`envelope::Envelope`] with a key
//! stretched from a passphrase and a fresh random salt. Only envelopes are
//! stored; the recipient needs the same passphrase to open one.

#![forbid(unsafe_code)]

pub mod config;
pub mod envelope;
pub mod error;
pub mod frontend;
pub mod kdf;
pub mod logging;
pub mod passphrase;
mod sealedbox;
pub mod secretcrypt;
pub mod store;

pub use envelope::Envelope;
pub use error::{ErrorCategory, ErrorKind, Result, WhisperError};
pub use secretcrypt::{Codec, decrypt, encrypt};
