//! Self-framing secretbox
//!
//! The XSalsa20Poly1305 secretbox needs a nonce next to its ciphertext. This
//! module owns that nonce end to end: `seal` draws it, writes it in front of
//! the MAC'd ciphertext, and `open` reads it back. Callers only ever handle
//! the opaque sealed bytes.
//!
//! Sealed layout:
//! - nonce: 24 bytes
//! - ciphertext with 16-byte Poly1305 MAC

use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use crate::kdf::DerivedKey;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;

pub(crate) const NONCE_LEN: usize = 24;
pub(crate) const TAG_LEN: usize = 16;

/// Shortest sealed output, produced by an empty plaintext.
pub const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

/// Seal `plaintext` under `key` with a nonce drawn from the OS RNG.
pub(crate) fn seal(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    seal_with_nonce(key, plaintext, &nonce)
}

pub(crate) fn seal_with_nonce(
    key: &DerivedKey,
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let boxed = cipher(key)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| {
            WhisperError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                format!("encryption failed: {}", e),
            )
        })?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + boxed.len());
    sealed.extend_from_slice(nonce);
    sealed.extend_from_slice(&boxed);
    Ok(sealed)
}

/// Open bytes produced by `seal`.
///
/// Anything that fails to authenticate, including input too short to hold a
/// nonce and a MAC, is an authentication failure.
pub(crate) fn open(key: &DerivedKey, sealed: &[u8]) -> Result<Vec<u8>> {
    let auth_failure = || {
        WhisperError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "corrupt input, tampered-with data, or bad passphrase",
        )
    };

    if sealed.len() < MIN_SEALED_LEN {
        return Err(auth_failure());
    }
    let (nonce, boxed) = sealed.split_at(NONCE_LEN);

    cipher(key)
        .decrypt(Nonce::from_slice(nonce), boxed)
        .map_err(|_| auth_failure())
}

fn cipher(key: &DerivedKey) -> XSalsa20Poly1305 {
    XSalsa20Poly1305::new(Key::from_slice(&key[..]))
}
