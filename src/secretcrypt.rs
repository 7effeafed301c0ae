//! Encryption/decryption using PBKDF2 + XSalsa20Poly1305
//!
//! This module implements passphrase-based message sealing using:
//! - PBKDF2-HMAC-SHA256 for key derivation from passphrase (see `kdf`)
//! - NaCl secretbox (XSalsa20Poly1305) for authenticated encryption
//!
//! Every call derives a fresh key from a fresh random salt. Nothing is cached
//! between calls. See `envelope` for the binary layout and `sealedbox` for
//! the nonce framing inside it.

use crate::envelope::{self, Envelope, SALT_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use crate::kdf::KdfParams;
use crate::sealedbox;
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroize;

/// Seals and opens envelopes. Holds only the KDF work factor, so it is
/// freely copied and shared across threads.
///
/// Salts and nonces always come from the OS RNG; callers cannot supply them.
///
/// ```compile_fail
/// let codec = whisperbox::Codec::default();
/// codec.encrypt_deterministic("text", "pw", &[0u8; 16], &[0u8; 24]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    kdf: KdfParams,
}

impl Codec {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Encrypt plaintext with a passphrase under a fresh random salt
    pub fn encrypt(&self, plaintext: &str, passphrase: &str) -> Result<Envelope> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let key = self.kdf.derive_key(passphrase.as_bytes(), &salt);
        let sealed = sealedbox::seal(&key, plaintext.as_bytes())?;
        Ok(Envelope::assemble(&salt, &sealed))
    }

    /// Fixed salt and nonce, for tests that need reproducible output.
    #[cfg(test)]
    fn encrypt_deterministic(
        &self,
        plaintext: &[u8],
        passphrase: &str,
        salt: &[u8; SALT_LEN],
        nonce: &[u8; sealedbox::NONCE_LEN],
    ) -> Result<Envelope> {
        let key = self.kdf.derive_key(passphrase.as_bytes(), salt);
        let sealed = sealedbox::seal_with_nonce(&key, plaintext, nonce)?;
        Ok(Envelope::assemble(salt, &sealed))
    }

    /// Decrypt an envelope with a passphrase
    ///
    /// Fails with `ErrorKind::MalformedEnvelope` before any key derivation if
    /// the envelope is too short, and with `ErrorKind::AuthenticationFailed`
    /// if the passphrase is wrong or the envelope was modified.
    pub fn decrypt(&self, envelope: &[u8], passphrase: &str) -> Result<String> {
        let parts = envelope::split(envelope)?;
        let key = self.kdf.derive_key(passphrase.as_bytes(), parts.salt);
        let plaintext = sealedbox::open(&key, parts.sealed)?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            WhisperError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::PlaintextEncoding,
                "message authenticated but is not valid UTF-8 text",
            )
        })
    }
}

/// Encrypt with the default work factor.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<Envelope> {
    Codec::default().encrypt(plaintext, passphrase)
}

/// Decrypt with the default work factor.
pub fn decrypt(envelope: &[u8], passphrase: &str) -> Result<String> {
    Codec::default().decrypt(envelope, passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MIN_ENVELOPE_LEN;
    use crate::sealedbox::{NONCE_LEN, TAG_LEN};
    use std::collections::HashSet;

    const SCENARIO_TEXT: &str = "Hello World, this is a fifty-plus character secure test message!!";

    fn fast() -> Codec {
        Codec::new(KdfParams::with_iterations(1_000))
    }

    #[test]
    fn test_scenario_with_default_work_factor() {
        let envelope = encrypt(SCENARIO_TEXT, "correcthorse").unwrap();

        assert_eq!(decrypt(envelope.as_bytes(), "correcthorse").unwrap(), SCENARIO_TEXT);

        let err = decrypt(envelope.as_bytes(), "wrongpass").expect_err("expected auth failure");
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_empty_plaintext() {
        let envelope = fast().encrypt("", "test").unwrap();
        assert_eq!(envelope.len(), MIN_ENVELOPE_LEN);
        assert_eq!(fast().decrypt(envelope.as_bytes(), "test").unwrap(), "");
    }

    #[test]
    fn test_small_plaintext() {
        let envelope = fast().encrypt("hello", "test").unwrap();
        assert_eq!(envelope.len(), MIN_ENVELOPE_LEN + 5);
        assert_eq!(fast().decrypt(envelope.as_bytes(), "test").unwrap(), "hello");
    }

    #[test]
    fn test_multibyte_plaintext() {
        let plaintext = "Olá, tudo bem? Mensagem secreta: 日本語テキスト 🔐";
        let envelope = fast().encrypt(plaintext, "chave").unwrap();
        assert_eq!(fast().decrypt(envelope.as_bytes(), "chave").unwrap(), plaintext);
    }

    #[test]
    fn test_large_plaintext() {
        let plaintext = "x".repeat(128 * 1024);
        let envelope = fast().encrypt(&plaintext, "test").unwrap();
        assert_eq!(fast().decrypt(envelope.as_bytes(), "test").unwrap(), plaintext);
    }

    #[test]
    fn test_empty_passphrase() {
        let envelope = fast().encrypt("weak but allowed", "").unwrap();
        assert_eq!(fast().decrypt(envelope.as_bytes(), "").unwrap(), "weak but allowed");
        assert!(
            fast()
                .decrypt(envelope.as_bytes(), " ")
                .unwrap_err()
                .is_authentication_failure()
        );
    }

    #[test]
    fn test_deterministic_encryption() {
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];

        let e1 = fast().encrypt_deterministic(b"hello world", "test", &salt, &nonce).unwrap();
        let e2 = fast().encrypt_deterministic(b"hello world", "test", &salt, &nonce).unwrap();

        // Same salt/nonce produces identical envelopes
        assert_eq!(e1, e2);
        assert_eq!(e1.salt(), Some(&salt[..]));
        assert_eq!(&e1.as_bytes()[SALT_LEN..SALT_LEN + NONCE_LEN], &nonce[..]);
        assert_eq!(fast().decrypt(e1.as_bytes(), "test").unwrap(), "hello world");
    }

    #[test]
    fn test_different_salt_different_ciphertext() {
        let nonce = [2u8; NONCE_LEN];
        let e1 = fast()
            .encrypt_deterministic(b"hello world", "test", &[1u8; SALT_LEN], &nonce)
            .unwrap();
        let e2 = fast()
            .encrypt_deterministic(b"hello world", "test", &[3u8; SALT_LEN], &nonce)
            .unwrap();

        // Different salt means a different key, so the sealed box differs too
        assert_ne!(e1.as_bytes()[SALT_LEN..], e2.as_bytes()[SALT_LEN..]);
        assert_eq!(fast().decrypt(e1.as_bytes(), "test").unwrap(), "hello world");
        assert_eq!(fast().decrypt(e2.as_bytes(), "test").unwrap(), "hello world");
    }

    #[test]
    fn test_salts_never_repeat() {
        let mut salts = HashSet::new();
        let mut envelopes = HashSet::new();
        for _ in 0..64 {
            let envelope = fast().encrypt("same text", "same passphrase").unwrap();
            assert!(salts.insert(envelope.salt().unwrap().to_vec()));
            assert!(envelopes.insert(envelope.into_bytes()));
        }
    }

    #[test]
    fn test_wrong_passphrase() {
        let envelope = fast().encrypt("secret data", "correct").unwrap();
        let err = fast()
            .decrypt(envelope.as_bytes(), "wrong")
            .expect_err("expected authentication failure");

        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(err.category, ErrorCategory::User);
        assert!(
            err.to_string()
                .contains("corrupt input, tampered-with data, or bad passphrase")
        );
    }

    #[test]
    fn test_wrong_work_factor_fails_authentication() {
        let envelope = fast().encrypt("secret data", "correct").unwrap();
        let other = Codec::new(KdfParams::with_iterations(1_001));
        assert!(
            other
                .decrypt(envelope.as_bytes(), "correct")
                .unwrap_err()
                .is_authentication_failure()
        );
    }

    #[test]
    fn test_every_flipped_byte_is_detected() {
        let envelope = fast().encrypt("tamper with me", "test").unwrap();

        for i in 0..envelope.len() {
            let mut tampered = envelope.clone().into_bytes();
            tampered[i] ^= 0x01;
            let err = fast()
                .decrypt(&tampered, "test")
                .expect_err("tampering must not yield plaintext");
            assert!(
                err.is_authentication_failure(),
                "byte {} produced {:?}",
                i,
                err.kind
            );
        }
    }

    #[test]
    fn test_truncated_sealed_box() {
        let envelope = fast().encrypt("hello", "test").unwrap();
        let bytes = envelope.as_bytes();

        // Dropping plaintext bytes keeps the framing valid but breaks the MAC
        let err = fast().decrypt(&bytes[..bytes.len() - 1], "test").unwrap_err();
        assert!(err.is_authentication_failure());

        // Dropping into the tag leaves nothing that could authenticate
        let err = fast()
            .decrypt(&bytes[..SALT_LEN + NONCE_LEN + TAG_LEN - 1], "test")
            .unwrap_err();
        assert!(err.is_malformed_envelope());
    }

    #[test]
    fn test_trailing_data() {
        let mut bytes = fast().encrypt("hello", "test").unwrap().into_bytes();
        bytes.push(0xFF);
        assert!(fast().decrypt(&bytes, "test").unwrap_err().is_authentication_failure());
    }

    #[test]
    fn test_empty_envelope_is_malformed() {
        let err = fast().decrypt(&[], "anything").expect_err("expected malformed envelope");
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn test_short_envelope_skips_key_derivation() {
        // Deriving with this work factor would run for hours
        let slow = Codec::new(KdfParams::with_iterations(u32::MAX));
        for len in [0, SALT_LEN, MIN_ENVELOPE_LEN - 1] {
            let err = slow.decrypt(&vec![0u8; len], "test").unwrap_err();
            assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope), "length {}", len);
        }
    }

    #[test]
    fn test_short_envelope_is_malformed() {
        for len in [1, SALT_LEN - 1, SALT_LEN, MIN_ENVELOPE_LEN - 1] {
            let err = fast().decrypt(&vec![0u8; len], "test").unwrap_err();
            assert!(err.is_malformed_envelope(), "length {}", len);
        }
    }

    #[test]
    fn test_non_utf8_content() {
        let salt = [5u8; SALT_LEN];
        let nonce = [6u8; NONCE_LEN];
        let envelope = fast()
            .encrypt_deterministic(&[0xff, 0xfe, 0x00], "test", &salt, &nonce)
            .unwrap();

        let err = fast().decrypt(envelope.as_bytes(), "test").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::PlaintextEncoding));
        assert_eq!(err.category, ErrorCategory::Internal);
    }

    #[test]
    fn test_codec_shared_across_threads() {
        let codec = fast();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let text = format!("message number {}", i);
                    let envelope = codec.encrypt(&text, "shared").unwrap();
                    assert_eq!(codec.decrypt(envelope.as_bytes(), "shared").unwrap(), text);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
