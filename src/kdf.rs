//! Password stretching
//!
//! Turns a human passphrase and a per-message salt into the 32-byte key used
//! by the secretbox. The stretch is PBKDF2 with HMAC-SHA-256; the iteration
//! count is the work factor and is deliberately expensive.

use crate::error::{ErrorCategory, ErrorKind, Result, WhisperError};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// A derived key. Wiped from memory when dropped.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Work factor for the password stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl KdfParams {
    /// Parameters with a custom iteration count. A count of zero is raised to one.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derive a key from a passphrase and a salt of exactly `SALT_LEN` bytes.
    pub fn derive(&self, passphrase: &str, salt: &[u8]) -> Result<DerivedKey> {
        let salt: &[u8; SALT_LEN] = salt.try_into().map_err(|_| {
            WhisperError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::KdfInput,
                format!("salt must be {} bytes, got {}", SALT_LEN, salt.len()),
            )
        })?;
        Ok(self.derive_key(passphrase.as_bytes(), salt))
    }

    pub(crate) fn derive_key(&self, passphrase: &[u8], salt: &[u8; SALT_LEN]) -> DerivedKey {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, self.iterations, key.as_mut());
        key
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive a key with the default work factor.
pub fn derive(passphrase: &str, salt: &[u8]) -> Result<DerivedKey> {
    KdfParams::default().derive(passphrase, salt)
}
