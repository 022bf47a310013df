//! Fixed-layout binary envelopes for encrypted material.
//!
//! Two distinct envelope types exist and must never be conflated:
//!
//! ```text
//! Field envelope:  [nonce 12B][ciphertext incl. AEAD tag][hmac 32B]
//! DEK envelope:    [salt 32B][nonce 12B][ciphertext incl. AEAD tag][hmac 32B]
//! ```
//!
//! - The **field envelope** wraps one plaintext field under the DEK.
//! - The **DEK envelope** wraps the DEK itself under a password-derived
//!   KEK, and carries the salt needed to re-derive that KEK later.
//!
//! This module only slices and concatenates by fixed offsets and enforces
//! minimum lengths.  It carries no cryptographic logic: the cipher layer
//! is responsible for producing and verifying the pieces.

use crate::errors::{FieldVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the HMAC-SHA256 tag in bytes.
pub const HMAC_LEN: usize = 32;

/// Size of the KDF salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Smallest parseable field envelope: nonce + HMAC + at least one
/// ciphertext byte.
pub const MIN_FIELD_ENVELOPE_LEN: usize = NONCE_LEN + HMAC_LEN + 1;

/// Smallest parseable DEK envelope: salt + nonce + HMAC + at least one
/// ciphertext byte.
pub const MIN_DEK_ENVELOPE_LEN: usize = SALT_LEN + NONCE_LEN + HMAC_LEN + 1;

/// A parsed field envelope: `nonce || ciphertext || hmac`.
///
/// `ciphertext` includes the AEAD tag appended by AES-GCM itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEnvelope {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub hmac: [u8; HMAC_LEN],
}

impl FieldEnvelope {
    /// Serialize to the storable byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NONCE_LEN + self.ciphertext.len() + HMAC_LEN);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf.extend_from_slice(&self.hmac);
        buf
    }

    /// Parse a byte string produced by `encode`.
    ///
    /// The length check runs before any offset arithmetic so truncated
    /// input is rejected, not interpreted.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_FIELD_ENVELOPE_LEN {
            return Err(FieldVaultError::EnvelopeTooShort {
                min: MIN_FIELD_ENVELOPE_LEN,
                got: data.len(),
            });
        }

        let (nonce_bytes, rest) = data.split_at(NONCE_LEN);
        let (ciphertext, hmac_bytes) = rest.split_at(rest.len() - HMAC_LEN);

        // Slice sizes are fixed by the checks above, so these cannot fail.
        let nonce = nonce_bytes
            .try_into()
            .map_err(|_| FieldVaultError::DecryptionFailed)?;
        let hmac = hmac_bytes
            .try_into()
            .map_err(|_| FieldVaultError::DecryptionFailed)?;

        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
            hmac,
        })
    }
}

/// A parsed DEK envelope: `salt || nonce || ciphertext || hmac`.
///
/// The embedded salt lets a caller that only stored the envelope
/// re-derive the KEK from a password on a later unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DekEnvelope {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub hmac: [u8; HMAC_LEN],
}

impl DekEnvelope {
    /// Serialize to the storable byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(SALT_LEN + NONCE_LEN + self.ciphertext.len() + HMAC_LEN);
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf.extend_from_slice(&self.hmac);
        buf
    }

    /// Parse a byte string produced by `encode`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_DEK_ENVELOPE_LEN {
            return Err(FieldVaultError::EnvelopeTooShort {
                min: MIN_DEK_ENVELOPE_LEN,
                got: data.len(),
            });
        }

        let (salt_bytes, rest) = data.split_at(SALT_LEN);
        let (nonce_bytes, rest) = rest.split_at(NONCE_LEN);
        let (ciphertext, hmac_bytes) = rest.split_at(rest.len() - HMAC_LEN);

        let salt = salt_bytes
            .try_into()
            .map_err(|_| FieldVaultError::DecryptionFailed)?;
        let nonce = nonce_bytes
            .try_into()
            .map_err(|_| FieldVaultError::DecryptionFailed)?;
        let hmac = hmac_bytes
            .try_into()
            .map_err(|_| FieldVaultError::DecryptionFailed)?;

        Ok(Self {
            salt,
            nonce,
            ciphertext: ciphertext.to_vec(),
            hmac,
        })
    }
}
