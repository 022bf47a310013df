//! AES-256-GCM encryption with an independent HMAC-SHA256 tag.
//!
//! Every envelope carries two layers of authentication: the AEAD tag
//! embedded in the GCM ciphertext, and an HMAC-SHA256 over that
//! ciphertext under a key derived from (but never equal to) the
//! encryption key.  Decryption verifies the HMAC in constant time and
//! fails closed before the AEAD layer is ever touched.
//!
//! Two operations exist, structurally identical but producing distinct
//! envelope types (`crate::envelope`):
//! - field encryption: plaintext wrapped under the DEK;
//! - DEK wrapping: the DEK itself wrapped under a password-derived KEK,
//!   with the KDF salt carried alongside.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::envelope::{DekEnvelope, FieldEnvelope, HMAC_LEN, SALT_LEN};
use crate::errors::{FieldVaultError, Result};

use super::kdf::KEY_LEN;
use super::random::{generate_nonce, DEK_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation prefix for HMAC sub-key derivation.
const HMAC_KEY_DOMAIN: &[u8] = b"hmac-key:";

/// Derive the HMAC sub-key for a given encryption key.
///
/// Computes `SHA-256("hmac-key:" || key)`: a single domain-separated
/// hash, not a second KDF run.  The result is never identical to the
/// encryption key and cannot be obtained without it, so the same key
/// bytes are never reused across the cipher and the MAC.
pub fn derive_hmac_key(key: &[u8]) -> [u8; HMAC_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(HMAC_KEY_DOMAIN);
    hasher.update(key);
    hasher.finalize().into()
}

/// Reject keys of the wrong size before building a cipher.
fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(FieldVaultError::InvalidKeyLength {
            expected: KEY_LEN,
            got: key.len(),
        });
    }
    Ok(())
}

/// HMAC-SHA256 over the ciphertext bytes.
fn compute_hmac(hmac_key: &[u8], ciphertext: &[u8]) -> Result<[u8; HMAC_LEN]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(hmac_key)
        .map_err(|e| FieldVaultError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;
    mac.update(ciphertext);
    Ok(mac.finalize().into_bytes().into())
}

/// Verify the HMAC using constant-time comparison.
///
/// `hmac::Mac::verify_slice` is guaranteed constant-time, preventing
/// timing side-channel attacks.  A mismatch is reported as tampering,
/// never as a generic decryption failure.
fn verify_hmac(hmac_key: &[u8], ciphertext: &[u8], expected: &[u8]) -> Result<()> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(hmac_key)
        .map_err(|_| FieldVaultError::DecryptionFailed)?;
    mac.update(ciphertext);
    mac.verify_slice(expected)
        .map_err(|_| FieldVaultError::TamperDetected)
}

/// Encrypt one plaintext field under the DEK.
///
/// Draws a fresh random nonce, AEAD-encrypts with no associated data,
/// MACs the ciphertext under the derived HMAC sub-key, and returns the
/// encoded field envelope.  Output length is always
/// `12 + len(plaintext) + 16 + 32` (nonce, ciphertext with embedded
/// GCM tag, HMAC).
pub fn encrypt_field(plaintext: &[u8], dek: &[u8]) -> Result<Vec<u8>> {
    check_key(dek)?;

    let cipher = Aes256Gcm::new_from_slice(dek)
        .map_err(|e| FieldVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = generate_nonce();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| FieldVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut hmac_key = derive_hmac_key(dek);
    let hmac = compute_hmac(&hmac_key, &ciphertext)?;
    hmac_key.zeroize();

    Ok(FieldEnvelope {
        nonce,
        ciphertext,
        hmac,
    }
    .encode())
}

/// Decrypt a field envelope produced by [`encrypt_field`].
///
/// Order matters: minimum-length parsing, then constant-time HMAC
/// verification, and only then AEAD decryption.  A tampered envelope
/// never reaches the cipher.
pub fn decrypt_field(envelope: &[u8], dek: &[u8]) -> Result<Vec<u8>> {
    check_key(dek)?;

    let parsed = FieldEnvelope::decode(envelope)?;

    let mut hmac_key = derive_hmac_key(dek);
    let verified = verify_hmac(&hmac_key, &parsed.ciphertext, &parsed.hmac);
    hmac_key.zeroize();
    verified?;

    let cipher =
        Aes256Gcm::new_from_slice(dek).map_err(|_| FieldVaultError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&parsed.nonce), parsed.ciphertext.as_slice())
        .map_err(|_| FieldVaultError::DecryptionFailed)?;

    Ok(plaintext)
}

/// Wrap the DEK under a KEK, carrying the KDF salt in the envelope.
///
/// Enforces exact 32-byte sizes for both keys and the salt; the salt is
/// stored so the KEK can be re-derived from a password on a later unlock.
pub fn encrypt_dek(dek: &[u8], kek: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
    if dek.len() != DEK_LEN {
        return Err(FieldVaultError::InvalidKeyLength {
            expected: DEK_LEN,
            got: dek.len(),
        });
    }
    check_key(kek)?;
    if salt.len() != SALT_LEN {
        return Err(FieldVaultError::InvalidSaltLength {
            expected: SALT_LEN,
            got: salt.len(),
        });
    }

    let cipher = Aes256Gcm::new_from_slice(kek)
        .map_err(|e| FieldVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = generate_nonce();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), dek)
        .map_err(|e| FieldVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut hmac_key = derive_hmac_key(kek);
    let hmac = compute_hmac(&hmac_key, &ciphertext)?;
    hmac_key.zeroize();

    // Salt size was checked above.
    let salt_arr: [u8; SALT_LEN] = salt
        .try_into()
        .map_err(|_| FieldVaultError::InvalidSaltLength {
            expected: SALT_LEN,
            got: salt.len(),
        })?;

    Ok(DekEnvelope {
        salt: salt_arr,
        nonce,
        ciphertext,
        hmac,
    }
    .encode())
}

/// Unwrap a DEK envelope produced by [`encrypt_dek`].
///
/// Same verify-then-decrypt discipline as [`decrypt_field`].  The
/// recovered DEK must be exactly 32 bytes; anything else means the
/// envelope was not a DEK wrap and is rejected.
pub fn decrypt_dek(envelope: &[u8], kek: &[u8]) -> Result<[u8; DEK_LEN]> {
    check_key(kek)?;

    let parsed = DekEnvelope::decode(envelope)?;

    let mut hmac_key = derive_hmac_key(kek);
    let verified = verify_hmac(&hmac_key, &parsed.ciphertext, &parsed.hmac);
    hmac_key.zeroize();
    verified?;

    let cipher =
        Aes256Gcm::new_from_slice(kek).map_err(|_| FieldVaultError::DecryptionFailed)?;
    let mut plaintext = cipher
        .decrypt(Nonce::from_slice(&parsed.nonce), parsed.ciphertext.as_slice())
        .map_err(|_| FieldVaultError::DecryptionFailed)?;

    if plaintext.len() != DEK_LEN {
        plaintext.zeroize();
        return Err(FieldVaultError::DecryptionFailed);
    }

    let mut dek = [0u8; DEK_LEN];
    dek.copy_from_slice(&plaintext);
    plaintext.zeroize();
    Ok(dek)
}
