//! Cryptographically secure random material.
//!
//! Three pure generators with fixed output sizes: the 32-byte DEK,
//! the 32-byte KDF salt, and the 12-byte AES-GCM nonce.  No state,
//! no side effects beyond entropy consumption.

use rand::RngCore;

use crate::envelope::{NONCE_LEN, SALT_LEN};

/// Length of the Data-Encryption-Key in bytes (256 bits).
pub const DEK_LEN: usize = 32;

/// Generate a cryptographically random 32-byte Data-Encryption-Key.
pub fn generate_dek() -> [u8; DEK_LEN] {
    let mut dek = [0u8; DEK_LEN];
    rand::rngs::OsRng.fill_bytes(&mut dek);
    dek
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Generate a cryptographically random 12-byte AES-GCM nonce.
///
/// Every encryption call must draw a fresh nonce; a repeated nonce
/// under the same key breaks GCM confidentiality and authenticity.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}
