//! Session-scoped key lifecycle.
//!
//! A [`SessionKeyManager`] holds at most one unlocked DEK and is the
//! only caller-facing encryption surface.  It is a two-state machine:
//! **Locked** (no key, `encrypt`/`decrypt` fail) and **Unlocked**
//! (key held in a zeroize-on-drop wrapper).
//!
//! A manager is not safe for concurrent unlock/lock/encrypt calls from
//! multiple threads; the intended discipline is one manager per
//! authenticated session, driven by one logical flow at a time.  Wrap
//! it in a mutex if true concurrent access is required.
//!
//! Key scrubbing on `lock()` is best-effort: zeroing the backing buffer
//! is a mitigation against key material lingering in process memory,
//! not a hard boundary against memory disclosure.

use std::ops::{Deref, DerefMut};

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::crypto::cipher::{decrypt_dek, decrypt_field, encrypt_dek, encrypt_field};
use crate::crypto::kdf::{KeyDerivation, KEY_LEN};
use crate::crypto::random::{generate_dek, generate_salt, DEK_LEN};
use crate::envelope::SALT_LEN;
use crate::errors::{FieldVaultError, Result};

/// A 32-byte Data-Encryption-Key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DataKey {
    bytes: [u8; DEK_LEN],
}

impl DataKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; DEK_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to pass to the cipher layer).
    pub fn as_bytes(&self) -> &[u8; DEK_LEN] {
        &self.bytes
    }
}

impl PartialEq for DataKey {
    /// Constant-time comparison so key equality checks never leak
    /// matching-prefix timing.
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for DataKey {}

impl std::fmt::Debug for DataKey {
    // Key bytes must never end up in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey([redacted])")
    }
}

/// Holds the unlocked DEK for one session and exposes field
/// encryption/decryption while unlocked.
#[derive(Default)]
pub struct SessionKeyManager {
    /// `Some` while Unlocked; dropping the `DataKey` zeroizes it.
    key: Option<DataKey>,
}

impl SessionKeyManager {
    /// Create a manager in the Locked state.
    pub fn new() -> Self {
        Self { key: None }
    }

    /// Whether a DEK is currently held.
    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    /// Derive the KEK from `password` + `salt`, unwrap the DEK from
    /// `dek_envelope`, and transition to Unlocked.
    ///
    /// Tamper and decryption failures propagate unmasked; whether to
    /// present them as "wrong password" or "corrupted data" is the
    /// caller's product decision.  Re-unlocking while already Unlocked
    /// replaces the held key; the old key is scrubbed first.
    pub fn unlock(
        &mut self,
        password: &str,
        dek_envelope: &[u8],
        salt: &[u8],
        kdf: &dyn KeyDerivation,
    ) -> Result<()> {
        let mut kek = kdf.derive_key(password.as_bytes(), salt)?;
        let result = self.unlock_with_kek(dek_envelope, &kek);
        kek.zeroize();
        result
    }

    /// Alternate unlock entry when a KEK is already in hand.
    pub fn unlock_with_kek(&mut self, dek_envelope: &[u8], kek: &[u8]) -> Result<()> {
        let dek = decrypt_dek(dek_envelope, kek)?;

        // Drop (and thereby zeroize) any previously held key first.
        self.lock();
        self.key = Some(DataKey::new(dek));
        Ok(())
    }

    /// Scrub the held DEK and transition to Locked.  Idempotent.
    pub fn lock(&mut self) {
        // Dropping the DataKey zeroizes its backing buffer.
        self.key = None;
    }

    /// Encrypt one plaintext field under the held DEK.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.key.as_ref().ok_or(FieldVaultError::NotUnlocked)?;
        encrypt_field(plaintext, key.as_bytes())
    }

    /// Decrypt a field envelope under the held DEK.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        let key = self.key.as_ref().ok_or(FieldVaultError::NotUnlocked)?;
        decrypt_field(envelope, key.as_bytes())
    }

    /// Unlock and return a guard that locks again when it goes out of
    /// scope, on every exit path including errors and panics.
    pub fn unlock_scoped<'a>(
        &'a mut self,
        password: &str,
        dek_envelope: &[u8],
        salt: &[u8],
        kdf: &dyn KeyDerivation,
    ) -> Result<UnlockedScope<'a>> {
        self.unlock(password, dek_envelope, salt, kdf)?;
        Ok(UnlockedScope { manager: self })
    }

    /// Enter a scope on an already-unlocked manager.
    ///
    /// Fails if the manager is Locked; on success the returned guard
    /// locks the manager when dropped.
    pub fn scoped(&mut self) -> Result<UnlockedScope<'_>> {
        if !self.is_unlocked() {
            return Err(FieldVaultError::NotUnlocked);
        }
        Ok(UnlockedScope { manager: self })
    }
}

/// RAII guard bounding a DEK's exposure window to one scope.
///
/// Derefs to the underlying [`SessionKeyManager`]; `lock()` runs on
/// drop, so the key cannot outlive the scope.
pub struct UnlockedScope<'a> {
    manager: &'a mut SessionKeyManager,
}

impl Deref for UnlockedScope<'_> {
    type Target = SessionKeyManager;

    fn deref(&self) -> &Self::Target {
        self.manager
    }
}

impl DerefMut for UnlockedScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.manager
    }
}

impl Drop for UnlockedScope<'_> {
    fn drop(&mut self) {
        self.manager.lock();
    }
}

/// One-shot initializer for a new installation.
///
/// Generates a fresh salt and DEK, derives the KEK from `password`,
/// wraps the DEK, and returns `(dek_envelope, salt)` for the caller to
/// persist in its configuration store.  The plaintext DEK never leaves
/// this function.
pub fn setup_encryption(
    password: &str,
    kdf: &dyn KeyDerivation,
) -> Result<(Vec<u8>, [u8; SALT_LEN])> {
    let salt = generate_salt();
    let mut kek = kdf.derive_key(password.as_bytes(), &salt)?;
    let mut dek = generate_dek();

    let envelope = encrypt_dek(&dek, &kek, &salt);
    kek.zeroize();
    dek.zeroize();

    Ok((envelope?, salt))
}

/// Convenience composition of derive + unwrap for session startup.
///
/// Returns the recovered DEK for callers that manage the key directly
/// rather than through a [`SessionKeyManager`].
pub fn unlock_encryption(
    password: &str,
    dek_envelope: &[u8],
    salt: &[u8],
    kdf: &dyn KeyDerivation,
) -> Result<DataKey> {
    let mut kek: [u8; KEY_LEN] = kdf.derive_key(password.as_bytes(), salt)?;
    let result = decrypt_dek(dek_envelope, &kek);
    kek.zeroize();
    Ok(DataKey::new(result?))
}
