//! Password-based derivation of the Key-Encryption-Key.
//!
//! The primary strategy is Argon2id, a memory-hard KDF that resists
//! brute-force and GPU-based attacks.  A PBKDF2-HMAC-SHA256 fallback
//! exists for environments where Argon2 is unavailable; it is not
//! suitable for production and announces itself loudly when built.
//!
//! The strategy is chosen explicitly through [`crate::config::Settings`],
//! never probed at runtime, so operators always know which mode they run.

use argon2::{Algorithm, Argon2, Params, Version};
use sha2::Sha256;

use crate::envelope::SALT_LEN;
use crate::errors::{FieldVaultError, Result};

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Minimum PBKDF2 iteration count accepted for the fallback.
pub const MIN_PBKDF2_ITERATIONS: u32 = 600_000;

/// A password-to-KEK derivation strategy.
///
/// Exactly two implementations exist: [`Argon2Kdf`] (production) and
/// [`Pbkdf2Fallback`] (development only).  Callers receive one as a
/// `Box<dyn KeyDerivation>` from `Settings::kdf_strategy()` and pass
/// it to the session layer; nothing selects a strategy implicitly.
pub trait KeyDerivation {
    /// Derive a 32-byte KEK from a password and a 32-byte salt.
    ///
    /// Deterministic: the same password + salt always produces the same
    /// key.  Fails with a configuration error if the salt is not exactly
    /// 32 bytes.
    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]>;

    /// Whether this strategy is acceptable outside development.
    fn is_production_grade(&self) -> bool;

    /// Short human-readable name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Reject salts of the wrong size before any derivation work runs.
fn check_salt(salt: &[u8]) -> Result<()> {
    if salt.len() != SALT_LEN {
        return Err(FieldVaultError::InvalidSaltLength {
            expected: SALT_LEN,
            got: salt.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argon2id (primary)
// ---------------------------------------------------------------------------

/// Configurable Argon2id parameters.
///
/// These map 1:1 to the fields in `Settings` so hosts can pass whatever
/// was configured in `.fieldvault.toml`.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// The production KDF: Argon2id tuned to resist offline brute force.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Kdf {
    params: Argon2Params,
}

impl Argon2Kdf {
    /// Build with explicit parameters (validated at derive time, like
    /// every other parameter error).
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }
}

impl KeyDerivation for Argon2Kdf {
    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        check_salt(salt)?;

        // Enforce minimum parameters to prevent dangerously weak settings.
        if self.params.memory_kib < MIN_MEMORY_KIB {
            return Err(FieldVaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.params.memory_kib
            )));
        }
        if self.params.iterations < 1 {
            return Err(FieldVaultError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.params.parallelism < 1 {
            return Err(FieldVaultError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }

        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| {
            FieldVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}"))
        })?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; KEY_LEN];
        argon2.hash_password_into(password, salt, &mut key).map_err(|e| {
            FieldVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
        })?;

        Ok(key)
    }

    fn is_production_grade(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "argon2id"
    }
}

// ---------------------------------------------------------------------------
// PBKDF2-HMAC-SHA256 (development-only fallback)
// ---------------------------------------------------------------------------

/// Fallback KDF for environments lacking Argon2.
///
/// Not memory-hard, so far cheaper to brute-force offline.  Construction
/// emits a `tracing::warn!` so the weak mode is always observable; the
/// config layer additionally refuses to select it without an explicit
/// override.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2Fallback {
    iterations: u32,
}

impl Pbkdf2Fallback {
    /// Build the fallback with at least [`MIN_PBKDF2_ITERATIONS`] rounds.
    pub fn new(iterations: u32) -> Result<Self> {
        if iterations < MIN_PBKDF2_ITERATIONS {
            return Err(FieldVaultError::WeakKdfRejected(format!(
                "PBKDF2 iterations must be at least {MIN_PBKDF2_ITERATIONS} (got {iterations})"
            )));
        }
        tracing::warn!(
            iterations,
            "PBKDF2 fallback KDF active — NOT suitable for production, use Argon2id"
        );
        Ok(Self { iterations })
    }
}

impl KeyDerivation for Pbkdf2Fallback {
    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        check_salt(salt)?;

        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, self.iterations, &mut key);
        Ok(key)
    }

    fn is_production_grade(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "pbkdf2-sha256"
    }
}
