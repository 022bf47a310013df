//! Serializable key material for the host's configuration store.
//!
//! FieldVault never touches persistence itself; the host stores
//! `(dek_envelope, salt)` once at setup and reads them back on every
//! session unlock.  [`PersistedKeyMaterial`] is the recommended shape
//! for that record: byte fields serialize as base64 strings so it fits
//! any string-valued key-value store.

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Argon2Kdf, Argon2Params, KeyDerivation, Pbkdf2Fallback};
use crate::errors::{FieldVaultError, Result};

use super::settings::KdfChoice;

/// KDF tuning captured at setup time.
///
/// Stored next to the envelope so re-opening uses the exact same
/// settings even if the host's `.fieldvault.toml` changed since.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredKdfParams {
    pub kdf: KdfChoice,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub pbkdf2_iterations: u32,
}

impl StoredKdfParams {
    /// Rebuild the KDF strategy these parameters describe.
    ///
    /// The same fallback guard applies as at setup: stored PBKDF2
    /// parameters are refused unless the caller passes the explicit
    /// override.
    pub fn to_strategy(&self, allow_insecure_fallback: bool) -> Result<Box<dyn KeyDerivation>> {
        match self.kdf {
            KdfChoice::Argon2id => Ok(Box::new(Argon2Kdf::new(Argon2Params {
                memory_kib: self.memory_kib,
                iterations: self.iterations,
                parallelism: self.parallelism,
            }))),
            KdfChoice::Pbkdf2 => {
                if !allow_insecure_fallback {
                    return Err(FieldVaultError::WeakKdfRejected(
                        "stored key material uses the PBKDF2 fallback; \
                         refusing without allow_insecure_fallback"
                            .into(),
                    ));
                }
                Ok(Box::new(Pbkdf2Fallback::new(self.pbkdf2_iterations)?))
            }
        }
    }
}

/// The durable record a host persists for one encrypted scope.
///
/// Produced from `setup_encryption`'s output; consumed on every unlock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedKeyMaterial {
    /// The wrapped DEK (base64 in serialized form).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub dek_envelope: Vec<u8>,

    /// The KDF salt (base64 in serialized form).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// KDF tuning used at setup.
    pub kdf_params: StoredKdfParams,
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
