//! FieldVault — field-level encryption with a two-tier key hierarchy.
//!
//! A random Data-Encryption-Key (DEK) encrypts individual fields; a
//! password-derived Key-Encryption-Key (KEK) wraps the DEK for storage.
//! Every envelope is authenticated twice (AES-GCM tag plus an
//! independent HMAC-SHA256) and verified before decryption.
//!
//! Typical flow:
//!
//! ```no_run
//! use fieldvault::config::Settings;
//! use fieldvault::session::{setup_encryption, SessionKeyManager};
//!
//! # fn main() -> fieldvault::errors::Result<()> {
//! let kdf = Settings::default().kdf_strategy()?;
//!
//! // Once, at setup: persist both values in your config store.
//! let (dek_envelope, salt) = setup_encryption("correct horse", kdf.as_ref())?;
//!
//! // Per session:
//! let mut session = SessionKeyManager::new();
//! let scope = session.unlock_scoped("correct horse", &dek_envelope, &salt, kdf.as_ref())?;
//! let stored = scope.encrypt(b"exchange-api-key")?;
//! let back = scope.decrypt(&stored)?;
//! # assert_eq!(back, b"exchange-api-key");
//! // Dropping the scope locks the session and scrubs the DEK.
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod errors;
pub mod session;

pub use errors::{FieldVaultError, Result};
pub use session::{setup_encryption, unlock_encryption, DataKey, SessionKeyManager};
