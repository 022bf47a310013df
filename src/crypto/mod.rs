//! Cryptographic primitives for FieldVault.
//!
//! This module provides:
//! - AES-256-GCM encryption with a second HMAC-SHA256 layer (`cipher`)
//! - Password-based KEK derivation strategies (`kdf`)
//! - CSPRNG generation of DEKs, salts, and nonces (`random`)

pub mod cipher;
pub mod kdf;
pub mod random;

// Re-export the most commonly used items so callers can write:
//   use fieldvault::crypto::{encrypt_field, decrypt_field, ...};
pub use cipher::{decrypt_dek, decrypt_field, derive_hmac_key, encrypt_dek, encrypt_field};
pub use kdf::{Argon2Kdf, Argon2Params, KeyDerivation, Pbkdf2Fallback};
pub use random::{generate_dek, generate_nonce, generate_salt};
