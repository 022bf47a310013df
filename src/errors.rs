use thiserror::Error;

/// All errors that can occur in FieldVault.
#[derive(Debug, Error)]
pub enum FieldVaultError {
    // --- Configuration errors (caller bugs, not retryable) ---
    #[error("Invalid salt length: expected {expected} bytes, got {got}")]
    InvalidSaltLength { expected: usize, got: usize },

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Weak KDF rejected: {0}")]
    WeakKdfRejected(String),

    // --- Cipher errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong key or corrupted ciphertext")]
    DecryptionFailed,

    #[error("Tamper detected — HMAC verification failed before decryption")]
    TamperDetected,

    // --- Envelope errors ---
    #[error("Envelope too short: need at least {min} bytes, got {got}")]
    EnvelopeTooShort { min: usize, got: usize },

    // --- Session errors ---
    #[error("Session is not unlocked — call unlock() before encrypt/decrypt")]
    NotUnlocked,

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FieldVaultError {
    /// True for the decryption-failure family (including tamper detection).
    ///
    /// Callers that want a single "wrong password or corrupted data" message
    /// can branch on this instead of matching every variant. The core cannot
    /// distinguish a wrong key from corrupted data with certainty.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            Self::DecryptionFailed | Self::TamperDetected | Self::EnvelopeTooShort { .. }
        )
    }
}

/// Convenience type alias for FieldVault results.
pub type Result<T> = std::result::Result<T, FieldVaultError>;
