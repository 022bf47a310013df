//! Integration tests for the FieldVault crypto module.

use fieldvault::crypto::kdf::{Argon2Kdf, Argon2Params, KeyDerivation, Pbkdf2Fallback};
use fieldvault::crypto::{
    decrypt_dek, decrypt_field, derive_hmac_key, encrypt_dek, encrypt_field, generate_dek,
    generate_nonce, generate_salt,
};
use fieldvault::envelope::{HMAC_LEN, NONCE_LEN};
use fieldvault::FieldVaultError;

/// Argon2 tuned down to the enforced minimum so tests stay fast.
fn test_kdf() -> Argon2Kdf {
    Argon2Kdf::new(Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    })
}

// ---------------------------------------------------------------------------
// Field encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn field_roundtrip() {
    let dek = generate_dek();
    let plaintext = b"binance-api-key-AKIA1234567890";

    let envelope = encrypt_field(plaintext, &dek).expect("encrypt should succeed");

    // nonce + (plaintext + 16-byte GCM tag) + hmac
    assert_eq!(envelope.len(), NONCE_LEN + plaintext.len() + 16 + HMAC_LEN);

    let recovered = decrypt_field(&envelope, &dek).expect("decrypt should succeed");
    assert_eq!(recovered, plaintext);
}

#[test]
fn field_roundtrip_empty_plaintext() {
    let dek = generate_dek();
    let envelope = encrypt_field(b"", &dek).expect("encrypt empty");
    assert_eq!(envelope.len(), NONCE_LEN + 16 + HMAC_LEN);

    let recovered = decrypt_field(&envelope, &dek).expect("decrypt empty");
    assert!(recovered.is_empty());
}

#[test]
fn encrypting_hello_twice_under_zero_dek_differs_but_both_decrypt() {
    // Fixed all-zero DEK: two encryptions must still differ because each
    // call draws a fresh random nonce.
    let dek = [0u8; 32];

    let e1 = encrypt_field("hello".as_bytes(), &dek).expect("encrypt 1");
    let e2 = encrypt_field("hello".as_bytes(), &dek).expect("encrypt 2");
    assert_ne!(e1, e2, "two encryptions of the same plaintext must differ");

    assert_eq!(decrypt_field(&e1, &dek).expect("decrypt 1"), b"hello");
    assert_eq!(decrypt_field(&e2, &dek).expect("decrypt 2"), b"hello");
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let dek = [0x11u8; 32];
    let wrong = [0x22u8; 32];

    let envelope = encrypt_field(b"TOP_SECRET=42", &dek).expect("encrypt");
    let result = decrypt_field(&envelope, &wrong);

    // The HMAC sub-key differs too, so the wrong key trips tamper
    // detection before AEAD decryption is ever attempted.
    assert!(matches!(result, Err(FieldVaultError::TamperDetected)));
}

#[test]
fn bad_key_sizes_are_configuration_errors() {
    let short_key = [0u8; 16];
    assert!(matches!(
        encrypt_field(b"x", &short_key),
        Err(FieldVaultError::InvalidKeyLength { expected: 32, got: 16 })
    ));
    assert!(matches!(
        decrypt_field(&[0u8; 64], &short_key),
        Err(FieldVaultError::InvalidKeyLength { expected: 32, got: 16 })
    ));
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn every_ciphertext_bit_flip_is_detected_as_tampering() {
    let dek = generate_dek();
    let envelope = encrypt_field(b"peg-monitor-threshold", &dek).expect("encrypt");

    // Walk every byte of the ciphertext region (between nonce and HMAC).
    for i in NONCE_LEN..envelope.len() - HMAC_LEN {
        let mut tampered = envelope.clone();
        tampered[i] ^= 0x01;
        let result = decrypt_field(&tampered, &dek);
        assert!(
            matches!(result, Err(FieldVaultError::TamperDetected)),
            "flip at byte {i} must be reported as tampering"
        );
    }
}

#[test]
fn every_hmac_bit_flip_is_detected_as_tampering() {
    let dek = generate_dek();
    let envelope = encrypt_field(b"v", &dek).expect("encrypt");

    for i in envelope.len() - HMAC_LEN..envelope.len() {
        let mut tampered = envelope.clone();
        tampered[i] ^= 0x80;
        let result = decrypt_field(&tampered, &dek);
        assert!(
            matches!(result, Err(FieldVaultError::TamperDetected)),
            "flip at HMAC byte {i} must be reported as tampering"
        );
    }
}

#[test]
fn nonce_corruption_fails_at_the_aead_layer() {
    // The HMAC covers only the ciphertext, so a nonce flip passes the
    // MAC check and must then fail AEAD decryption.
    let dek = generate_dek();
    let mut envelope = encrypt_field(b"payload", &dek).expect("encrypt");
    envelope[0] ^= 0x01;

    let result = decrypt_field(&envelope, &dek);
    assert!(matches!(result, Err(FieldVaultError::DecryptionFailed)));
}

#[test]
fn short_input_is_rejected_before_slicing() {
    let dek = generate_dek();

    // Anything below nonce + hmac + 1 byte of ciphertext must be
    // rejected up front.
    for len in 0..NONCE_LEN + HMAC_LEN + 1 {
        let result = decrypt_field(&vec![0u8; len], &dek);
        assert!(
            matches!(result, Err(FieldVaultError::EnvelopeTooShort { .. })),
            "length {len} must be rejected as too short"
        );
    }
}

// ---------------------------------------------------------------------------
// DEK wrapping
// ---------------------------------------------------------------------------

#[test]
fn dek_wrap_roundtrip() {
    let dek = generate_dek();
    let kek = generate_dek();
    let salt = generate_salt();

    let envelope = encrypt_dek(&dek, &kek, &salt).expect("wrap");
    let recovered = decrypt_dek(&envelope, &kek).expect("unwrap");

    assert_eq!(recovered, dek);
}

#[test]
fn dek_wrap_embeds_the_salt() {
    let dek = generate_dek();
    let kek = generate_dek();
    let salt = generate_salt();

    let envelope = encrypt_dek(&dek, &kek, &salt).expect("wrap");
    assert_eq!(&envelope[..32], &salt, "salt must lead the DEK envelope");
}

#[test]
fn dek_unwrap_with_wrong_kek_fails() {
    let dek = generate_dek();
    let kek = generate_dek();
    let wrong_kek = generate_dek();
    let salt = generate_salt();

    let envelope = encrypt_dek(&dek, &kek, &salt).expect("wrap");
    let result = decrypt_dek(&envelope, &wrong_kek);
    assert!(result.is_err(), "unwrap with the wrong KEK must fail");
}

#[test]
fn dek_envelope_tamper_is_detected() {
    let dek = generate_dek();
    let kek = generate_dek();
    let salt = generate_salt();

    let mut envelope = encrypt_dek(&dek, &kek, &salt).expect("wrap");
    // Flip a bit in the ciphertext region (after salt + nonce).
    envelope[32 + NONCE_LEN] ^= 0x01;

    let result = decrypt_dek(&envelope, &kek);
    assert!(matches!(result, Err(FieldVaultError::TamperDetected)));
}

#[test]
fn dek_wrap_enforces_exact_sizes() {
    let kek = generate_dek();
    let salt = generate_salt();

    assert!(matches!(
        encrypt_dek(&[0u8; 16], &kek, &salt),
        Err(FieldVaultError::InvalidKeyLength { .. })
    ));
    assert!(matches!(
        encrypt_dek(&generate_dek(), &[0u8; 31], &salt),
        Err(FieldVaultError::InvalidKeyLength { .. })
    ));
    assert!(matches!(
        encrypt_dek(&generate_dek(), &kek, &[0u8; 16]),
        Err(FieldVaultError::InvalidSaltLength { expected: 32, got: 16 })
    ));
}

// ---------------------------------------------------------------------------
// HMAC sub-key derivation
// ---------------------------------------------------------------------------

#[test]
fn hmac_key_differs_from_encryption_key() {
    let key = [0x42u8; 32];
    let hmac_key = derive_hmac_key(&key);
    assert_ne!(hmac_key, key, "HMAC key must never equal the cipher key");
}

#[test]
fn hmac_key_is_deterministic_per_key() {
    let key_a = [0x01u8; 32];
    let key_b = [0x02u8; 32];

    assert_eq!(derive_hmac_key(&key_a), derive_hmac_key(&key_a));
    assert_ne!(derive_hmac_key(&key_a), derive_hmac_key(&key_b));
}

// ---------------------------------------------------------------------------
// Key derivation strategies
// ---------------------------------------------------------------------------

#[test]
fn argon2_same_inputs_same_output() {
    let kdf = test_kdf();
    let salt = generate_salt();

    let key1 = kdf.derive_key(b"my-secure-passphrase", &salt).expect("derive 1");
    let key2 = kdf.derive_key(b"my-secure-passphrase", &salt).expect("derive 2");

    assert_eq!(key1, key2, "same password + salt must produce the same key");
}

#[test]
fn argon2_different_salts_different_keys() {
    let kdf = test_kdf();

    let key1 = kdf.derive_key(b"same-password", &generate_salt()).expect("derive 1");
    let key2 = kdf.derive_key(b"same-password", &generate_salt()).expect("derive 2");

    assert_ne!(key1, key2, "different salts must produce different keys");
}

#[test]
fn argon2_different_passwords_different_keys() {
    let kdf = test_kdf();
    let salt = generate_salt();

    let key1 = kdf.derive_key(b"password-one", &salt).expect("derive 1");
    let key2 = kdf.derive_key(b"password-two", &salt).expect("derive 2");

    assert_ne!(key1, key2, "different passwords must produce different keys");
}

#[test]
fn kdf_rejects_wrong_salt_size() {
    let kdf = test_kdf();
    let result = kdf.derive_key(b"pw", &[0u8; 16]);
    assert!(matches!(
        result,
        Err(FieldVaultError::InvalidSaltLength { expected: 32, got: 16 })
    ));
}

#[test]
fn argon2_rejects_weak_memory_cost() {
    let kdf = Argon2Kdf::new(Argon2Params {
        memory_kib: 1_024,
        iterations: 3,
        parallelism: 4,
    });
    let result = kdf.derive_key(b"pw", &generate_salt());
    assert!(matches!(result, Err(FieldVaultError::KeyDerivationFailed(_))));
}

#[test]
fn pbkdf2_fallback_is_deterministic_and_flagged() {
    let kdf = Pbkdf2Fallback::new(600_000).expect("minimum iterations are accepted");
    assert!(!kdf.is_production_grade());

    let salt = generate_salt();
    let key1 = kdf.derive_key(b"pw", &salt).expect("derive 1");
    let key2 = kdf.derive_key(b"pw", &salt).expect("derive 2");
    assert_eq!(key1, key2);

    let other = kdf.derive_key(b"pw2", &salt).expect("derive 3");
    assert_ne!(key1, other);
}

#[test]
fn pbkdf2_below_minimum_iterations_is_rejected() {
    let result = Pbkdf2Fallback::new(10_000);
    assert!(matches!(result, Err(FieldVaultError::WeakKdfRejected(_))));
}

// ---------------------------------------------------------------------------
// Randomness source
// ---------------------------------------------------------------------------

#[test]
fn generators_produce_fixed_sizes_and_fresh_values() {
    assert_eq!(generate_dek().len(), 32);
    assert_eq!(generate_salt().len(), 32);
    assert_eq!(generate_nonce().len(), 12);

    // Collision over a 96-bit+ space would indicate a broken CSPRNG.
    assert_ne!(generate_dek(), generate_dek());
    assert_ne!(generate_salt(), generate_salt());
    assert_ne!(generate_nonce(), generate_nonce());
}
