use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Argon2Kdf, Argon2Params, KeyDerivation, Pbkdf2Fallback};
use crate::errors::{FieldVaultError, Result};

use super::material::StoredKdfParams;

/// Which KDF strategy derives the KEK from the password.
///
/// Selected explicitly here, never probed from library availability at
/// runtime, so the effective mode is always visible in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KdfChoice {
    /// Memory-hard Argon2id (production default).
    Argon2id,
    /// PBKDF2-HMAC-SHA256 fallback — development only.
    Pbkdf2,
}

/// Host-level configuration, loaded from `.fieldvault.toml`.
///
/// Every field has a sensible default so FieldVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Which KDF derives the KEK (default: argon2id).
    #[serde(default = "default_kdf")]
    pub kdf: KdfChoice,

    /// Explicit opt-in required before the PBKDF2 fallback can be
    /// selected (default: false).
    #[serde(default)]
    pub allow_insecure_fallback: bool,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// PBKDF2 iteration count for the fallback (default: 600 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_kdf() -> KdfChoice {
    KdfChoice::Argon2id
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_pbkdf2_iterations() -> u32 {
    600_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            kdf: default_kdf(),
            allow_insecure_fallback: false,
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the host's config directory.
    const FILE_NAME: &'static str = ".fieldvault.toml";

    /// Load settings from `<dir>/.fieldvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            FieldVaultError::ConfigError(format!(
                "Failed to parse {}: {e}",
                config_path.display()
            ))
        })?;

        Ok(settings)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Build the configured KDF strategy.
    ///
    /// The PBKDF2 fallback is refused unless `allow_insecure_fallback`
    /// is set; there is no silent downgrade path.  The fallback itself
    /// logs a warning when constructed.
    pub fn kdf_strategy(&self) -> Result<Box<dyn KeyDerivation>> {
        match self.kdf {
            KdfChoice::Argon2id => Ok(Box::new(Argon2Kdf::new(self.argon2_params()))),
            KdfChoice::Pbkdf2 => {
                if !self.allow_insecure_fallback {
                    return Err(FieldVaultError::WeakKdfRejected(
                        "PBKDF2 fallback requires allow_insecure_fallback = true \
                         — it is not suitable for production"
                            .into(),
                    ));
                }
                Ok(Box::new(Pbkdf2Fallback::new(self.pbkdf2_iterations)?))
            }
        }
    }

    /// Snapshot the KDF tuning for persisting next to the DEK envelope,
    /// so a later unlock re-derives the KEK with the exact same settings.
    pub fn stored_kdf_params(&self) -> StoredKdfParams {
        StoredKdfParams {
            kdf: self.kdf,
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
            pbkdf2_iterations: self.pbkdf2_iterations,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.kdf, KdfChoice::Argon2id);
        assert!(!s.allow_insecure_fallback);
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
        assert_eq!(s.pbkdf2_iterations, 600_000);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.kdf, KdfChoice::Argon2id);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
kdf = "pbkdf2"
allow_insecure_fallback = true
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
pbkdf2_iterations = 800000
"#;
        fs::write(tmp.path().join(".fieldvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.kdf, KdfChoice::Pbkdf2);
        assert!(settings.allow_insecure_fallback);
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
        assert_eq!(settings.pbkdf2_iterations, 800_000);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let config = "argon2_iterations = 4\n";
        fs::write(tmp.path().join(".fieldvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.argon2_iterations, 4);
        // Rest should be defaults
        assert_eq!(settings.kdf, KdfChoice::Argon2id);
        assert_eq!(settings.argon2_memory_kib, 65_536);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".fieldvault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn pbkdf2_without_override_is_rejected() {
        let settings = Settings {
            kdf: KdfChoice::Pbkdf2,
            allow_insecure_fallback: false,
            ..Settings::default()
        };
        let result = settings.kdf_strategy();
        assert!(matches!(
            result,
            Err(crate::errors::FieldVaultError::WeakKdfRejected(_))
        ));
    }

    #[test]
    fn pbkdf2_with_override_is_allowed() {
        let settings = Settings {
            kdf: KdfChoice::Pbkdf2,
            allow_insecure_fallback: true,
            ..Settings::default()
        };
        let strategy = settings.kdf_strategy().unwrap();
        assert!(!strategy.is_production_grade());
        assert_eq!(strategy.name(), "pbkdf2-sha256");
    }

    #[test]
    fn argon2_strategy_is_production_grade() {
        let strategy = Settings::default().kdf_strategy().unwrap();
        assert!(strategy.is_production_grade());
        assert_eq!(strategy.name(), "argon2id");
    }
}
