//! Configuration: KDF selection and persisted key material shapes.

pub mod material;
pub mod settings;

pub use material::{PersistedKeyMaterial, StoredKdfParams};
pub use settings::{KdfChoice, Settings};
