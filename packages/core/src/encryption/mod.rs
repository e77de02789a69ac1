//! Asymmetric encryption of individual secret values.
//!
//! Each value is encrypted on its own to a single recipient and returned as
//! ASCII-armored text suitable for embedding in a YAML pillar.
//!
//! # Supported Engines
//!
//! - GnuPG (via the local `gpg` binary and keyring)
//! - age (in-process, X25519 recipients)

pub mod age;
pub mod gpg;

use crate::config::{EncryptionConfig, EncryptionEngine};
use crate::error::Result;

pub use self::age::AgeEncryptor;
pub use self::gpg::GpgEncryptor;

/// Encrypts one plaintext value to a fixed recipient.
pub trait Encryptor {
    /// Engine name used in messages.
    fn name(&self) -> &str;

    /// Encrypt `plaintext`, returning armored ciphertext.
    fn encrypt(&self, plaintext: &str) -> Result<String>;
}

/// Build the encryptor for the configured engine.
pub fn from_config(config: &EncryptionConfig) -> Result<Box<dyn Encryptor>> {
    match config.engine {
        EncryptionEngine::Gpg => Ok(Box::new(GpgEncryptor::from_config(config))),
        EncryptionEngine::Age => Ok(Box::new(AgeEncryptor::new(&config.recipient)?)),
    }
}
