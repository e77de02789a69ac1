//! age encryption to an X25519 recipient.
//!
//! Runs entirely in-process; no key material is read from disk.

use super::Encryptor;
use crate::error::{PillarError, Result};
use std::str::FromStr;

/// Encrypts values to one `age1...` public key.
pub struct AgeEncryptor {
    recipient: age::x25519::Recipient,
}

impl AgeEncryptor {
    /// Parse the recipient public key.
    pub fn new(recipient: &str) -> Result<Self> {
        let recipient = age::x25519::Recipient::from_str(recipient.trim()).map_err(|e| {
            PillarError::encryption(format!("invalid age recipient '{}': {}", recipient, e))
        })?;

        Ok(Self { recipient })
    }
}

impl Encryptor for AgeEncryptor {
    fn name(&self) -> &str {
        "age"
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        age::encrypt_and_armor(&self.recipient, plaintext.as_bytes())
            .map_err(|e| PillarError::encryption(e.to_string()))
    }
}
