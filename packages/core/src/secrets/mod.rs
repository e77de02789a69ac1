//! Secret backends that supply the client credential pair.
//!
//! # Supported Backends
//!
//! - HashiCorp Vault (KV v2, token auth)
//! - AWS Systems Manager Parameter Store (SecureString with decryption)

pub mod parameter_store;
pub mod vault;

use crate::config::{SecretBackend, SecretsConfig};
use crate::error::{PillarError, Result};
use async_trait::async_trait;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use parameter_store::ParameterStoreSource;
pub use vault::VaultSource;

/// Plaintext client credentials, held in memory for a single run.
///
/// Both values are redacted in `Debug` output and zeroed when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CredentialPair {
    client_id: String,
    client_secret: String,
}

impl CredentialPair {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("client_id", &"[REDACTED]")
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// A system of record that can hand out the credential pair.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Human-readable backend name used in messages.
    fn name(&self) -> &str;

    /// Fetch `(client_id, client_secret)` or fail the run.
    async fn fetch(&self) -> Result<CredentialPair>;
}

/// Build the source for the configured backend.
pub async fn connect(config: &SecretsConfig) -> Result<Box<dyn SecretSource>> {
    match config.backend {
        SecretBackend::Vault => {
            let vault = config.vault.as_ref().ok_or_else(|| {
                PillarError::config("Backend 'vault' selected but no 'secrets.vault' section")
            })?;
            Ok(Box::new(VaultSource::new(vault)?))
        }
        SecretBackend::AwsParameterStore => {
            let aws = config.aws_parameter_store.as_ref().ok_or_else(|| {
                PillarError::config(
                    "Backend 'aws_parameter_store' selected but no 'secrets.aws_parameter_store' section",
                )
            })?;
            Ok(Box::new(ParameterStoreSource::connect(aws).await))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_pair_debug_is_redacted() {
        let pair = CredentialPair::new("abc123", "s3cr3t");
        let printed = format!("{:?}", pair);

        assert!(!printed.contains("abc123"));
        assert!(!printed.contains("s3cr3t"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_pair_accessors() {
        let pair = CredentialPair::new("abc123", "s3cr3t");

        assert_eq!(pair.client_id(), "abc123");
        assert_eq!(pair.client_secret(), "s3cr3t");
    }

    #[tokio::test]
    async fn test_connect_requires_selected_section() {
        let config = SecretsConfig {
            backend: SecretBackend::Vault,
            vault: None,
            aws_parameter_store: None,
        };

        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, PillarError::Config { .. }));
    }
}
