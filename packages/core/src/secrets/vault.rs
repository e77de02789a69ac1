//! HashiCorp Vault source for the credential pair.
//!
//! Reads a single KV v2 secret with token authentication and returns the two
//! configured fields.
//!
//! # Failure posture
//!
//! A missing secret (404), a rejected or expired token (403), an unreachable
//! server, a missing field or a non-string field value all fail the run.
//! Nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use pillar_sync::config::VaultConfig;
//! use pillar_sync::secrets::{SecretSource, VaultSource};
//!
//! # async fn run(config: &VaultConfig) -> pillar_sync::error::Result<()> {
//! let source = VaultSource::new(config)?;
//! let credentials = source.fetch().await?;
//! println!("client id length: {}", credentials.client_id().len());
//! # Ok(())
//! # }
//! ```

use super::{CredentialPair, SecretSource};
use crate::config::VaultConfig;
use crate::error::{PillarError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;
use zeroize::Zeroize;

const BACKEND: &str = "Vault";

/// Credential source backed by a Vault KV v2 secret.
pub struct VaultSource {
    client: VaultClient,
    mount: String,
    path: String,
    client_id_field: String,
    client_secret_field: String,
}

impl VaultSource {
    /// Build a client from configuration. No request is made until [`fetch`].
    ///
    /// [`fetch`]: SecretSource::fetch
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let token = config.token.as_deref().ok_or_else(|| {
            PillarError::config(
                "No Vault token: set 'secrets.vault.token' or the VAULT_TOKEN environment variable",
            )
        })?;

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);
        settings_builder.token(token);
        settings_builder.verify(config.verify_tls);

        if let Some(namespace) = &config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder
            .build()
            .map_err(|e| PillarError::config(format!("Invalid Vault configuration: {}", e)))?;

        let client = VaultClient::new(settings).map_err(|e| {
            PillarError::secret_fetch(BACKEND, format!("Failed to create Vault client: {}", e))
        })?;

        Ok(Self {
            client,
            mount: config.mount.clone(),
            path: config.path.clone(),
            client_id_field: config.client_id_field.clone(),
            client_secret_field: config.client_secret_field.clone(),
        })
    }
}

#[async_trait]
impl SecretSource for VaultSource {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn fetch(&self) -> Result<CredentialPair> {
        tracing::debug!(mount = %self.mount, path = %self.path, "Reading KV v2 secret");

        let mut data: HashMap<String, serde_json::Value> =
            kv2::read(&self.client, &self.mount, &self.path)
                .await
                .map_err(|e| PillarError::secret_fetch(BACKEND, describe(e, &self.mount, &self.path)))?;

        let credentials = string_field(&data, &self.client_id_field).and_then(|client_id| {
            let client_secret = string_field(&data, &self.client_secret_field)?;
            Ok(CredentialPair::new(client_id, client_secret))
        });
        scrub(&mut data);

        credentials
    }
}

fn describe(err: ClientError, mount: &str, path: &str) -> String {
    match err {
        ClientError::APIError { code: 404, .. } => {
            format!("secret '{}/{}' not found", mount, path)
        }
        ClientError::APIError { code: 403, .. } => {
            "permission denied (token invalid, expired or missing a policy)".to_string()
        }
        ClientError::APIError { code, errors } if errors.is_empty() => {
            format!("Vault returned HTTP {}", code)
        }
        ClientError::APIError { code, errors } => {
            format!("Vault returned HTTP {}: {}", code, errors.join("; "))
        }
        other => other.to_string(),
    }
}

/// Extract a string value from the secret's data map.
fn string_field<'a>(data: &'a HashMap<String, serde_json::Value>, field: &str) -> Result<&'a str> {
    match data.get(field) {
        Some(serde_json::Value::String(value)) => Ok(value),
        Some(other) => Err(PillarError::secret_fetch(
            BACKEND,
            format!("field '{}' must be a string, found: {}", field, other),
        )),
        None => Err(PillarError::secret_fetch(
            BACKEND,
            format!("field '{}' not present in secret", field),
        )),
    }
}

/// Zero the secret's string values once the pair has been copied out.
fn scrub(data: &mut HashMap<String, serde_json::Value>) {
    for value in data.values_mut() {
        if let serde_json::Value::String(text) = value {
            text.zeroize();
        }
    }
}
