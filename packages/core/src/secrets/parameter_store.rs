//! AWS Systems Manager Parameter Store source for the credential pair.
//!
//! Uses the official AWS SDK. Credentials are resolved through the standard
//! provider chain (environment, shared profile, instance role); only the region
//! and optional profile/endpoint come from configuration.

use super::{CredentialPair, SecretSource};
use crate::config::ParameterStoreConfig;
use crate::error::{PillarError, Result};
use async_trait::async_trait;
use aws_sdk_ssm::config::{BehaviorVersion, Region};
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::Client;

const BACKEND: &str = "AWS Parameter Store";

/// Credential source reading two SecureString parameters.
pub struct ParameterStoreSource {
    client: Client,
    client_id_parameter: String,
    client_secret_parameter: String,
}

impl ParameterStoreSource {
    /// Load the SDK configuration for the configured region and build a client.
    pub async fn connect(config: &ParameterStoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        tracing::debug!(region = %config.region, "Loaded AWS SDK configuration");

        Self::with_client(
            Client::new(&sdk_config),
            &config.client_id_parameter,
            &config.client_secret_parameter,
        )
    }

    /// Wrap an already configured SSM client.
    pub fn with_client(
        client: Client,
        client_id_parameter: impl Into<String>,
        client_secret_parameter: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id_parameter: client_id_parameter.into(),
            client_secret_parameter: client_secret_parameter.into(),
        }
    }

    async fn get_parameter(&self, name: &str) -> Result<String> {
        tracing::debug!(parameter = %name, "GetParameter");

        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_parameter_not_found())
                    .unwrap_or(false);
                if not_found {
                    PillarError::secret_fetch(BACKEND, format!("parameter '{}' not found", name))
                } else {
                    PillarError::secret_fetch(
                        BACKEND,
                        format!("GetParameter '{}' failed: {}", name, DisplayErrorContext(&e)),
                    )
                }
            })?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| {
                PillarError::secret_fetch(BACKEND, format!("parameter '{}' has no value", name))
            })
    }
}

#[async_trait]
impl SecretSource for ParameterStoreSource {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn fetch(&self) -> Result<CredentialPair> {
        let client_id = self.get_parameter(&self.client_id_parameter).await?;
        let client_secret = self.get_parameter(&self.client_secret_parameter).await?;

        Ok(CredentialPair::new(client_id, client_secret))
    }
}
