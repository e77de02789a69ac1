// Pillar Sync Configuration Module
//
// This module handles loading and parsing the configuration from pillar-sync.yaml

use crate::error::{PillarError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "pillar-sync.yaml";

/// Environment variable holding the Vault token when the file has none.
pub const VAULT_TOKEN_ENV: &str = "VAULT_TOKEN";

/// Which secret backend supplies the credential pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    /// HashiCorp Vault KV v2
    Vault,
    /// AWS Systems Manager Parameter Store
    #[serde(alias = "aws")]
    #[value(alias = "aws")]
    AwsParameterStore,
}

impl std::fmt::Display for SecretBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vault => write!(f, "Vault"),
            Self::AwsParameterStore => write!(f, "AWS Parameter Store"),
        }
    }
}

/// Vault configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VaultConfig {
    /// Server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Authentication token; `$VAULT_TOKEN` is used when unset
    #[serde(default)]
    pub token: Option<String>,

    /// Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// KV v2 mount point
    #[serde(default = "default_vault_mount")]
    pub mount: String,

    /// Secret path below the mount
    pub path: String,

    #[serde(default = "default_client_id_field")]
    pub client_id_field: String,

    #[serde(default = "default_client_secret_field")]
    pub client_secret_field: String,

    /// Verify the server's TLS certificate
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

fn default_vault_mount() -> String {
    "secret".to_string()
}

fn default_client_id_field() -> String {
    "clientId".to_string()
}

fn default_client_secret_field() -> String {
    "clientSecret".to_string()
}

fn default_true() -> bool {
    true
}

/// AWS Parameter Store configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParameterStoreConfig {
    /// AWS region (e.g., "us-west-2")
    pub region: String,

    /// Named profile from the shared AWS config
    #[serde(default)]
    pub profile: Option<String>,

    /// Endpoint override (LocalStack, VPC endpoints)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Parameter holding the client id (e.g., "/yourapp/clientId")
    pub client_id_parameter: String,

    /// Parameter holding the client secret (e.g., "/yourapp/clientSecret")
    pub client_secret_parameter: String,
}

/// Secret source selection and per-backend settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SecretsConfig {
    /// Backend used for this run
    pub backend: SecretBackend,

    #[serde(default)]
    pub vault: Option<VaultConfig>,

    #[serde(default)]
    pub aws_parameter_store: Option<ParameterStoreConfig>,
}

/// Encryption engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionEngine {
    /// OpenPGP through the local `gpg` binary
    Gpg,
    /// age X25519 recipients
    Age,
}

/// Encryption configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncryptionConfig {
    #[serde(default = "default_engine")]
    pub engine: EncryptionEngine,

    /// Recipient identity (gpg key id / email, or an age1... public key)
    pub recipient: String,

    /// gpg executable
    #[serde(default = "default_gpg_binary")]
    pub gpg_binary: String,

    /// Alternate GnuPG home directory
    #[serde(default)]
    pub gpg_homedir: Option<String>,

    /// Encrypt to keys that are not marked trusted
    #[serde(default)]
    pub always_trust: bool,
}

fn default_engine() -> EncryptionEngine {
    EncryptionEngine::Gpg
}

fn default_gpg_binary() -> String {
    "gpg".to_string()
}

/// Pillar file configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PillarConfig {
    /// Path to the pillar file (e.g., "/srv/pillar/client_credentials.sls")
    pub path: String,

    /// Renderer line written above the document (e.g., "#!yaml|gpg")
    #[serde(default)]
    pub header: Option<String>,
}

/// Git repository configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RepositoryConfig {
    /// Work tree containing the pillar file
    pub path: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Push after committing
    #[serde(default = "default_true")]
    pub push: bool,

    /// Remote to push to; the branch upstream is used when unset
    #[serde(default)]
    pub remote: Option<String>,
}

fn default_commit_message() -> String {
    "Update client credentials in pillar".to_string()
}

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub secrets: SecretsConfig,
    pub encryption: EncryptionConfig,
    pub pillar: PillarConfig,
    pub repository: RepositoryConfig,
}

/// Settings taken from the command line rather than the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<SecretBackend>,
    pub no_push: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PillarError::config(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            PillarError::Config { message } => PillarError::config(format!(
                "Failed to parse config file {:?}: {}",
                path.as_ref(),
                message
            )),
            other => other,
        })
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| PillarError::config(e.to_string()))
    }

    /// Read the file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_overrides(path, &Overrides::default())
    }

    /// Like [`Config::load`], with command-line overrides applied before
    /// validation so an overridden backend must still be fully configured.
    pub fn load_with_overrides<P: AsRef<Path>>(path: P, overrides: &Overrides) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(backend) = overrides.backend {
            self.secrets.backend = backend;
        }
        if overrides.no_push {
            self.repository.push = false;
        }
    }

    /// Fill values the file left unset from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Some(vault) = self.secrets.vault.as_mut() {
            if vault.token.is_none() {
                vault.token = std::env::var(VAULT_TOKEN_ENV).ok().filter(|t| !t.is_empty());
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.secrets.backend {
            SecretBackend::Vault => {
                let vault = self.secrets.vault.as_ref().ok_or_else(|| {
                    PillarError::config("Backend 'vault' selected but no 'secrets.vault' section")
                })?;
                require("secrets.vault.address", &vault.address)?;
                require("secrets.vault.mount", &vault.mount)?;
                require("secrets.vault.path", &vault.path)?;
                require("secrets.vault.client_id_field", &vault.client_id_field)?;
                require("secrets.vault.client_secret_field", &vault.client_secret_field)?;
            }
            SecretBackend::AwsParameterStore => {
                let aws = self.secrets.aws_parameter_store.as_ref().ok_or_else(|| {
                    PillarError::config(
                        "Backend 'aws_parameter_store' selected but no 'secrets.aws_parameter_store' section",
                    )
                })?;
                require("secrets.aws_parameter_store.region", &aws.region)?;
                require(
                    "secrets.aws_parameter_store.client_id_parameter",
                    &aws.client_id_parameter,
                )?;
                require(
                    "secrets.aws_parameter_store.client_secret_parameter",
                    &aws.client_secret_parameter,
                )?;
            }
        }

        require("encryption.recipient", &self.encryption.recipient)?;
        if self.encryption.engine == EncryptionEngine::Gpg {
            require("encryption.gpg_binary", &self.encryption.gpg_binary)?;
        }

        require("pillar.path", &self.pillar.path)?;
        require("repository.path", &self.repository.path)?;
        require("repository.commit_message", &self.repository.commit_message)?;

        let pillar = self.pillar_path()?;
        let repository = self.repository_path()?;
        if !pillar.starts_with(&repository) {
            return Err(PillarError::config(format!(
                "Pillar file {:?} is not inside repository {:?}",
                pillar, repository
            )));
        }

        Ok(())
    }

    /// Get the absolute path for the pillar file
    pub fn pillar_path(&self) -> Result<PathBuf> {
        expand_path(&self.pillar.path)
    }

    /// Get the absolute path for the repository work tree
    pub fn repository_path(&self) -> Result<PathBuf> {
        expand_path(&self.repository.path)
    }

    /// Copy of the configuration safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(vault) = copy.secrets.vault.as_mut() {
            if vault.token.is_some() {
                vault.token = Some("[REDACTED]".to_string());
            }
        }
        copy
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PillarError::config(format!("'{}' cannot be empty", field)));
    }
    Ok(())
}

/// Resolve `~` and relative paths to an absolute path.
///
/// `.` and `..` components are folded lexically, so the result can be
/// compared with `Path::starts_with`. Symlinks are not followed.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let path = Path::new(raw);
    if path.is_absolute() {
        return Ok(normalize(path));
    }

    if let Some(rest) = raw.strip_prefix('~') {
        let home = dirs::home_dir()
            .ok_or_else(|| PillarError::config("Failed to determine home directory"))?;
        return Ok(normalize(&home.join(rest.trim_start_matches('/'))));
    }

    std::env::current_dir()
        .map(|dir| normalize(&dir.join(path)))
        .map_err(|e| PillarError::config(format!("Failed to get current directory: {}", e)))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // `/..` stays `/`
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
