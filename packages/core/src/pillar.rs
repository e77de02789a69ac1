//! Salt pillar document holding the encrypted credentials.
//!
//! The file is rewritten in full on every run. There is no merge with the
//! previous contents, no backup and no atomic rename.

use crate::config::Config;
use crate::error::{PillarError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level pillar document.
///
/// ```yaml
/// client_credentials:
///   clientId: <ciphertext>
///   clientSecret: <ciphertext>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PillarDocument {
    pub client_credentials: EncryptedCredentials,
}

/// The two ciphertexts, keyed the way consuming states expect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptedCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl PillarDocument {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_credentials: EncryptedCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            },
        }
    }

    /// Serialize to YAML, optionally preceded by a renderer line.
    pub fn render(&self, header: Option<&str>) -> Result<String> {
        let body = serde_yaml::to_string(self).map_err(|e| PillarError::Write {
            path: "<render>".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        Ok(match header {
            Some(header) => format!("{}\n{}", header.trim_end(), body),
            None => body,
        })
    }

    /// Parse a rendered pillar back into a document.
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// Writes the pillar document to its configured location.
#[derive(Debug, Clone)]
pub struct PillarWriter {
    path: PathBuf,
    header: Option<String>,
}

impl PillarWriter {
    pub fn new(path: impl Into<PathBuf>, header: Option<String>) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.pillar_path()?, config.pillar.header.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Overwrite the pillar file with `document`.
    ///
    /// The parent directory must already exist.
    pub fn write(&self, document: &PillarDocument) -> Result<()> {
        let content = document.render(self.header())?;

        fs::write(&self.path, content).map_err(|source| PillarError::Write {
            path: self.path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), "Pillar file written");
        Ok(())
    }
}
