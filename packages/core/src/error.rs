//! Error types for the provisioning pipeline.
//!
//! Every stage fails with its own variant so the binary can report which
//! step aborted the run and exit with a stage-specific code.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PillarError>;

/// Errors that can abort a provisioning run.
#[derive(Error, Debug)]
pub enum PillarError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The secret backend could not produce the credential pair.
    #[error("Failed to fetch secrets from {backend}: {message}")]
    SecretFetch { backend: String, message: String },

    /// The encryption backend rejected the plaintext or recipient.
    #[error("Encryption failed: {status}")]
    Encryption { status: String },

    /// The pillar file could not be written.
    #[error("Failed to write pillar file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A git invocation failed.
    #[error("git {command} failed: {message}")]
    Commit { command: String, message: String },
}

impl PillarError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn secret_fetch(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SecretFetch { backend: backend.into(), message: message.into() }
    }

    pub fn encryption(status: impl Into<String>) -> Self {
        Self::Encryption { status: status.into() }
    }

    pub fn commit(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Commit { command: command.into(), message: message.into() }
    }

    /// Process exit code for this failure.
    ///
    /// | Stage         | Code |
    /// |---------------|------|
    /// | configuration | 1    |
    /// | secret fetch  | 2    |
    /// | encryption    | 3    |
    /// | pillar write  | 4    |
    /// | git           | 5    |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::SecretFetch { .. } => 2,
            Self::Encryption { .. } => 3,
            Self::Write { .. } => 4,
            Self::Commit { .. } => 5,
        }
    }
}
