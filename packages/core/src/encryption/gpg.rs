//! GnuPG encryption through the local `gpg` binary.
//!
//! # Keyring
//!
//! The recipient's public key must already be present (and, unless
//! `always_trust` is set, trusted) in the keyring. This module never imports
//! or generates keys.
//!
//! # Plaintext handling
//!
//! The value is written to gpg's stdin and the armored ciphertext read from
//! stdout. No temporary files are created.

use super::Encryptor;
use crate::config::EncryptionConfig;
use crate::error::{PillarError, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Status keywords gpg emits on `--status-fd` and the message reported for each.
const STATUS_MESSAGES: &[(&str, &str)] = &[
    ("INV_RECP", "invalid recipient"),
    ("NO_RECP", "no valid recipients"),
    ("KEYEXPIRED", "key expired"),
    ("KEYREVOKED", "key revoked"),
    ("NO_PUBKEY", "public key not found"),
    ("FAILURE", "encryption failed"),
];

/// Encrypts values with `gpg --encrypt --armor`.
pub struct GpgEncryptor {
    binary: String,
    recipient: String,
    homedir: Option<String>,
    always_trust: bool,
}

impl GpgEncryptor {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            binary: "gpg".to_string(),
            recipient: recipient.into(),
            homedir: None,
            always_trust: false,
        }
    }

    pub fn from_config(config: &EncryptionConfig) -> Self {
        Self {
            binary: config.gpg_binary.clone(),
            recipient: config.recipient.clone(),
            homedir: config.gpg_homedir.clone(),
            always_trust: config.always_trust,
        }
    }

    /// Use an alternate GnuPG home directory.
    pub fn with_homedir(mut self, homedir: impl Into<String>) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    pub fn with_always_trust(mut self, always_trust: bool) -> Self {
        self.always_trust = always_trust;
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);

        if let Some(homedir) = &self.homedir {
            command.arg("--homedir").arg(homedir);
        }

        command
            .args(["--batch", "--yes", "--no-tty", "--status-fd", "2"])
            .args(["--armor", "--encrypt", "--recipient"])
            .arg(&self.recipient);

        if self.always_trust {
            command.args(["--trust-model", "always"]);
        }

        command
    }
}

impl Encryptor for GpgEncryptor {
    fn name(&self) -> &str {
        "gpg"
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        tracing::debug!(recipient = %self.recipient, "Encrypting value with gpg");

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PillarError::encryption(format!(
                    "'{}' is not installed or not in PATH: {}",
                    self.binary, e
                ))
            })?;

        // gpg may exit before reading stdin (unknown recipient), so a write
        // error is only reported if the process itself succeeded.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(plaintext.as_bytes()),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| PillarError::encryption(format!("Failed to wait for gpg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PillarError::encryption(status_from_stderr(&stderr)));
        }

        written
            .map_err(|e| PillarError::encryption(format!("Failed to write to gpg stdin: {}", e)))?;

        let armored = String::from_utf8(output.stdout)
            .map_err(|_| PillarError::encryption("gpg output is not ASCII-armored"))?;

        if armored.trim().is_empty() {
            return Err(PillarError::encryption("gpg produced no output"));
        }

        Ok(armored)
    }
}

/// Reduce gpg's stderr to a short status string.
///
/// Known `[GNUPG:]` status keywords win over free-form diagnostics; when none
/// is present the non-status stderr lines are returned as-is.
fn status_from_stderr(stderr: &str) -> String {
    let keywords: Vec<&str> = stderr
        .lines()
        .filter_map(|line| line.strip_prefix("[GNUPG:] "))
        .filter_map(|rest| rest.split_whitespace().next())
        .collect();

    for (keyword, message) in STATUS_MESSAGES {
        if keywords.contains(keyword) {
            return (*message).to_string();
        }
    }

    let diagnostics: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.starts_with("[GNUPG:]") && !line.trim().is_empty())
        .collect();

    if diagnostics.is_empty() {
        "Unknown error".to_string()
    } else {
        diagnostics.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_invalid_recipient() {
        let stderr = "gpg: nobody@example.com: skipped: No public key\n\
                      [GNUPG:] INV_RECP 0 nobody@example.com\n\
                      [GNUPG:] FAILURE encrypt 53\n\
                      gpg: [stdin]: encryption failed: No public key\n";

        assert_eq!(status_from_stderr(stderr), "invalid recipient");
    }

    #[test]
    fn test_status_key_expired() {
        let stderr = "[GNUPG:] KEYEXPIRED 1600000000\n[GNUPG:] INV_RECP 5 saltmaster@example.com\n";

        // INV_RECP is listed first and is the more specific outcome for encryption
        assert_eq!(status_from_stderr(stderr), "invalid recipient");
        assert_eq!(status_from_stderr("[GNUPG:] KEYEXPIRED 1600000000\n"), "key expired");
    }

    #[test]
    fn test_status_falls_back_to_diagnostics() {
        let stderr = "gpg: keybox '/tmp/x/pubring.kbx' created\ngpg: fatal: can't open homedir\n";
        assert_eq!(
            status_from_stderr(stderr),
            "gpg: keybox '/tmp/x/pubring.kbx' created\ngpg: fatal: can't open homedir"
        );
    }

    #[test]
    fn test_status_empty() {
        assert_eq!(status_from_stderr(""), "Unknown error");
    }

    #[test]
    fn test_missing_binary_is_encryption_error() {
        let mut encryptor = GpgEncryptor::new("saltmaster@example.com");
        encryptor.binary = "nonexistent_gpg_command_xyz".to_string();

        let err = encryptor.encrypt("abc123").unwrap_err();
        assert!(matches!(err, PillarError::Encryption { .. }));
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn test_command_arguments() {
        let encryptor = GpgEncryptor::new("saltmaster@example.com")
            .with_homedir("/etc/salt/gpgkeys")
            .with_always_trust(true);

        let command = encryptor.command();
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(&args[..2], ["--homedir", "/etc/salt/gpgkeys"]);
        assert!(args.contains(&"--armor".to_string()));
        assert!(args.contains(&"--encrypt".to_string()));
        assert!(args.windows(2).any(|w| w == ["--recipient", "saltmaster@example.com"]));
        assert!(args.windows(2).any(|w| w == ["--trust-model", "always"]));
    }
}
