//! The provisioning run: fetch → encrypt → write → commit.
//!
//! Stages run strictly in order and the first failure ends the run, so a
//! failed fetch or encryption never touches the pillar file and a failed write
//! never reaches git.

use crate::encryption::Encryptor;
use crate::error::Result;
use crate::git::{CommitOutcome, Committer};
use crate::pillar::{PillarDocument, PillarWriter};
use crate::secrets::SecretSource;
use std::path::PathBuf;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub pillar_path: PathBuf,
    pub outcome: CommitOutcome,
}

/// Fetch the credential pair and encrypt both values.
///
/// The plaintext pair is dropped (and zeroed) before this returns.
pub async fn encrypt_credentials(
    source: &dyn SecretSource,
    encryptor: &dyn Encryptor,
) -> Result<PillarDocument> {
    println!("📖 Fetching client credentials from {}...", source.name());
    let credentials = source.fetch().await?;
    println!("✓ Fetched client credentials");

    println!("🔒 Encrypting credentials with {}...", encryptor.name());
    let client_id = encryptor.encrypt(credentials.client_id())?;
    let client_secret = encryptor.encrypt(credentials.client_secret())?;
    println!("✓ Encrypted 2 value(s)");

    Ok(PillarDocument::new(client_id, client_secret))
}

/// Run all four stages.
pub async fn provision(
    source: &dyn SecretSource,
    encryptor: &dyn Encryptor,
    writer: &PillarWriter,
    committer: &dyn Committer,
) -> Result<ProvisionReport> {
    let document = encrypt_credentials(source, encryptor).await?;

    println!("📝 Writing pillar: {}", writer.path().display());
    writer.write(&document)?;
    println!("✓ Pillar written");

    println!("🎯 Committing pillar to git...");
    let outcome = committer.commit(writer.path())?;
    match outcome {
        CommitOutcome::Committed { pushed: true } => println!("✓ Committed and pushed"),
        CommitOutcome::Committed { pushed: false } => println!("✓ Committed (push disabled)"),
        CommitOutcome::Unchanged => println!("ℹ️  Pillar unchanged, nothing to commit"),
    }

    Ok(ProvisionReport {
        pillar_path: writer.path().to_path_buf(),
        outcome,
    })
}
