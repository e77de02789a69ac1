//! Git integration using the `git` CLI.
//!
//! Every invocation runs with an explicit working directory; the process-wide
//! current directory is never changed.
//!
//! # Git Commands Used
//!
//! - `git add -- <pillar>` - Stage the pillar file
//! - `git diff --cached --quiet -- <pillar>` - Detect an unchanged pillar
//! - `git commit -m <message> -- <pillar>` - Commit only the pillar file
//! - `git push [<remote> HEAD]` - Publish to the remote

use crate::config::Config;
use crate::error::{PillarError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// What the committer did with the pillar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was created.
    Committed { pushed: bool },
    /// The staged pillar matched `HEAD`; nothing was committed or pushed.
    Unchanged,
}

/// Records a written pillar file in version control.
pub trait Committer {
    fn commit(&self, pillar_path: &Path) -> Result<CommitOutcome>;
}

/// Commits through the `git` binary in a fixed work tree.
#[derive(Debug, Clone)]
pub struct GitCommitter {
    repository: PathBuf,
    message: String,
    push: bool,
    remote: Option<String>,
}

impl GitCommitter {
    pub fn new(repository: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            message: message.into(),
            push: true,
            remote: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            repository: config.repository_path()?,
            message: config.repository.commit_message.clone(),
            push: config.repository.push,
            remote: config.repository.remote.clone(),
        })
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Run git in the repository and capture its output.
    fn git<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = args
            .first()
            .map(|a| a.as_ref().to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::debug!(command = %command, repository = %self.repository.display(), "Running git");

        Command::new("git")
            .args(&args)
            .current_dir(&self.repository)
            .output()
            .map_err(|e| {
                PillarError::commit(
                    command,
                    format!("failed to execute git (is it installed and in PATH?): {}", e),
                )
            })
    }

    /// Run git and fail unless it exits 0.
    fn git_checked<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = args
            .first()
            .map(|a| a.as_ref().to_string_lossy().to_string())
            .unwrap_or_default();

        let output = self.git(&args)?;
        if !output.status.success() {
            return Err(PillarError::commit(command, failure_message(&output)));
        }
        Ok(output)
    }

    fn stage(&self, pillar_path: &Path) -> Result<()> {
        self.git_checked([OsStr::new("add"), OsStr::new("--"), pillar_path.as_os_str()])?;
        Ok(())
    }

    /// True when the staged pillar differs from `HEAD`.
    fn has_staged_changes(&self, pillar_path: &Path) -> Result<bool> {
        let output = self.git([
            OsStr::new("diff"),
            OsStr::new("--cached"),
            OsStr::new("--quiet"),
            OsStr::new("--"),
            pillar_path.as_os_str(),
        ])?;

        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(PillarError::commit("diff", failure_message(&output))),
        }
    }

    fn commit_staged(&self, pillar_path: &Path) -> Result<()> {
        self.git_checked([
            OsStr::new("commit"),
            OsStr::new("-m"),
            OsStr::new(&self.message),
            OsStr::new("--"),
            pillar_path.as_os_str(),
        ])?;
        Ok(())
    }

    fn push_head(&self) -> Result<()> {
        match &self.remote {
            Some(remote) => self.git_checked(["push", remote.as_str(), "HEAD"])?,
            None => self.git_checked(["push"])?,
        };
        Ok(())
    }
}

impl Committer for GitCommitter {
    fn commit(&self, pillar_path: &Path) -> Result<CommitOutcome> {
        self.stage(pillar_path)?;

        if !self.has_staged_changes(pillar_path)? {
            tracing::info!(path = %pillar_path.display(), "Pillar unchanged, skipping commit");
            return Ok(CommitOutcome::Unchanged);
        }

        self.commit_staged(pillar_path)?;

        if self.push {
            self.push_head()?;
        }

        Ok(CommitOutcome::Committed { pushed: self.push })
    }
}

/// Check whether `path` is inside a git work tree.
pub fn is_work_tree(path: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(path)
        .output()
        .map(|output| {
            output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true"
        })
        .unwrap_or(false)
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else if !stdout.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        match output.status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}
