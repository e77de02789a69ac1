//! Common testing utilities for Pillar Sync integration tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test context that manages temporary files and directories.
pub struct TestContext {
    /// Path to temporary directory
    pub temp_path: PathBuf,
    /// The temporary directory (kept to prevent early deletion)
    _temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context with a temporary directory.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path().to_path_buf();

        Ok(Self {
            temp_path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a test file with content.
    pub fn create_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let file_path = self.temp_path.join(name);
        let mut file = fs::File::create(&file_path)?;
        file.write_all(content.as_bytes())?;
        Ok(file_path)
    }

    /// Get the path to a file in the temp directory.
    #[allow(dead_code)]
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_path.join(name)
    }

    /// Create a pillar work tree with one commit, tracking a bare `origin`.
    ///
    /// Returns the work tree path.
    #[allow(dead_code)]
    pub fn init_repository(&self) -> PathBuf {
        let origin = self.temp_path.join("origin.git");
        let work = self.temp_path.join("pillar");

        git(&self.temp_path, &["init", "--bare", origin.to_str().unwrap()]);
        git(&self.temp_path, &["init", work.to_str().unwrap()]);
        git(&work, &["config", "user.email", "saltmaster@example.com"]);
        git(&work, &["config", "user.name", "Salt Master"]);
        git(&work, &["config", "commit.gpgsign", "false"]);

        fs::write(work.join("top.sls"), "base:\n  '*':\n    - client_credentials\n").unwrap();
        git(&work, &["add", "top.sls"]);
        git(&work, &["commit", "-m", "Initial commit"]);
        git(&work, &["remote", "add", "origin", origin.to_str().unwrap()]);
        git(&work, &["push", "-u", "origin", "HEAD"]);

        work
    }

    /// Write a pillar-sync.yaml reading from Vault and encrypting with age.
    #[allow(dead_code)]
    pub fn write_vault_age_config(
        &self,
        vault_address: &str,
        recipient: &str,
        repository: &Path,
    ) -> anyhow::Result<PathBuf> {
        let content = format!(
            r#"secrets:
  backend: vault
  vault:
    address: {address}
    token: {token}
    path: client_credentials
encryption:
  engine: age
  recipient: {recipient}
pillar:
  path: {repository}/client_credentials.sls
repository:
  path: {repository}
"#,
            address = vault_address,
            token = VAULT_TEST_TOKEN,
            recipient = recipient,
            repository = repository.display(),
        );

        self.create_file("pillar-sync.yaml", &content)
    }
}

/// Token the mocked Vault accepts.
#[allow(dead_code)]
pub const VAULT_TEST_TOKEN: &str = "s.testtoken";

/// Run git in `dir`, panicking with its stderr on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> Output {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");

    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

/// Trimmed stdout of a git command.
#[allow(dead_code)]
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    String::from_utf8_lossy(&git(dir, args).stdout).trim().to_string()
}

/// Whether the git binary is available for tests that need a real repository.
#[allow(dead_code)]
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Mock a KV v2 read at `/v1/<mount>/data/<secret_path>`.
#[allow(dead_code)]
pub async fn mock_vault_secret(
    server: &MockServer,
    mount: &str,
    secret_path: &str,
    data: serde_json::Value,
) {
    let body = serde_json::json!({
        "request_id": "6f8a1b2c-0000-4000-8000-000000000001",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": {
            "data": data,
            "metadata": {
                "created_time": "2024-01-01T00:00:00.000000Z",
                "custom_metadata": {},
                "deletion_time": "",
                "destroyed": false,
                "version": 3
            }
        },
        "wrap_info": null,
        "warnings": null,
        "auth": null
    });

    Mock::given(method("GET"))
        .and(path(format!("/v1/{}/data/{}", mount, secret_path)))
        .and(header("X-Vault-Token", VAULT_TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mock a Vault error response for any request to `/v1/<mount>/data/<secret_path>`.
#[allow(dead_code)]
pub async fn mock_vault_error(server: &MockServer, mount: &str, secret_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/{}/data/{}", mount, secret_path)))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(serde_json::json!({ "errors": [] })),
        )
        .mount(server)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_context_create_file() {
        let ctx = TestContext::new().unwrap();
        let file_path = ctx.create_file("test.txt", "Hello, World!").unwrap();

        assert!(file_path.exists());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "Hello, World!");
    }
}
