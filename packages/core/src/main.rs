// Pillar Sync - provision encrypted client credentials into a Salt pillar
//
// This is the main entry point for the application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pillar_sync::config::{
    Config, EncryptionEngine, Overrides, SecretBackend, DEFAULT_CONFIG_FILE,
};
use pillar_sync::encryption::{self, AgeEncryptor};
use pillar_sync::error::PillarError;
use pillar_sync::git::{self, CommitOutcome, GitCommitter};
use pillar_sync::pillar::PillarWriter;
use pillar_sync::{pipeline, secrets};
use tracing_subscriber::EnvFilter;

/// Pillar Sync - provision encrypted client credentials into a Salt pillar
#[derive(Parser, Debug)]
#[command(name = "pillar-sync")]
#[command(version)]
#[command(about = "Provision encrypted client credentials into a Salt pillar", long_about = None)]
struct Cli {
    /// Enable debug diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, encrypt, write and commit the client credentials
    Sync {
        /// Path to the configuration file
        #[arg(short, long, env = "PILLAR_SYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Override the secret backend selected in the configuration
        #[arg(short, long, value_enum)]
        backend: Option<SecretBackend>,

        /// Commit without pushing
        #[arg(long, default_value = "false")]
        no_push: bool,

        /// Dry run - print the encrypted pillar without writing or committing
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Check prerequisites and system configuration
    Doctor {
        /// Path to the configuration file
        #[arg(short, long, env = "PILLAR_SYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
        config: String,
    },

    /// Print the effective configuration with secrets redacted
    ShowConfig {
        /// Path to the configuration file
        #[arg(short, long, env = "PILLAR_SYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
        config: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "pillar_sync=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A subscriber may already be installed (e.g. integration tests); ignore.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

fn run_doctor(config_path: &str) -> Result<()> {
    println!("🔍 Pillar Sync Doctor");
    println!("Checking prerequisites...\n");

    let mut all_checks_passed = true;

    // Check 1: git installation
    print!("1. Checking if 'git' is installed... ");
    if check_binary("git") {
        println!("✓");
    } else {
        println!("✗");
        println!("   ❌ 'git' is not installed or not in PATH");
        all_checks_passed = false;
    }

    // Check 2: configuration
    print!("2. Checking configuration '{}'... ", config_path);
    let config = match Config::load(config_path) {
        Ok(config) => {
            println!("✓");
            Some(config)
        }
        Err(e) => {
            println!("✗");
            println!("   ❌ {}", e);
            println!("   💡 Create a configuration file first");
            all_checks_passed = false;
            None
        }
    };

    let Some(config) = config else {
        for (n, name) in [
            (3, "encryption engine"),
            (4, "repository"),
            (5, "pillar directory"),
            (6, "secret backend credentials"),
        ] {
            println!("{}. Checking {}... ⊘", n, name);
        }
        println!("   ⚠️  Skipped (configuration not loaded)");
        println!();
        println!("❌ Some checks failed. Please fix the issues above.");
        return Err(anyhow::anyhow!("Doctor checks failed"));
    };

    // Check 3: encryption engine
    match config.encryption.engine {
        EncryptionEngine::Gpg => {
            print!("3. Checking if '{}' is installed... ", config.encryption.gpg_binary);
            if check_binary(&config.encryption.gpg_binary) {
                println!("✓");
            } else {
                println!("✗");
                println!(
                    "   ❌ '{}' is not installed or not in PATH",
                    config.encryption.gpg_binary
                );
                println!("   📦 Install GnuPG: https://gnupg.org/download/");
                all_checks_passed = false;
            }
        }
        EncryptionEngine::Age => {
            print!("3. Checking age recipient... ");
            match AgeEncryptor::new(&config.encryption.recipient) {
                Ok(_) => println!("✓"),
                Err(e) => {
                    println!("✗");
                    println!("   ❌ {}", e);
                    all_checks_passed = false;
                }
            }
        }
    }

    // Check 4: repository work tree
    let repository = config.repository_path()?;
    print!("4. Checking repository {}... ", repository.display());
    if git::is_work_tree(&repository) {
        println!("✓");
    } else {
        println!("✗");
        println!("   ❌ Not a git work tree: {}", repository.display());
        all_checks_passed = false;
    }

    // Check 5: pillar directory
    let pillar = config.pillar_path()?;
    print!("5. Checking pillar directory... ");
    match pillar.parent() {
        Some(parent) if parent.is_dir() => println!("✓"),
        _ => {
            println!("✗");
            println!("   ❌ Directory for {} does not exist", pillar.display());
            all_checks_passed = false;
        }
    }

    // Check 6: secret backend credentials
    print!("6. Checking {} credentials... ", config.secrets.backend);
    match config.secrets.backend {
        SecretBackend::Vault => {
            let has_token = config
                .secrets
                .vault
                .as_ref()
                .map(|v| v.token.is_some())
                .unwrap_or(false);
            if has_token {
                println!("✓");
            } else {
                println!("✗");
                println!("   ❌ No Vault token configured");
                println!("   💡 Set it with: export VAULT_TOKEN=<token>");
                all_checks_passed = false;
            }
        }
        SecretBackend::AwsParameterStore => {
            println!("⊘");
            println!("   ⚠️  Resolved by the AWS credential chain at runtime");
        }
    }

    println!();
    if all_checks_passed {
        println!("✅ All checks passed! Your system is ready.");
        Ok(())
    } else {
        println!("❌ Some checks failed. Please fix the issues above.");
        Err(anyhow::anyhow!("Doctor checks failed"))
    }
}

fn run_show_config(config_path: &str) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from: {}", config_path))?;

    let rendered = serde_yaml::to_string(&config.redacted())
        .context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

fn run_sync(
    config_path: &str,
    backend: Option<SecretBackend>,
    no_push: bool,
    dry_run: bool,
) -> Result<()> {
    println!("🔐 Pillar Sync");
    println!("Loading configuration from: {}\n", config_path);

    // Step 1: Load and validate configuration
    let config = Config::load_with_overrides(config_path, &Overrides { backend, no_push })
        .with_context(|| format!("Failed to load config from: {}", config_path))?;

    println!("✓ Configuration loaded and validated");
    println!("  Backend: {}", config.secrets.backend);

    // Step 2: Build the collaborators
    let encryptor = encryption::from_config(&config.encryption)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    // Step 3: Run the pipeline
    if dry_run {
        let document = runtime.block_on(async {
            let source = secrets::connect(&config.secrets).await?;
            pipeline::encrypt_credentials(source.as_ref(), encryptor.as_ref()).await
        })?;

        println!("\n🏃 Dry run mode - pillar not written, nothing committed\n");
        print!("{}", document.render(config.pillar.header.as_deref())?);
        return Ok(());
    }

    let writer = PillarWriter::from_config(&config)?;
    let committer = GitCommitter::from_config(&config)?;

    let report = runtime.block_on(async {
        let source = secrets::connect(&config.secrets).await?;
        pipeline::provision(source.as_ref(), encryptor.as_ref(), &writer, &committer).await
    })?;

    println!();
    match report.outcome {
        CommitOutcome::Committed { pushed: true } => {
            println!("✅ Successfully updated Salt pillar and committed to git.")
        }
        CommitOutcome::Committed { pushed: false } => {
            println!("✅ Successfully updated Salt pillar and committed to git (not pushed).")
        }
        CommitOutcome::Unchanged => {
            println!("✅ Salt pillar already up to date: {}", report.pillar_path.display())
        }
    }

    Ok(())
}

/// Exit code for a failed run, taken from the stage that failed.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<PillarError>()
        .map(PillarError::exit_code)
        .unwrap_or(1)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Sync {
            config,
            backend,
            no_push,
            dry_run,
        } => {
            if let Err(e) = run_sync(&config, backend, no_push, dry_run) {
                eprintln!("\nError: {:#}", e);
                if matches!(e.downcast_ref::<PillarError>(), Some(PillarError::Commit { .. })) {
                    eprintln!("\n⚠️  The pillar file was written but may not be committed.");
                }
                eprintln!("💡 Run 'pillar-sync doctor' to check your configuration.");
                std::process::exit(exit_code(&e));
            }
        }
        Commands::Doctor { config } => {
            if let Err(e) = run_doctor(&config) {
                eprintln!("\nError: {}", e);
                std::process::exit(1);
            }
        }
        Commands::ShowConfig { config } => {
            if let Err(e) = run_show_config(&config) {
                eprintln!("\nError: {:#}", e);
                std::process::exit(exit_code(&e));
            }
        }
    }
}
