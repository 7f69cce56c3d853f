//! FileGate Daemon
//!
//! Serves a confined directory over an authenticated HTTP API.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use daemon::auth::CredentialStore;
use daemon::config::{default_config_path, Config};
use daemon::server::{shutdown_signal, Server};

/// FileGate - browse, upload and download files under one directory.
#[derive(Parser, Debug)]
#[command(name = "filegate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to `start`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Start,

    /// Write a configuration file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Replace the stored username and password
    SetCredentials {
        /// New username
        username: String,

        /// New password (at least 6 characters)
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command.clone().unwrap_or(Commands::Start) {
        Commands::Start => run_server(&cli, &config_path).await,
        Commands::InitConfig { force } => init_config(&config_path, force),
        Commands::SetCredentials { username, password } => {
            let config = load_config(&config_path)?;
            let store = CredentialStore::open(
                &config.auth.credentials_file,
                &config.auth.default_username,
                &config.auth.default_password,
                config.auth.bcrypt_cost,
            )?;
            store.set_credentials(&username, &password)?;
            println!(
                "Credentials for '{}' saved to {}",
                username,
                store.path().display()
            );
            Ok(())
        }
    }
}

/// Load the configuration file, apply environment overrides and validate.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

async fn run_server(cli: &Cli, config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    // Held until exit so buffered file logs are flushed.
    let _log_guard = daemon::logging::init(&config.log, cli.verbose)?;

    tracing::info!("FileGate {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using config file: {:?}", config_path);
    if config.session.uses_default_secret() {
        tracing::warn!("Session cookies are signed with the default secret");
    }

    let server = Server::new(&config)?;
    server.run(shutdown_signal()).await
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
