//! oc-client prints the `oc cabbages` listing as JSON.
//!
//! Credentials come from `--username`/`--password`, then from the credentials
//! file (`--credentials-file`, the config file, or `~/.ocrc`).

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use oc_client::{Client, ClientConfig};
use tracing_subscriber::EnvFilter;

/// oc-client: run `oc cabbages` with credentials and print its JSON output.
#[derive(Parser)]
#[command(
    name = "oc-client",
    version,
    about = "oc-client: run `oc cabbages` with credentials and print its JSON output"
)]
struct Cli {
    /// Path to config file [default: ./oc-client.toml or ~/.config/oc-client/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Username passed to `oc` (requires --password)
    #[arg(long, requires = "password")]
    username: Option<String>,
    /// Password passed to `oc` (requires --username)
    #[arg(long, requires = "username")]
    password: Option<String>,
    /// Shell script exporting OC2RTA_USERNAME and OC2RTA_PASSWORD [default: ~/.ocrc]
    #[arg(long)]
    credentials_file: Option<PathBuf>,
    /// Kill `oc` if it runs longer than this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity); stdout carries the JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = apply_overrides(load_config(cli.config.as_deref()).await?, &cli);
    let client = Client::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build client: {}", e))?;

    let value = client
        .cabbages()
        .await
        .map_err(|e| anyhow::anyhow!("oc cabbages failed: {}", e))?;

    let rendered = if cli.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{rendered}");

    Ok(())
}

/// Load config: explicit flag → ./oc-client.toml → ~/.config/oc-client/config.toml → defaults.
///
/// The built-in defaults read credentials from `~/.ocrc`.
async fn load_config(explicit: Option<&Path>) -> Result<ClientConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            ClientConfig::load(&path)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))
        }
        None => {
            let mut config = ClientConfig::default();
            config.credentials_file = oc_client::default_credentials_path();
            Ok(config)
        }
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = Path::new("oc-client.toml");
    if local.exists() {
        return Some(local.to_path_buf());
    }

    dirs::config_dir()
        .map(|dir| dir.join("oc-client").join("config.toml"))
        .filter(|path| path.exists())
}

/// Command-line flags take precedence over config values.
fn apply_overrides(mut config: ClientConfig, cli: &Cli) -> ClientConfig {
    if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
        config = config.with_credentials(username, password);
    }
    if let Some(path) = &cli.credentials_file {
        config = config.with_credentials_file(path);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout_secs(secs);
    }
    config
}
