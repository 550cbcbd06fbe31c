/*
mundus - main.rs
This binary loads the configuration, connects the backend gateway and the settings store,
and runs the interactive editor shell.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::{Config, CountryCode, MemorySettingsStore, SettingsStore, SqliteSettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use mundus::gateway::remote::RemoteGateway;
use mundus::gateway::ContentGateway;
use mundus::session::EditorSession;
use mundus::shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "mundus", about = "Mundus editor: browse news, select articles and compose writeups")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Keep settings in memory only (nothing is written to disk)
    #[arg(long)]
    ephemeral: bool,

    /// Source country to start with (SWE, DEN, FIN, POL)
    #[arg(long)]
    country: Option<CountryCode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging on stderr so it does not interleave with shell output
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    // Load configuration with defaults
    let mut config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    if let Some(country) = args.country {
        config.editor.default_country = country;
    }
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // Backend gateway
    let gateway: Arc<dyn ContentGateway> = Arc::new(
        RemoteGateway::new(&config.gateway).context("Failed to initialize backend gateway")?,
    );
    info!(base_url = %config.gateway.base_url, "backend gateway ready");

    // Settings store
    let settings: Arc<dyn SettingsStore> = if args.ephemeral {
        info!("ephemeral mode: settings kept in memory");
        Arc::new(MemorySettingsStore::new())
    } else {
        let path = &config.storage.settings_path;
        match SqliteSettingsStore::open(path).await {
            Ok(store) => {
                info!(settings_path = %path, "settings store opened");
                Arc::new(store)
            }
            Err(e) => {
                error!(%e, settings_path = %path, "failed to open settings store");
                return Err(e);
            }
        }
    };

    let session = EditorSession::new(gateway, settings, &config.editor).await;
    let mut shell = Shell::new(session, config.editor.render_width);
    shell.run().await.context("editor shell failed")?;

    info!("mundus editor exiting");
    Ok(())
}
