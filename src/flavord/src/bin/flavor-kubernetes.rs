//! flavor-kubernetes: Kubernetes flavor plugin daemon.

use anyhow::Context;
use clap::Parser;
use flavord::{daemon, discovery};
use kube_flavor::{FlavorPlugin, KubernetesFlavor, PluginConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "flavor-kubernetes",
    version,
    about = "Kubernetes flavor plugin: init/tag merging and cluster certificate provisioning"
)]
struct Args {
    /// Plugin name; also the socket file name in the plugins directory.
    #[arg(long, default_value = "flavor-kubernetes")]
    name: String,

    /// Directory holding the cluster CA and issued bundles (default: current dir).
    #[arg(long = "ssl-dir")]
    ssl_dir: Option<PathBuf>,

    /// Log level, 0 (panic) to 5 (debug). RUST_LOG takes precedence.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..=5))]
    log: u8,

    /// TOML plugin config; --ssl-dir overrides its ssl_dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit socket path (default: $INFRAKIT_PLUGINS_DIR/<name>).
    #[arg(short = 's', long)]
    socket: Option<PathBuf>,
}

fn log_filter(level: u8) -> &'static str {
    match level {
        0 => "off",
        1 | 2 => "error",
        3 => "warn",
        4 => "info",
        _ => "debug",
    }
}

fn load_config(args: &Args) -> anyhow::Result<PluginConfig> {
    let mut config = match &args.config {
        Some(path) => PluginConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PluginConfig::new(std::env::current_dir().context("resolving current dir")?),
    };
    if let Some(ssl_dir) = &args.ssl_dir {
        config.ssl_dir = ssl_dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter(args.log)));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = load_config(&args)?;
    let socket_path = args
        .socket
        .clone()
        .unwrap_or_else(|| discovery::socket_path(&args.name));

    info!("{} starting", args.name);
    info!("SSL directory: {}", config.ssl_dir.display());
    info!("Socket: {}", socket_path.display());

    if let Err(e) = config.check_ssl_dir() {
        // Prepare reports this per call; the daemon still serves Validate.
        tracing::warn!("{}", e);
    }

    let plugin: Arc<dyn FlavorPlugin> = Arc::new(KubernetesFlavor::new(config)?);

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating socket dir {}", parent.display()))?;
    }

    let result = tokio::select! {
        r = daemon::run_daemon_server(&socket_path, plugin) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    if let Err(e) = std::fs::remove_file(&socket_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove socket {}: {}", socket_path.display(), e);
        }
    }

    result
}
