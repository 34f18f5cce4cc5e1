use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use dcn_gateway::config::GatewayConfig;
use dcn_registrar::{Registrar, Registry};

/// HTTP gateway serving a deployed `.dcn` registry database.
#[derive(Debug, Parser)]
#[command(name = "dcn-gateway", version, about)]
struct Args {
    /// TOML config file; the flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Socket to listen on.
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Registry database path.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(db) = args.db {
        config.db = db;
    }

    let registry = Registry::open(&config.db)
        .with_context(|| format!("open registry database {}", config.db.display()))?;
    dcn_gateway::serve(Registrar::new(registry), config.listen).await
}
