//! Gateway settings: a small TOML file, overridable by command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Socket the HTTP server binds.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Registry database file, as produced by `dcn-cli deploy`.
    #[serde(default = "default_db")]
    pub db: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            listen: default_listen(),
            db: default_db(),
        }
    }
}

impl GatewayConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(config)
    }
}

fn default_listen() -> SocketAddr {
    ([127, 0, 0, 1], 8080).into()
}

fn default_db() -> PathBuf {
    PathBuf::from("dcn.redb")
}
