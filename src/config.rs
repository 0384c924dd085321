use anyhow::{Context, Result};
use grove_catalog::{catalog_from_file, Catalog};
use grove_server::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

pub const DEFAULT_SERVER_CONFIG_PATH: &str = "config/server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding one save file per player.
    pub data_dir: PathBuf,
    /// Catalog JSON; the compiled-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    pub payment_timeout_ms: u64,
    pub persist_attempts: u32,
    pub persist_backoff_ms: u64,
    /// JSONL log of every scripted command and its outcome.
    pub event_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            data_dir: PathBuf::from("saves"),
            catalog_path: None,
            payment_timeout_ms: service.payment_timeout.as_millis() as u64,
            persist_attempts: service.persist_attempts,
            persist_backoff_ms: service.persist_backoff.as_millis() as u64,
            event_log: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    ServerConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound
                    || path != Path::new(DEFAULT_SERVER_CONFIG_PATH)
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    info!(
                        "Server config not found at {}. Using defaults",
                        path.display()
                    );
                }
                ServerConfig::default()
            }
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            payment_timeout: Duration::from_millis(self.payment_timeout_ms.max(1)),
            persist_attempts: self.persist_attempts.max(1),
            persist_backoff: Duration::from_millis(self.persist_backoff_ms),
        }
    }
}

/// Catalog from `path`, or the compiled-in one when `path` is unset or
/// cannot be loaded.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    if let Some(path) = path {
        match catalog_from_file(path) {
            Ok(catalog) => {
                info!(path = %path.display(), version = catalog.version(), "catalog loaded");
                return Ok(catalog);
            }
            Err(err) => {
                warn!("Failed to load catalog {}: {err}. Using built-in catalog", path.display());
            }
        }
    }
    Catalog::builtin().context("built-in catalog is invalid")
}
