//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `telemetry.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     the DB_* / TELEMETRY_* overrides from the process environment or a
//!     .env file (process environment wins).
//!
//! structure:
//!     - ServerConfig: where the http listener binds.
//!     - DatabaseConfig: backend choice, postgres credentials, pool sizing.
//!     - LoggingConfig: default log filter when RUST_LOG is unset.
//!
//! ==============================================================================

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// in-process store for running without a database
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// no default: an unset user surfaces as an auth failure on connect
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_pool_size: usize,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            name: "telemetry_data".to_string(),
            user: None,
            password: None,
            max_pool_size: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback, then apply environment overrides.
    ///
    /// runs before the subscriber is installed, so outcomes are returned as
    /// notes for the caller to log.
    pub fn load_or_default() -> (Self, Vec<String>) {
        let mut notes = Vec::new();
        let mut paths: Vec<PathBuf> = Vec::new();
        if let Ok(explicit) = std::env::var("TELEMETRY_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("telemetry.toml"));
        paths.push(PathBuf::from("..").join("config").join("telemetry.toml"));

        let mut config = None;
        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(loaded) => {
                        notes.push(format!("loaded config from {}", path.display()));
                        config = Some(loaded);
                        break;
                    }
                    Err(e) => {
                        notes.push(format!("failed to load {}: {}", path.display(), e));
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            notes.push("no config file found - using defaults".to_string());
            Self::default()
        });
        let dotenv = match dotenvy::dotenv_iter() {
            Ok(iter) => match iter.collect::<Result<HashMap<_, _>, _>>() {
                Ok(vars) => {
                    notes.push(format!("loaded {} variables from .env", vars.len()));
                    vars
                }
                Err(e) => {
                    notes.push(format!("failed to parse .env: {}", e));
                    HashMap::new()
                }
            },
            Err(e) if e.not_found() => HashMap::new(),
            Err(e) => {
                notes.push(format!("failed to read .env: {}", e));
                HashMap::new()
            }
        };

        notes.extend(config.apply_env(|key| {
            std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
        }));
        (config, notes)
    }

    /// Read KEY=VALUE pairs from a .env-style file without touching the
    /// process environment.
    pub fn read_env_file<P: AsRef<Path>>(path: P) -> anyhow::Result<HashMap<String, String>> {
        dotenvy::from_path_iter(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read env file: {}", e))?
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env file: {}", e))
    }

    /// Apply DB_* and TELEMETRY_* overrides from `lookup`.
    ///
    /// returns a note for every value that was present but unusable.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut notes = Vec::new();

        if let Some(host) = lookup("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            match port.parse() {
                Ok(port) => self.database.port = port,
                Err(_) => notes.push(format!("ignoring invalid DB_PORT {:?}", port)),
            }
        }
        if let Some(name) = lookup("DB_NAME") {
            self.database.name = name;
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Some(host) = lookup("TELEMETRY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TELEMETRY_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => notes.push(format!("ignoring invalid TELEMETRY_PORT {:?}", port)),
            }
        }

        notes
    }

    /// Log configuration summary. The password is never printed.
    pub fn log_summary(&self) {
        info!(
            listen = %self.server.socket_addr(),
            backend = ?self.database.backend,
            "service configuration"
        );
        if self.database.backend == StoreBackend::Postgres {
            info!(
                host = %self.database.host,
                port = self.database.port,
                database = %self.database.name,
                user = self.database.user.as_deref().unwrap_or("<unset>"),
                max_pool_size = self.database.max_pool_size,
                "database configuration"
            );
            if self.database.user.is_none() || self.database.password.is_none() {
                warn!("DB_USER or DB_PASSWORD is unset; connections will likely be rejected");
            }
        }
    }
}
