//! Application configuration
//!
//! Loaded once from `config.yaml` at startup and held immutably for the
//! process lifetime. The namespace table is the only place namespaces are
//! defined; there is no runtime mutation of the set.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Link keys claimed by the hypermedia envelope. Namespaces must never
/// shadow these.
pub const RESERVED_LINK_TOKENS: [&str; 2] = ["request", "collection"];

/// Record store backend types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Sqlite
    }
}

/// Configuration errors detected at startup. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no namespaces configured; add at least one binding such as 'pythonfiles: 0'")]
    NoNamespaces,
    #[error("namespace name '{0}' is reserved by hypermedia controls")]
    ReservedNamespace(String),
    #[error("keyspace index {0} is bound to more than one namespace")]
    DuplicateKeyspace(u32),
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Record store configuration
    pub store: StoreConfig,
    /// Namespace name to backing keyspace index, fixed for the process
    /// lifetime
    pub namespaces: BTreeMap<String, u32>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum payload size in bytes
    pub max_payload_size: usize,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    pub backend: StoreBackend,
    /// Database file path (sqlite backend)
    pub db_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl AppConfig {
    /// Load configuration from `config.yaml`, falling back to defaults when
    /// the file is absent. The result is validated either way.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = "config.yaml";
        let config = if Path::new(config_path).exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", config_path);
            config
        } else {
            warn!("Config file not found, using defaults");
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the startup invariants of the namespace table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespaces.is_empty() {
            return Err(ConfigError::NoNamespaces);
        }
        let mut seen = std::collections::BTreeSet::new();
        for (name, keyspace) in &self.namespaces {
            if RESERVED_LINK_TOKENS.contains(&name.as_str()) {
                return Err(ConfigError::ReservedNamespace(name.clone()));
            }
            if !seen.insert(*keyspace) {
                return Err(ConfigError::DuplicateKeyspace(*keyspace));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("pythonfiles".to_string(), 0);
        namespaces.insert("hiddenfiles".to_string(), 1);
        namespaces.insert("examplefiles".to_string(), 2);
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: 4,
                max_payload_size: 1073741824, // 1GB
            },
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                db_path: "./data/records.sqlite".to_string(),
            },
            namespaces,
            logging: LoggingConfig {
                config_file: "server_log.yaml".to_string(),
            },
        }
    }
}
