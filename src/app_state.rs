//! Application state management
//!
//! All collaborators (record store, authorization provider) live behind trait
//! objects in one state struct, injected into handlers through actix-web's
//! `web::Data`. Tests swap in the in-memory store and a scriptable oracle
//! without touching any handler code.

use log::info;
use std::sync::Arc;

use crate::auth::stub_provider::StubAuthProvider;
use crate::auth::{AuthGate, AuthProvider};
use crate::config::{AppConfig, ConfigError, StoreBackend};
use crate::store::memory_store::MemoryRecordStore;
use crate::store::sqlite_store::SqliteRecordStore;
use crate::store::{RecordStore, StoreError};

/// Startup failures: bad configuration or an unopenable store backend.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open record store: {0}")]
    Store(#[from] StoreError),
}

/// Application state containing all services and their dependencies.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub config: AppConfig,
}

impl AppState {
    /// Build the state from a validated configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let store: Arc<dyn RecordStore> = match config.store.backend {
            StoreBackend::Sqlite => {
                info!(
                    "Using sqlite record store at {} with {} namespaces",
                    config.store.db_path,
                    config.namespaces.len()
                );
                Arc::new(SqliteRecordStore::open(
                    &config.store.db_path,
                    config.namespaces.clone(),
                )?)
            }
            StoreBackend::Memory => {
                info!("Using in-memory record store");
                Arc::new(MemoryRecordStore::new(config.namespaces.clone()))
            }
        };

        // The oracle is an external collaborator; until it exists the stub
        // answers every query.
        let auth: Arc<dyn AuthProvider> = Arc::new(StubAuthProvider::new());

        info!("Application state initialized");
        Ok(Self { store, auth, config })
    }

    /// In-memory state with the default namespace table and the allow-all
    /// stub oracle.
    pub fn new_for_testing() -> Self {
        let config = AppConfig::default();
        Self {
            store: Arc::new(MemoryRecordStore::new(config.namespaces.clone())),
            auth: Arc::new(StubAuthProvider::new()),
            config,
        }
    }

    /// In-memory state with a caller-supplied oracle, for authorization
    /// tests.
    pub fn for_testing_with_auth(auth: Arc<dyn AuthProvider>) -> Self {
        let config = AppConfig::default();
        Self {
            store: Arc::new(MemoryRecordStore::new(config.namespaces.clone())),
            auth,
            config,
        }
    }

    /// The authorization gate over this state's oracle and store.
    pub fn gate(&self) -> AuthGate {
        AuthGate::new(Arc::clone(&self.auth), Arc::clone(&self.store))
    }
}
