//! Wiring of backend, image storage and local store from configuration.

use anyhow::Result;
use std::sync::Arc;

use linkboard_core::local::{Favorites, LocalStore, Recent};
use linkboard_core::store::{Backend, ImageStorage};

use crate::config::Config;
use crate::local_store::FileLocalStore;
use crate::storage::SupabaseStorage;
use crate::supabase::{SupabaseBackend, SupabaseClient};

/// Everything a command or request handler needs.
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub backend: Arc<dyn Backend>,
    pub storage: Arc<dyn ImageStorage>,
    pub local: Arc<dyn LocalStore>,
}

impl App {
    /// Builds the Supabase-backed app described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = SupabaseClient::new(&config.backend)?;
        let backend = SupabaseBackend::new(client.clone());
        let storage = SupabaseStorage::new(client, config.storage.bucket.clone());
        let local = open_local_store(config)?;
        Ok(Self {
            config: Arc::new(config.clone()),
            backend: Arc::new(backend),
            storage: Arc::new(storage),
            local,
        })
    }

    /// Assembles an app from already-built parts.
    pub fn with_parts(
        config: Config,
        backend: Arc<dyn Backend>,
        storage: Arc<dyn ImageStorage>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            storage,
            local,
        }
    }

    pub fn favorites(&self) -> Result<Favorites> {
        Favorites::load(self.local.clone())
    }

    pub fn recent(&self) -> Result<Recent> {
        Recent::load(self.local.clone())
    }
}

/// The device-local store at `[local].path`.
pub fn open_local_store(config: &Config) -> Result<Arc<dyn LocalStore>> {
    Ok(Arc::new(FileLocalStore::open(&config.local.path)?))
}
