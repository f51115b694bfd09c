use std::sync::Arc;

use axum::extract::FromRef;

use shared_config::{AppConfig, StoreBackend};

use crate::memory::MemoryStore;
use crate::postgrest::PostgrestStore;
use crate::store::SchedulingStore;

/// Shared router state: process-wide configuration plus the store handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SchedulingStore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SchedulingStore>) -> Self {
        Self { config, store }
    }

    /// Builds the store selected by `STORE_BACKEND`.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn SchedulingStore> = match config.store_backend {
            StoreBackend::Supabase => Arc::new(PostgrestStore::new(&config)),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Self::new(Arc::new(config), store)
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.config)
    }
}
