//! # Application State
//!
//! The context object every handler receives: built once in `main`, cloned
//! cheaply per request (all fields are pools or `Arc`s).
//!
//! ```text
//! main ──► AppState::new ──► Router::with_state ──► handler(State(state))
//!            │
//!            ├── Database          (SqlitePool, closed on shutdown)
//!            ├── ObjectStorage     (exported reports)
//!            ├── RendererRegistry  (csv built in, pdf injected)
//!            ├── SunatClient?      (None when not configured)
//!            └── AppConfig
//! ```

use std::sync::Arc;

use crate::config::AppConfig;
use crate::integrations::export::RendererRegistry;
use crate::integrations::storage::{LocalObjectStorage, ObjectStorage};
use crate::integrations::sunat::SunatClient;
use crate::integrations::IntegrationError;
use arendir_core::AdvancePolicy;
use arendir_db::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Arc<dyn ObjectStorage>,
    pub renderers: RendererRegistry,
    pub sunat: Option<SunatClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the default collaborators from configuration.
    pub fn new(db: Database, config: AppConfig) -> Result<Self, IntegrationError> {
        let storage = LocalObjectStorage::new(
            config.storage.root.clone(),
            config.storage.public_base_url.clone(),
        );
        let sunat = match config.sunat.base_url {
            Some(_) => Some(SunatClient::new(&config.sunat)?),
            None => None,
        };

        Ok(AppState {
            db,
            storage: Arc::new(storage),
            renderers: RendererRegistry::with_defaults(),
            sunat,
            config: Arc::new(config),
        })
    }

    /// Replaces the object store.
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Replaces the renderer registry (e.g. to add a PDF renderer).
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn advance_policy(&self) -> AdvancePolicy {
        self.config.reconciliation.advance_policy
    }

    /// The SUNAT client, or `Unavailable` when none is configured.
    pub fn sunat(&self) -> Result<&SunatClient, IntegrationError> {
        self.sunat
            .as_ref()
            .ok_or_else(|| IntegrationError::unavailable("SUNAT", "client is not configured"))
    }
}
