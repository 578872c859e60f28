use std::sync::Arc;

use trackvault::{GateConfig, HttpVerifier, ResourceGate, SqliteLedger};

use crate::config::ServerConfig;
use crate::db::Database;
use crate::storage::SignedUrlIssuer;

/// The concrete gate wiring used by the server binary.
pub type Gate = ResourceGate<SqliteLedger, HttpVerifier, SignedUrlIssuer>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db: Arc<Database>,
    pub gate: Arc<Gate>,
}

impl AppState {
    pub fn new(config: ServerConfig, db: Database, gate: Gate) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            gate: Arc::new(gate),
        }
    }

    /// Gate configuration for one request. The kill switch is read here, per
    /// request, so tests and operators can flip it without touching the gate.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig::new(self.config.payments_enabled)
    }
}
