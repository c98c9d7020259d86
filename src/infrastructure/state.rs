//! Application state containing the inventory gateway and shared resources

use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::ReconcileConfig;
use crate::domain::InventoryGateway;
use crate::infrastructure::SeaOrmInventoryRepository;
use crate::services::{ReconciliationService, RunRegistry};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Record store access
    pub gateway: Arc<dyn InventoryGateway>,
    /// Scan, plan and repair
    pub reconciliation: Arc<ReconciliationService>,
    /// Repair runs started through the API, keyed by run id
    pub runs: RunRegistry,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: ReconcileConfig) -> Self {
        let gateway: Arc<dyn InventoryGateway> =
            Arc::new(SeaOrmInventoryRepository::new(db.clone()));
        Self::with_gateway(db, gateway, config)
    }

    /// Build the state around an arbitrary gateway implementation.
    pub fn with_gateway(
        db: DatabaseConnection,
        gateway: Arc<dyn InventoryGateway>,
        config: ReconcileConfig,
    ) -> Self {
        let reconciliation = Arc::new(ReconciliationService::new(gateway.clone(), config));

        Self {
            db,
            gateway,
            reconciliation,
            runs: Arc::new(DashMap::new()),
        }
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
