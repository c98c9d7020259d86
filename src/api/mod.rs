pub mod health;
pub mod inventory;

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::api_docs::ApiDoc;
use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Inventory reconciliation
        .route("/inventory/health", get(inventory::get_health))
        .route("/inventory/plan", get(inventory::preview_plan))
        .route("/inventory/repairs", post(inventory::start_repair))
        .route("/inventory/repairs/:id", get(inventory::get_repair))
        .route("/inventory/repairs/:id/cancel", post(inventory::cancel_repair))
        // API docs
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
}
