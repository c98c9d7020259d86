//! Inventory health and repair endpoints for the admin UI

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::infrastructure::AppState;
use crate::modules::reconciliation::{ReconcileError, RepairScope};
use crate::services::repair_runs;

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub book_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ScopeParams {
    pub scope: String,
    pub book_id: Option<i32>,
}

impl ScopeParams {
    fn parse(&self) -> Result<RepairScope, Response> {
        RepairScope::parse(self.scope.trim(), self.book_id)
            .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))).into_response())
    }
}

fn error_response(e: ReconcileError) -> Response {
    let status = match e {
        ReconcileError::BookNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Inventory request failed: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/inventory/health",
    params(("book_id" = Option<i32>, Query, description = "Restrict the report to one book")),
    responses(
        (status = 200, description = "Health report"),
        (status = 404, description = "Book not found"),
        (status = 500, description = "Inventory could not be read")
    )
)]
pub async fn get_health(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    let result = match query.book_id {
        Some(id) => state.reconciliation.scan_book(id).await,
        None => state.reconciliation.scan().await,
    };

    match result {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/inventory/plan",
    params(
        ("scope" = String, Query, description = "missing_copies, mismatched_counts, status_issues, book_codes, all or single_book"),
        ("book_id" = Option<i32>, Query, description = "Required for single_book")
    ),
    responses(
        (status = 200, description = "Planned operations, nothing written"),
        (status = 400, description = "Invalid scope"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn preview_plan(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> impl IntoResponse {
    let scope = match params.parse() {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };

    match state.reconciliation.plan(scope).await {
        Ok(plan) => (
            StatusCode::OK,
            Json(json!({
                "scope": plan.scope,
                "total": plan.len(),
                "operations": plan.operations
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/repairs",
    responses(
        (status = 202, description = "Repair run started"),
        (status = 400, description = "Invalid scope"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn start_repair(
    State(state): State<AppState>,
    Json(params): Json<ScopeParams>,
) -> impl IntoResponse {
    let scope = match params.parse() {
        Ok(scope) => scope,
        Err(resp) => return resp,
    };

    if let RepairScope::SingleBook(id) = scope
        && let Err(e) = state.reconciliation.ensure_book(id).await
    {
        return error_response(e);
    }

    let run_id = repair_runs::start_run(&state.runs, state.reconciliation.clone(), scope);

    (
        StatusCode::ACCEPTED,
        Json(json!({ "run_id": run_id, "scope": scope.to_string() })),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/inventory/repairs/{id}",
    params(("id" = Uuid, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run status"),
        (status = 404, description = "Unknown run")
    )
)]
pub async fn get_repair(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match repair_runs::run_status(&state.runs, id) {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Repair run {} not found", id) })),
        )
            .into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/repairs/{id}/cancel",
    params(("id" = Uuid, Path, description = "Run id")),
    responses(
        (status = 202, description = "Cancellation requested"),
        (status = 404, description = "Unknown run")
    )
)]
pub async fn cancel_repair(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match repair_runs::cancel_run(&state.runs, id) {
        Some(cancelled) => (
            StatusCode::ACCEPTED,
            Json(json!({ "run_id": id, "cancelled": cancelled })),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Repair run {} not found", id) })),
        )
            .into_response(),
    }
}
