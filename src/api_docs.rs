use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::inventory::get_health,
        api::inventory::preview_plan,
        api::inventory::start_repair,
        api::inventory::get_repair,
        api::inventory::cancel_repair,
    ),
    tags(
        (name = "shelf-reconcile", description = "Inventory reconciliation API")
    )
)]
pub struct ApiDoc;
