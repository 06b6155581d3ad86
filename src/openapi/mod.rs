use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warehouse API",
        version = "1.0.0",
        description = r#"
# Warehouse Fulfillment Orchestration API

Tracks physical inventory as discrete lots and drives it through
receiving, picking, packing, shipping, returns and quality control.

## Inventory contract

Stock lives in the inventory ledger as (product, location, LPN) records.
Reservations never exceed on-hand stock; wave creation is all-or-nothing;
conflict errors (409/422) signal a legitimate concurrent-state mismatch
and are safe to retry after re-reading.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20,
max 100) plus a `status` filter where the resource has one.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "inventory", description = "Inventory ledger: lots, reservations, status"),
        (name = "picking", description = "Pick waves and pick tasks")
    ),
    paths(
        // Inventory ledger
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_record,
        crate::handlers::inventory::create_lot,
        crate::handlers::inventory::reserve,
        crate::handlers::inventory::release,
        crate::handlers::inventory::consume,
        crate::handlers::inventory::set_status,

        // Picking
        crate::handlers::picking::create_wave,
        crate::handlers::picking::list_waves,
        crate::handlers::picking::get_wave,
        crate::handlers::picking::list_wave_tasks,
        crate::handlers::picking::get_task,
        crate::handlers::picking::confirm_pick_task,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,

            // Inventory types
            crate::handlers::inventory::InventoryRecordSummary,
            crate::handlers::inventory::CreateLotRequest,
            crate::handlers::inventory::ReserveRequest,
            crate::handlers::inventory::ReservationResponse,
            crate::handlers::inventory::SetStatusRequest,

            // Picking types
            crate::handlers::picking::WaveSummary,
            crate::handlers::picking::PickTaskSummary,
            crate::handlers::picking::CreateWaveRequest,
            crate::handlers::picking::ConfirmPickRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the raw OpenAPI document.
pub fn openapi_routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}
