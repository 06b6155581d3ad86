//! Warehouse API Library
//!
//! This crate provides the fulfillment-orchestration core: the inventory
//! ledger and the receiving, picking, packing, shipping, returns and QC
//! managers around it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod openapi;
pub mod services;
pub mod store;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<store::WarehouseStore>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub catalog_service: services::catalog::CatalogService,
    pub inventory_service: services::inventory::InventoryService,
    pub inbound_service: services::inbound::InboundService,
    pub order_service: services::orders::OrderService,
    pub picking_service: services::picking::PickingService,
    pub packing_service: services::packing::PackingService,
    pub shipping_service: services::shipping::ShippingService,
    pub returns_service: services::returns::ReturnsService,
    pub qc_service: services::qc::QcService,
}

impl AppState {
    /// Wires the full service graph over one shared store.
    pub fn new(config: config::AppConfig, event_sender: events::EventSender) -> Self {
        let store = Arc::new(store::WarehouseStore::new());
        let shipping_service =
            services::shipping::ShippingService::new(store.clone(), event_sender.clone());
        Self {
            catalog_service: services::catalog::CatalogService::new(store.clone()),
            inventory_service: services::inventory::InventoryService::new(
                store.clone(),
                event_sender.clone(),
            ),
            inbound_service: services::inbound::InboundService::new(
                store.clone(),
                event_sender.clone(),
                config.clone(),
            ),
            order_service: services::orders::OrderService::new(
                store.clone(),
                event_sender.clone(),
            ),
            picking_service: services::picking::PickingService::new(
                store.clone(),
                event_sender.clone(),
            ),
            packing_service: services::packing::PackingService::new(
                store.clone(),
                event_sender.clone(),
                config.clone(),
                shipping_service.clone(),
            ),
            shipping_service,
            returns_service: services::returns::ReturnsService::new(
                store.clone(),
                event_sender.clone(),
                config.clone(),
            ),
            qc_service: services::qc::QcService::new(store.clone(), event_sender.clone()),
            store,
            config,
            event_sender,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API routes
pub fn api_v1_routes() -> Router<AppState> {
    let catalog = Router::new()
        .route(
            "/products",
            get(handlers::catalog::list_products).post(handlers::catalog::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::catalog::get_product).put(handlers::catalog::update_product),
        )
        .route(
            "/products/:id/stock",
            get(handlers::catalog::get_product_stock),
        )
        .route(
            "/zones",
            get(handlers::catalog::list_zones).post(handlers::catalog::create_zone),
        )
        .route(
            "/location-types",
            get(handlers::catalog::list_location_types)
                .post(handlers::catalog::create_location_type),
        )
        .route(
            "/locations",
            get(handlers::catalog::list_locations).post(handlers::catalog::create_location),
        )
        .route("/locations/:id", get(handlers::catalog::get_location))
        .route(
            "/locations/:id/occupancy",
            get(handlers::catalog::get_location_occupancy),
        )
        .route(
            "/carriers",
            get(handlers::catalog::list_carriers).post(handlers::catalog::create_carrier),
        );

    let inventory = Router::new()
        .route(
            "/inventory",
            get(handlers::inventory::list_inventory).post(handlers::inventory::create_lot),
        )
        .route("/inventory/:id", get(handlers::inventory::get_record))
        .route(
            "/inventory/:id/reserve",
            axum::routing::post(handlers::inventory::reserve),
        )
        .route(
            "/inventory/:id/status",
            axum::routing::post(handlers::inventory::set_status),
        )
        .route(
            "/inventory/reservations/:id/release",
            axum::routing::post(handlers::inventory::release),
        )
        .route(
            "/inventory/reservations/:id/consume",
            axum::routing::post(handlers::inventory::consume),
        );

    let inbound = Router::new()
        .route(
            "/inbound-orders",
            get(handlers::inbound::list_inbound_orders)
                .post(handlers::inbound::create_inbound_order),
        )
        .route(
            "/inbound-orders/:id",
            get(handlers::inbound::get_inbound_order),
        )
        .route(
            "/receiving/receive",
            axum::routing::post(handlers::inbound::receive_item),
        )
        .route(
            "/receiving/lpns",
            axum::routing::post(handlers::inbound::generate_lpn),
        );

    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order));

    let picking = Router::new()
        .route(
            "/waves",
            get(handlers::picking::list_waves).post(handlers::picking::create_wave),
        )
        .route("/waves/:id", get(handlers::picking::get_wave))
        .route("/waves/:id/tasks", get(handlers::picking::list_wave_tasks))
        .route("/pick-tasks/:id", get(handlers::picking::get_task))
        .route(
            "/pick-tasks/:id/confirm",
            axum::routing::post(handlers::picking::confirm_pick_task),
        );

    let packing = Router::new()
        .route(
            "/packing/start",
            axum::routing::post(handlers::packing::start_packing),
        )
        .route(
            "/shipments",
            get(handlers::packing::list_shipments),
        )
        .route("/shipments/:id", get(handlers::packing::get_shipment))
        .route(
            "/shipments/:id/parcels",
            axum::routing::post(handlers::packing::create_parcel),
        )
        .route(
            "/shipments/:id/close",
            axum::routing::post(handlers::packing::close_shipment),
        )
        .route(
            "/parcels/:id",
            get(handlers::packing::get_parcel),
        )
        .route(
            "/parcels/:id/items",
            axum::routing::post(handlers::packing::add_item_to_parcel),
        );

    let shipping = Router::new()
        .route(
            "/shipping/shipment-records",
            axum::routing::post(handlers::shipping::create_shipment_record),
        )
        .route(
            "/loads",
            get(handlers::shipping::list_loads).post(handlers::shipping::create_load),
        )
        .route("/loads/:id", get(handlers::shipping::get_load))
        .route(
            "/loads/:id/shipments",
            axum::routing::post(handlers::shipping::assign_shipment_to_load),
        )
        .route(
            "/loads/:id/dispatch",
            axum::routing::post(handlers::shipping::dispatch_load),
        )
        .route("/manifests/:id", get(handlers::shipping::get_manifest));

    let returns = Router::new()
        .route(
            "/rmas",
            get(handlers::returns::list_rmas).post(handlers::returns::create_rma),
        )
        .route("/rmas/:id", get(handlers::returns::get_rma))
        .route(
            "/rmas/:id/receive",
            axum::routing::post(handlers::returns::receive_return),
        )
        .route(
            "/rmas/:id/grade",
            axum::routing::post(handlers::returns::grade_item),
        )
        .route(
            "/rmas/:id/close",
            axum::routing::post(handlers::returns::close_rma),
        );

    let qc = Router::new()
        .route(
            "/inspections",
            get(handlers::qc::list_inspections).post(handlers::qc::create_inspection),
        )
        .route("/inspections/:id", get(handlers::qc::get_inspection))
        .route(
            "/inspections/:id/execute",
            axum::routing::post(handlers::qc::execute_inspection),
        )
        .route(
            "/inspections/:id/ncr",
            axum::routing::post(handlers::qc::create_ncr),
        )
        .route("/ncrs", get(handlers::qc::list_ncrs))
        .route("/ncrs/:id", get(handlers::qc::get_ncr))
        .route(
            "/ncrs/:id/close",
            axum::routing::post(handlers::qc::close_ncr),
        );

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(catalog)
        .merge(inventory)
        .merge(inbound)
        .merge(orders)
        .merge(picking)
        .merge(packing)
        .merge(shipping)
        .merge(returns)
        .merge(qc)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "warehouse-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    // The entity set is in-process; health is reachability plus a few
    // live counters.
    let health_data = json!({
        "status": "healthy",
        "checks": {
            "store": "healthy",
        },
        "open_lots": state.store.ledger.list_records(1, 1, None, None, None, false)
            .map(|(_, total)| total)
            .unwrap_or(0),
        "outbound_orders": state.store.outbound_orders.len(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn success_response_includes_metadata() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        let meta = response.meta.expect("metadata expected");
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
    }
}
