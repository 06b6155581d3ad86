use crate::{
    entities::inventory_lot::StockSummary,
    entities::location::{Location, LocationType, Zone},
    entities::product::Product,
    entities::transport_load::Carrier,
    services::catalog::{NewLocation, NewProduct, ProductUpdate},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub unit_price: Decimal,
    #[validate(range(min = 0))]
    pub unit_weight_grams: i64,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub unit_price: Option<Decimal>,
    pub unit_weight_grams: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateZoneRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub is_secure: bool,
    #[serde(default)]
    pub is_temperature_controlled: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationTypeRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1))]
    pub max_units: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub barcode: Option<String>,
    pub zone_id: Uuid,
    pub location_type_id: Uuid,
    #[serde(default)]
    pub pick_sequence: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCarrierRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub service_type: Option<String>,
    pub tracking_url_template: Option<String>,
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<Product> {
    payload.validate()?;
    let product = state
        .catalog_service
        .create_product(NewProduct {
            sku: payload.sku,
            name: payload.name,
            description: payload.description,
            category: payload.category,
            barcode: payload.barcode,
            unit_price: payload.unit_price,
            unit_weight_grams: payload.unit_weight_grams,
        })
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<Product> {
    let product = state
        .catalog_service
        .update_product(
            id,
            ProductUpdate {
                name: payload.name,
                description: payload.description,
                category: payload.category,
                barcode: payload.barcode,
                unit_price: payload.unit_price,
                unit_weight_grams: payload.unit_weight_grams,
                active: payload.active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Product> {
    let product = state.catalog_service.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Product>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let (items, total) = state.catalog_service.list_products(page, limit).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Aggregate on-hand / reserved / available position for a product.
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StockSummary> {
    let summary = state.inventory_service.stock_summary(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

pub async fn create_zone(
    State(state): State<AppState>,
    Json(payload): Json<CreateZoneRequest>,
) -> ApiResult<Zone> {
    payload.validate()?;
    let zone = state
        .catalog_service
        .create_zone(
            payload.name,
            payload.is_secure,
            payload.is_temperature_controlled,
        )
        .await?;
    Ok(Json(ApiResponse::success(zone)))
}

pub async fn list_zones(State(state): State<AppState>) -> ApiResult<Vec<Zone>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service.list_zones().await?,
    )))
}

pub async fn create_location_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationTypeRequest>,
) -> ApiResult<LocationType> {
    payload.validate()?;
    let location_type = state
        .catalog_service
        .create_location_type(payload.name, payload.max_units)
        .await?;
    Ok(Json(ApiResponse::success(location_type)))
}

pub async fn list_location_types(State(state): State<AppState>) -> ApiResult<Vec<LocationType>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service.list_location_types().await?,
    )))
}

pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> ApiResult<Location> {
    payload.validate()?;
    let location = state
        .catalog_service
        .create_location(NewLocation {
            code: payload.code,
            barcode: payload.barcode,
            zone_id: payload.zone_id,
            location_type_id: payload.location_type_id,
            pick_sequence: payload.pick_sequence,
        })
        .await?;
    Ok(Json(ApiResponse::success(location)))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Location> {
    let location = state.catalog_service.get_location(id).await?;
    Ok(Json(ApiResponse::success(location)))
}

pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Vec<Location>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service.list_locations().await?,
    )))
}

/// Units physically present, derived from the ledger.
pub async fn get_location_occupancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let occupied = state.inventory_service.location_occupancy(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "location_id": id,
        "occupied_units": occupied
    }))))
}

pub async fn create_carrier(
    State(state): State<AppState>,
    Json(payload): Json<CreateCarrierRequest>,
) -> ApiResult<Carrier> {
    payload.validate()?;
    let carrier = state
        .catalog_service
        .create_carrier(
            payload.name,
            payload.service_type,
            payload.tracking_url_template,
        )
        .await?;
    Ok(Json(ApiResponse::success(carrier)))
}

pub async fn list_carriers(State(state): State<AppState>) -> ApiResult<Vec<Carrier>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service.list_carriers().await?,
    )))
}
