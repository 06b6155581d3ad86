use crate::{
    entities::shipment::Shipment,
    entities::transport_load::{LoadStatus, Manifest, TransportLoad, VehicleInfo},
    errors::ServiceError,
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRecordRequest {
    pub outbound_order_id: Uuid,
    pub carrier_id: Uuid,
    /// Generated when omitted
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoadRequest {
    pub carrier_id: Uuid,
    pub trailer_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignShipmentRequest {
    pub shipment_id: Uuid,
}

fn parse_load_status(value: &str) -> Result<LoadStatus, ServiceError> {
    let status = match value {
        "OPEN" => LoadStatus::Open,
        "DISPATCHED" => LoadStatus::Dispatched,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported load status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

pub async fn create_shipment_record(
    State(state): State<AppState>,
    Json(payload): Json<CreateShipmentRecordRequest>,
) -> ApiResult<Shipment> {
    let shipment = state
        .shipping_service
        .create_shipment_record(
            payload.outbound_order_id,
            payload.carrier_id,
            payload.tracking_number,
        )
        .await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn create_load(
    State(state): State<AppState>,
    Json(payload): Json<CreateLoadRequest>,
) -> ApiResult<TransportLoad> {
    let load = state
        .shipping_service
        .create_load(
            payload.carrier_id,
            VehicleInfo {
                trailer_number: payload.trailer_number,
                driver_name: payload.driver_name,
                driver_phone: payload.driver_phone,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(load)))
}

pub async fn assign_shipment_to_load(
    State(state): State<AppState>,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<AssignShipmentRequest>,
) -> ApiResult<TransportLoad> {
    state
        .shipping_service
        .assign_shipment_to_load(load_id, payload.shipment_id)
        .await?;
    let load = state.shipping_service.get_load(load_id).await?;
    Ok(Json(ApiResponse::success(load)))
}

/// Dispatches the load and returns the frozen manifest.
pub async fn dispatch_load(
    State(state): State<AppState>,
    Path(load_id): Path<Uuid>,
) -> ApiResult<Manifest> {
    let manifest = state.shipping_service.dispatch_load(load_id).await?;
    Ok(Json(ApiResponse::success(manifest)))
}

pub async fn get_load(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TransportLoad> {
    let load = state.shipping_service.get_load(id).await?;
    Ok(Json(ApiResponse::success(load)))
}

pub async fn list_loads(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<TransportLoad>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let status = query.status.as_deref().map(parse_load_status).transpose()?;
    let (items, total) = state
        .shipping_service
        .list_loads(page, limit, status)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_manifest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Manifest> {
    let manifest = state.shipping_service.get_manifest(id).await?;
    Ok(Json(ApiResponse::success(manifest)))
}
