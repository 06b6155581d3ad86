use crate::{
    entities::shipment::{Parcel, Shipment, ShipmentStatus},
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
pub struct StartPackingRequest {
    pub outbound_order_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateParcelRequest {
    /// Id from the configured packing-material catalog (e.g. CARTON-M)
    #[validate(length(min = 1))]
    pub packing_material_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

pub(crate) fn parse_shipment_status(value: &str) -> Result<ShipmentStatus, ServiceError> {
    let status = match value {
        "PACKING" => ShipmentStatus::Packing,
        "PACKED" => ShipmentStatus::Packed,
        "SHIPPED" => ShipmentStatus::Shipped,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported shipment status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

pub async fn start_packing(
    State(state): State<AppState>,
    Json(payload): Json<StartPackingRequest>,
) -> ApiResult<Shipment> {
    let shipment = state
        .packing_service
        .start_packing(payload.outbound_order_id)
        .await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn create_parcel(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
    Json(payload): Json<CreateParcelRequest>,
) -> ApiResult<Parcel> {
    payload.validate()?;
    let parcel = state
        .packing_service
        .create_parcel(shipment_id, payload.packing_material_id)
        .await?;
    Ok(Json(ApiResponse::success(parcel)))
}

pub async fn add_item_to_parcel(
    State(state): State<AppState>,
    Path(parcel_id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> ApiResult<Parcel> {
    payload.validate()?;
    let parcel = state
        .packing_service
        .add_item_to_parcel(parcel_id, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success(parcel)))
}

pub async fn close_shipment(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
) -> ApiResult<Shipment> {
    let shipment = state.packing_service.close_shipment(shipment_id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    let shipment = state.packing_service.get_shipment(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn get_parcel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Parcel> {
    let parcel = state.packing_service.get_parcel(id).await?;
    Ok(Json(ApiResponse::success(parcel)))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Shipment>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let status = query
        .status
        .as_deref()
        .map(parse_shipment_status)
        .transpose()?;
    let (items, total) = state
        .packing_service
        .list_shipments(page, limit, status)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}
