use crate::{
    entities::inventory_lot::{InventoryRecord, LotSource, LotStatus},
    errors::ServiceError,
    services::inventory::CreateLotCommand,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    /// Lot status filter (AVAILABLE, RESERVED, QC_HOLD, DAMAGED)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "990e8400-e29b-41d4-a716-446655440000",
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "location_id": "770e8400-e29b-41d4-a716-446655440000",
    "lpn": "LPN-00000042",
    "quantity": 50,
    "reserved": 30,
    "available": 20,
    "status": "RESERVED",
    "archived": false,
    "version": 3
}))]
pub struct InventoryRecordSummary {
    /// Inventory record UUID
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// Lot / license-plate number
    #[schema(example = "LPN-00000042")]
    pub lpn: String,
    /// On-hand quantity
    pub quantity: i32,
    /// Quantity promised to open reservations
    pub reserved: i32,
    /// Quantity still reservable (quantity - reserved)
    pub available: i32,
    /// Lot status (AVAILABLE, RESERVED, QC_HOLD, DAMAGED)
    #[schema(example = "AVAILABLE")]
    pub status: String,
    /// Where the lot came from (INBOUND, RETURN, ADJUSTMENT)
    #[schema(example = "INBOUND")]
    pub source: String,
    pub archived: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InventoryRecord> for InventoryRecordSummary {
    fn from(record: InventoryRecord) -> Self {
        Self {
            id: record.id,
            product_id: record.product_id,
            location_id: record.location_id,
            lpn: record.lpn.clone(),
            quantity: record.quantity,
            reserved: record.reserved,
            available: record.available(),
            status: record.status.to_string(),
            source: source_label(&record.source).to_string(),
            archived: record.archived,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLotRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// Generated when omitted
    pub lpn: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReserveRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationResponse {
    pub reservation_id: Uuid,
    pub record_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    /// Target lot status (AVAILABLE, QC_HOLD, DAMAGED)
    #[schema(example = "QC_HOLD")]
    pub status: String,
}

pub(crate) fn parse_lot_status(value: &str) -> Result<LotStatus, ServiceError> {
    let status = match value {
        "AVAILABLE" => LotStatus::Available,
        "RESERVED" => LotStatus::Reserved,
        "QC_HOLD" => LotStatus::QcHold,
        "DAMAGED" => LotStatus::Damaged,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported lot status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

pub(crate) fn source_label(source: &LotSource) -> &'static str {
    match source {
        LotSource::Inbound { .. } => "INBOUND",
        LotSource::Return { .. } => "RETURN",
        LotSource::Adjustment => "ADJUSTMENT",
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryListQuery),
    responses(
        (status = 200, description = "Inventory records listed", body = ApiResponse<PaginatedResponse<InventoryRecordSummary>>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<InventoryRecordSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let status = query.status.as_deref().map(parse_lot_status).transpose()?;

    let (records, total) = state
        .inventory_service
        .list_records(page, limit, query.product_id, query.location_id, status)
        .await?;
    let items: Vec<InventoryRecordSummary> = records
        .into_iter()
        .map(InventoryRecordSummary::from)
        .collect();

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/:id",
    params(
        ("id" = Uuid, Path, description = "Inventory record ID")
    ),
    responses(
        (status = 200, description = "Inventory record fetched", body = ApiResponse<InventoryRecordSummary>),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InventoryRecordSummary> {
    let record = state.inventory_service.get_record(id).await?;
    Ok(Json(ApiResponse::success(InventoryRecordSummary::from(
        record,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateLotRequest,
    responses(
        (status = 200, description = "Lot created", body = ApiResponse<InventoryRecordSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate LPN", body = crate::errors::ErrorResponse),
        (status = 422, description = "Capacity exceeded", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_lot(
    State(state): State<AppState>,
    Json(payload): Json<CreateLotRequest>,
) -> ApiResult<InventoryRecordSummary> {
    payload.validate()?;
    let record = state
        .inventory_service
        .create_lot(CreateLotCommand {
            product_id: payload.product_id,
            location_id: payload.location_id,
            lpn: payload.lpn,
            quantity: payload.quantity,
        })
        .await?;
    Ok(Json(ApiResponse::success(InventoryRecordSummary::from(
        record,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/:id/reserve",
    params(
        ("id" = Uuid, Path, description = "Inventory record ID")
    ),
    request_body = ReserveRequest,
    responses(
        (status = 200, description = "Stock reserved", body = ApiResponse<ReservationResponse>),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn reserve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReserveRequest>,
) -> ApiResult<ReservationResponse> {
    payload.validate()?;
    let reservation = state.inventory_service.reserve(id, payload.quantity).await?;
    Ok(Json(ApiResponse::success(ReservationResponse {
        reservation_id: reservation.id,
        record_id: reservation.record_id,
        quantity: reservation.quantity,
        created_at: reservation.created_at,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/reservations/:id/release",
    params(
        ("id" = Uuid, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation released", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn release(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<serde_json::Value> {
    state.inventory_service.release(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "reservation_id": id,
        "released": true
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/reservations/:id/consume",
    params(
        ("id" = Uuid, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation consumed", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn consume(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<serde_json::Value> {
    state.inventory_service.consume(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "reservation_id": id,
        "consumed": true
    }))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/:id/status",
    params(
        ("id" = Uuid, Path, description = "Inventory record ID")
    ),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<InventoryRecordSummary>),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> ApiResult<InventoryRecordSummary> {
    let status = parse_lot_status(&payload.status)?;
    let record = state.inventory_service.set_status(id, status).await?;
    Ok(Json(ApiResponse::success(InventoryRecordSummary::from(
        record,
    ))))
}
