use crate::{
    entities::inbound_order::{InboundOrder, InboundOrderStatus},
    errors::ServiceError,
    handlers::inventory::InventoryRecordSummary,
    services::inbound::{NewInboundItem, NewInboundOrder, ReceiveItemCommand},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct InboundItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity_expected: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInboundOrderRequest {
    /// Generated when omitted
    pub order_reference: Option<String>,
    #[validate(length(min = 1))]
    pub supplier: String,
    pub expected_arrival: Option<DateTime<Utc>>,
    #[validate(length(min = 1))]
    pub items: Vec<InboundItemRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveItemRequest {
    pub order_item_id: Uuid,
    pub location_id: Uuid,
    #[validate(length(min = 1))]
    pub lpn: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub operator_id: Uuid,
    /// When present, the lot is created DAMAGED
    pub damage_code: Option<String>,
}

fn parse_inbound_status(value: &str) -> Result<InboundOrderStatus, ServiceError> {
    let status = match value {
        "PENDING" => InboundOrderStatus::Pending,
        "PARTIALLY_RECEIVED" => InboundOrderStatus::PartiallyReceived,
        "RECEIVED" => InboundOrderStatus::Received,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported inbound order status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

pub async fn create_inbound_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateInboundOrderRequest>,
) -> ApiResult<InboundOrder> {
    payload.validate()?;
    let order = state
        .inbound_service
        .create_inbound_order(NewInboundOrder {
            order_reference: payload.order_reference,
            supplier: payload.supplier,
            expected_arrival: payload.expected_arrival,
            items: payload
                .items
                .into_iter()
                .map(|i| NewInboundItem {
                    product_id: i.product_id,
                    quantity_expected: i.quantity_expected,
                })
                .collect(),
        })
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn get_inbound_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InboundOrder> {
    let order = state.inbound_service.get_inbound_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_inbound_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<InboundOrder>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let status = query
        .status
        .as_deref()
        .map(parse_inbound_status)
        .transpose()?;
    let (items, total) = state
        .inbound_service
        .list_inbound_orders(page, limit, status)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Books a received quantity against an expected item, creating the
/// ledger lot.
pub async fn receive_item(
    State(state): State<AppState>,
    Json(payload): Json<ReceiveItemRequest>,
) -> ApiResult<InventoryRecordSummary> {
    payload.validate()?;
    let record = state
        .inbound_service
        .receive_item(ReceiveItemCommand {
            order_item_id: payload.order_item_id,
            location_id: payload.location_id,
            lpn: payload.lpn,
            quantity: payload.quantity,
            operator_id: payload.operator_id,
            damage_code: payload.damage_code,
        })
        .await?;
    Ok(Json(ApiResponse::success(InventoryRecordSummary::from(
        record,
    ))))
}

pub async fn generate_lpn(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let lpn = state.inbound_service.generate_lpn().await?;
    Ok(Json(ApiResponse::success(json!({ "lpn": lpn }))))
}
