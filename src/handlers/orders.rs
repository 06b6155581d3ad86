use crate::{
    entities::outbound_order::{OrderPriority, OutboundOrder, OutboundOrderStatus},
    errors::ServiceError,
    services::orders::{NewOrderItem, NewOutboundOrder},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Generated when omitted
    pub reference_number: Option<String>,
    pub customer_name: Option<String>,
    pub destination: Option<String>,
    /// Order priority (LOW, STANDARD, HIGH, URGENT); defaults to STANDARD
    pub priority: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<OrderItemRequest>,
}

fn parse_priority(value: &str) -> Result<OrderPriority, ServiceError> {
    let priority = match value {
        "LOW" => OrderPriority::Low,
        "STANDARD" => OrderPriority::Standard,
        "HIGH" => OrderPriority::High,
        "URGENT" => OrderPriority::Urgent,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported order priority '{}'",
                other
            )))
        }
    };
    Ok(priority)
}

pub(crate) fn parse_order_status(value: &str) -> Result<OutboundOrderStatus, ServiceError> {
    let status = match value {
        "PLANNED" => OutboundOrderStatus::Planned,
        "PICKED" => OutboundOrderStatus::Picked,
        "PACKED" => OutboundOrderStatus::Packed,
        "SHIPPED" => OutboundOrderStatus::Shipped,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported order status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OutboundOrder> {
    payload.validate()?;
    let priority = payload
        .priority
        .as_deref()
        .map(parse_priority)
        .transpose()?
        .unwrap_or(OrderPriority::Standard);
    let order = state
        .order_service
        .create_order(NewOutboundOrder {
            reference_number: payload.reference_number,
            customer_name: payload.customer_name,
            destination: payload.destination,
            priority,
            items: payload
                .items
                .into_iter()
                .map(|i| NewOrderItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        })
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OutboundOrder> {
    let order = state.order_service.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<OutboundOrder>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let status = query
        .status
        .as_deref()
        .map(parse_order_status)
        .transpose()?;
    let (items, total) = state.order_service.list_orders(page, limit, status).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}
