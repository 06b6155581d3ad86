use crate::{
    entities::rma::{ReturnGrade, ReturnItem, RmaRequest, RmaStatus},
    errors::ServiceError,
    services::returns::NewReturnLine,
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

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRmaRequest {
    pub outbound_order_id: Uuid,
    #[validate(length(min = 1))]
    pub reason: String,
    /// Defaults to every shipped line in full
    pub lines: Option<Vec<ReturnLineRequest>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveReturnRequest {
    #[validate(length(min = 1))]
    pub tracking_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeItemRequest {
    pub product_id: Uuid,
    /// Grading outcome (GRADE_A, GRADE_B, GRADE_C, SCRAP)
    #[schema(example = "GRADE_A")]
    pub grade: String,
    pub comment: Option<String>,
}

fn parse_grade(value: &str) -> Result<ReturnGrade, ServiceError> {
    let grade = match value {
        "GRADE_A" => ReturnGrade::GradeA,
        "GRADE_B" => ReturnGrade::GradeB,
        "GRADE_C" => ReturnGrade::GradeC,
        "SCRAP" => ReturnGrade::Scrap,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported return grade '{}'",
                other
            )))
        }
    };
    Ok(grade)
}

fn parse_rma_status(value: &str) -> Result<RmaStatus, ServiceError> {
    let status = match value {
        "PENDING" => RmaStatus::Pending,
        "RECEIVED" => RmaStatus::Received,
        "GRADED" => RmaStatus::Graded,
        "CLOSED" => RmaStatus::Closed,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported rma status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

pub async fn create_rma(
    State(state): State<AppState>,
    Json(payload): Json<CreateRmaRequest>,
) -> ApiResult<RmaRequest> {
    payload.validate()?;
    let lines = payload.lines.map(|lines| {
        lines
            .into_iter()
            .map(|l| NewReturnLine {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    });
    let rma = state
        .returns_service
        .create_rma(payload.outbound_order_id, payload.reason, lines)
        .await?;
    Ok(Json(ApiResponse::success(rma)))
}

pub async fn receive_return(
    State(state): State<AppState>,
    Path(rma_id): Path<Uuid>,
    Json(payload): Json<ReceiveReturnRequest>,
) -> ApiResult<RmaRequest> {
    payload.validate()?;
    let rma = state
        .returns_service
        .receive_return(rma_id, payload.tracking_number)
        .await?;
    Ok(Json(ApiResponse::success(rma)))
}

pub async fn grade_item(
    State(state): State<AppState>,
    Path(rma_id): Path<Uuid>,
    Json(payload): Json<GradeItemRequest>,
) -> ApiResult<ReturnItem> {
    let grade = parse_grade(&payload.grade)?;
    let item = state
        .returns_service
        .grade_item(rma_id, payload.product_id, grade, payload.comment)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

pub async fn close_rma(
    State(state): State<AppState>,
    Path(rma_id): Path<Uuid>,
) -> ApiResult<RmaRequest> {
    let rma = state.returns_service.close_rma(rma_id).await?;
    Ok(Json(ApiResponse::success(rma)))
}

pub async fn get_rma(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<RmaRequest> {
    let rma = state.returns_service.get_rma(id).await?;
    Ok(Json(ApiResponse::success(rma)))
}

pub async fn list_rmas(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<RmaRequest>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let status = query.status.as_deref().map(parse_rma_status).transpose()?;
    let (items, total) = state.returns_service.list_rmas(page, limit, status).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}
