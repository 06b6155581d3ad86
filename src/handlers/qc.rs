use crate::{
    entities::qc::{InspectionResult, InspectionSource, NonConformanceReport, QcInspection},
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

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInspectionRequest {
    pub product_id: Uuid,
    /// Inspection source (INBOUND, RETURN, INVENTORY)
    #[schema(example = "INBOUND")]
    pub source: String,
    /// Inbound order, RMA, or inventory record id, per source
    pub reference_id: Uuid,
    #[validate(range(min = 1))]
    pub sample_size: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteInspectionRequest {
    /// Inspection outcome (PASSED, FAILED, CONDITIONAL)
    #[schema(example = "PASSED")]
    pub result: String,
    pub inspector_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNcrRequest {
    #[validate(length(min = 1))]
    pub defect_type: String,
    #[validate(length(min = 1))]
    pub description: String,
}

fn parse_source(value: &str) -> Result<InspectionSource, ServiceError> {
    let source = match value {
        "INBOUND" => InspectionSource::Inbound,
        "RETURN" => InspectionSource::Return,
        "INVENTORY" => InspectionSource::Inventory,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported inspection source '{}'",
                other
            )))
        }
    };
    Ok(source)
}

fn parse_result(value: &str) -> Result<InspectionResult, ServiceError> {
    let result = match value {
        "PENDING" => InspectionResult::Pending,
        "PASSED" => InspectionResult::Passed,
        "FAILED" => InspectionResult::Failed,
        "CONDITIONAL" => InspectionResult::Conditional,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported inspection result '{}'",
                other
            )))
        }
    };
    Ok(result)
}

pub async fn create_inspection(
    State(state): State<AppState>,
    Json(payload): Json<CreateInspectionRequest>,
) -> ApiResult<QcInspection> {
    payload.validate()?;
    let source = parse_source(&payload.source)?;
    let inspection = state
        .qc_service
        .create_inspection(
            payload.product_id,
            source,
            payload.reference_id,
            payload.sample_size,
        )
        .await?;
    Ok(Json(ApiResponse::success(inspection)))
}

pub async fn execute_inspection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExecuteInspectionRequest>,
) -> ApiResult<QcInspection> {
    let result = parse_result(&payload.result)?;
    let inspection = state
        .qc_service
        .execute_inspection(id, result, payload.inspector_id)
        .await?;
    Ok(Json(ApiResponse::success(inspection)))
}

pub async fn create_ncr(
    State(state): State<AppState>,
    Path(inspection_id): Path<Uuid>,
    Json(payload): Json<CreateNcrRequest>,
) -> ApiResult<NonConformanceReport> {
    payload.validate()?;
    let ncr = state
        .qc_service
        .create_ncr(inspection_id, payload.defect_type, payload.description)
        .await?;
    Ok(Json(ApiResponse::success(ncr)))
}

pub async fn close_ncr(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NonConformanceReport> {
    let ncr = state.qc_service.close_ncr(id).await?;
    Ok(Json(ApiResponse::success(ncr)))
}

pub async fn get_inspection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QcInspection> {
    let inspection = state.qc_service.get_inspection(id).await?;
    Ok(Json(ApiResponse::success(inspection)))
}

pub async fn list_inspections(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<QcInspection>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let result = query.status.as_deref().map(parse_result).transpose()?;
    let (items, total) = state
        .qc_service
        .list_inspections(page, limit, result)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_ncr(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NonConformanceReport> {
    let ncr = state.qc_service.get_ncr(id).await?;
    Ok(Json(ApiResponse::success(ncr)))
}

pub async fn list_ncrs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<NonConformanceReport>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let status = query
        .status
        .as_deref()
        .map(|s| match s {
            "OPEN" => Ok(crate::entities::qc::NcrStatus::Open),
            "CLOSED" => Ok(crate::entities::qc::NcrStatus::Closed),
            other => Err(ServiceError::ValidationError(format!(
                "Unsupported ncr status '{}'",
                other
            ))),
        })
        .transpose()?;
    let (items, total) = state.qc_service.list_ncrs(page, limit, status).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}
